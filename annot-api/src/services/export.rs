//! Annotation export to an xlsx workbook
//!
//! Header names are chosen so that every export column normalizes to the
//! import column of the same field: an exported file re-imports as is.

use annot_common::{Error, Result};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::annotations::{list_for_export, AnnotationExportRow, AnnotationFilter};

/// Worksheet name in exported workbooks
pub const SHEET_NAME: &str = "Metaphors";

/// MIME type of the produced file
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Export columns in order
pub const EXPORT_HEADERS: [&str; 11] = [
    "Custom ID",
    "Expression",
    "Trigger Word",
    "Lemma",
    "Novelty Type",
    "Function Type",
    "Status",
    "Conceptual Metaphor",
    "Source Domain",
    "Target Domain",
    "POS",
];

fn row_cells(row: &AnnotationExportRow) -> [&str; 11] {
    [
        row.custom_id.as_str(),
        row.expression.as_str(),
        row.trigger_word.as_str(),
        row.lemma.as_str(),
        row.novelty_type.as_str(),
        row.function_type.as_str(),
        row.status.as_str(),
        row.conceptual_metaphor.as_str(),
        row.source_domain.as_str(),
        row.target_domain.as_str(),
        row.pos.as_deref().unwrap_or(""),
    ]
}

fn xlsx_error(err: XlsxError) -> Error {
    Error::Internal(format!("Failed to build workbook: {}", err))
}

/// Serialize rows into xlsx bytes
pub fn write_workbook(rows: &[AnnotationExportRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_error)?;
        sheet.set_column_width(col as u16, 20).map_err(xlsx_error)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let sheet_row = (index + 1) as u32;
        for (col, value) in row_cells(row).iter().enumerate() {
            if !value.is_empty() {
                sheet
                    .write_string(sheet_row, col as u16, *value)
                    .map_err(xlsx_error)?;
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// Export the annotations of a document matching `filter`, in creation order
pub async fn export_annotations(
    pool: &SqlitePool,
    document_id: Uuid,
    filter: &AnnotationFilter,
) -> Result<Vec<u8>> {
    crate::db::documents::get_document(pool, document_id).await?;

    let rows = list_for_export(pool, document_id, filter).await?;
    tracing::info!(document_id = %document_id, rows = rows.len(), "Exporting annotations");

    write_workbook(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::bulk_import::REQUIRED_COLUMNS;
    use crate::services::sheet::normalize_header;

    #[test]
    fn test_export_headers_cover_required_import_columns() {
        let normalized: Vec<String> = EXPORT_HEADERS.iter().map(|h| normalize_header(h)).collect();
        for required in REQUIRED_COLUMNS {
            assert!(normalized.iter().any(|h| h == required), "missing {}", required);
        }
    }

    #[test]
    fn test_empty_export_is_a_workbook() {
        let bytes = write_workbook(&[]).unwrap();
        // xlsx files are zip containers
        assert_eq!(&bytes[..2], b"PK");
    }
}
