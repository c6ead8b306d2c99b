//! Tabular input: first worksheet of an xlsx/xls/ods workbook, or UTF-8 CSV
//!
//! Headers are normalized (trimmed, internal whitespace removed, lowercased)
//! so `Custom ID`, `customId` and ` CUSTOMID ` all address the same column.
//! Cells are rendered as trimmed strings; whole numbers lose their `.0`.

use annot_common::{Error, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::BTreeMap;
use std::io::Cursor;

/// One data row keyed by normalized header
pub type SheetRow = BTreeMap<String, String>;

/// Parsed worksheet: normalized headers and raw cell text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Lowercase and strip all whitespace
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether the bytes look like a binary workbook (zip container or OLE2)
fn is_workbook(bytes: &[u8]) -> bool {
    match infer::get(bytes) {
        Some(kind) => matches!(
            kind.matcher_type(),
            infer::MatcherType::Archive | infer::MatcherType::Doc
        ),
        None => false,
    }
}

/// Parse the first sheet of an uploaded file
///
/// Any failure here is structural: the whole import is rejected.
pub fn parse_sheet(bytes: &[u8]) -> Result<Sheet> {
    if bytes.is_empty() {
        return Err(Error::Import("Uploaded file is empty".to_string()));
    }

    let mut table = if is_workbook(bytes) {
        read_workbook(bytes)?
    } else {
        read_csv(bytes)?
    };

    if table.is_empty() {
        return Err(Error::Import("Sheet has no header row".to_string()));
    }

    let headers = table.remove(0).iter().map(|h| normalize_header(h)).collect();
    Ok(Sheet {
        headers,
        rows: table,
    })
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| Error::Import(format!("Unreadable workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Import("Workbook contains no sheets".to_string()))?
        .map_err(|e| Error::Import(format!("Unreadable first sheet: {}", e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::Import(format!("Unreadable CSV: {}", e)))?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(rows)
}

/// Render a float, dropping the fractional part when it is zero
fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn cell_to_string(cell: &Data) -> String {
    let text = match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => render_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => render_number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{:?}", e),
    };
    text.trim().to_string()
}

impl Sheet {
    /// Required columns absent from the header row, in the order given
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|column| !self.headers.iter().any(|h| h == *column))
            .copied()
            .collect()
    }

    /// Data rows numbered from 1, each mapped `normalized header -> cell`
    ///
    /// Short rows are padded with empty strings; cells past the last header
    /// are ignored. When a header repeats, the first occurrence wins.
    pub fn records(&self) -> impl Iterator<Item = (usize, SheetRow)> + '_ {
        self.rows.iter().enumerate().map(move |(index, cells)| {
            let mut record = SheetRow::new();
            for (col, header) in self.headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let value = cells.get(col).map(|c| c.trim().to_string()).unwrap_or_default();
                record.entry(header.clone()).or_insert(value);
            }
            (index + 1, record)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Custom ID "), "customid");
        assert_eq!(normalize_header("Source\tDomain"), "sourcedomain");
        assert_eq!(normalize_header("conceptualMetaphor"), "conceptualmetaphor");
    }

    #[test]
    fn test_render_number() {
        assert_eq!(render_number(12.0), "12");
        assert_eq!(render_number(-3.0), "-3");
        assert_eq!(render_number(12.5), "12.5");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Float(7.0)), "7");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::String("  spaced ".into())), "spaced");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }

    #[test]
    fn test_csv_headers_and_records() {
        let csv = "Custom ID,Expression,Page\nM-1, a rocky road ,12\nM-2,smooth sailing\n";
        let sheet = parse_sheet(csv.as_bytes()).unwrap();

        assert_eq!(sheet.headers, vec!["customid", "expression", "page"]);

        let records: Vec<_> = sheet.records().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, 1);
        assert_eq!(records[0].1["expression"], "a rocky road");
        assert_eq!(records[0].1["page"], "12");
        assert_eq!(records[1].0, 2);
        assert_eq!(records[1].1["page"], "");
    }

    #[test]
    fn test_missing_columns_in_order() {
        let sheet = parse_sheet(b"customId,expression\n").unwrap();
        assert_eq!(
            sheet.missing_columns(&["customid", "sourcedomain", "expression", "targetdomain"]),
            vec!["sourcedomain", "targetdomain"]
        );
    }

    #[test]
    fn test_empty_file_is_structural_error() {
        assert!(matches!(parse_sheet(b""), Err(Error::Import(_))));
    }

    #[test]
    fn test_invalid_utf8_csv_is_structural_error() {
        let bytes = [b'a', b',', 0xff, 0xfe, b'\n'];
        assert!(matches!(parse_sheet(&bytes), Err(Error::Import(_))));
    }

    #[test]
    fn test_corrupt_zip_is_structural_error() {
        // Local file header magic followed by garbage
        let mut bytes = vec![0x50, 0x4b, 0x03, 0x04];
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(parse_sheet(&bytes), Err(Error::Import(_))));
    }
}
