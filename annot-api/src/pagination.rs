//! Page arithmetic for annotation listings (100 rows per page, 1-indexed)

use serde::{Deserialize, Serialize};

/// Rows per listing page
pub const PAGE_SIZE: i64 = 100;

/// Where one page of an annotation listing starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub total_pages: i64,
    /// Row offset, not part of the response body
    #[serde(skip)]
    pub offset: i64,
}

/// Page `requested_page` of a listing with `total_results` rows
///
/// Out-of-range pages snap to the nearest real one; an empty listing has
/// zero pages but still answers as page 1.
///
/// ```
/// use annot_api::pagination::calculate_pagination;
///
/// let p = calculate_pagination(101, 7);
/// assert_eq!((p.page, p.total_pages, p.offset), (2, 2, 100));
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.clamp(1, total_pages.max(1));

    Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}

/// `?page=N` query parameter
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

/// One page of results plus the metadata needed to request the others
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    #[serde(flatten)]
    pub pagination: Pagination,
}
