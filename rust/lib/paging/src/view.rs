use serde::Serialize;

use crate::range::total_pages;
use crate::tokens::{page_tokens, PageToken};

/// One page of a listing plus everything a client needs to draw the
/// pagination control.
///
/// ```json
/// {"items": [...], "total": 95, "page": 5, "pageSize": 10,
///  "totalPages": 10, "pages": [1, "...", 3, 4, 5, 6, 7, "...", 10]}
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView<T: Serialize> {
    pub items: Vec<T>,
    /// Rows matching the filter across all pages.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub pages: Vec<PageToken>,
}

impl<T: Serialize> PageView<T> {
    /// Build the view for `items` on `page`, out of `total` matching rows.
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total_pages = total_pages(total, page_size);
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
            pages: page_tokens(page, total_pages),
        }
    }
}
