/// Inclusive, zero-based row window for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: u64,
    pub to: u64,
}

impl RowRange {
    /// Number of rows the window spans (`to - from + 1`).
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    /// A window always spans at least one row.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// SQL `LIMIT` for this window.
    pub fn limit(&self) -> u64 {
        self.len()
    }

    /// SQL `OFFSET` for this window.
    pub fn offset(&self) -> u64 {
        self.from
    }
}

/// Row window for a 1-based `page` of `page_size` rows.
///
/// Zero inputs are treated as 1. The page is not checked against the
/// number of rows: a page past the end is a window over nothing.
pub fn compute_range(page: u32, page_size: u32) -> RowRange {
    let page = u64::from(page.max(1));
    let page_size = u64::from(page_size.max(1));
    let from = (page - 1) * page_size;
    RowRange {
        from,
        to: from + page_size - 1,
    }
}

/// `ceil(total_count / page_size)`.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(page_size);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
