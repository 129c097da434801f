use serde::Deserialize;

/// Largest page size a listing endpoint will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters shared by every listing endpoint.
///
/// `?q=shirt&page=2&pageSize=10`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Free-text search; blank means no filter.
    #[serde(default)]
    pub q: Option<String>,

    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,

    /// Rows per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            q: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl ListParams {
    /// The trimmed search text, or `None` when blank.
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Page number clamped to at least 1.
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Current unix time in seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
