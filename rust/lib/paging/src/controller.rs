//! Listing state machine: search box, current page, and the rows on screen.
//!
//! The controller owns no data. It asks a [`PageSource`] for one page at a
//! time and keeps the rows, total and page number mutually consistent as
//! searches are committed, pages are selected and rows are deleted.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use storeadmin_core::ServiceError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::debounce::{Debouncer, SEARCH_QUIESCENCE};
use crate::range::{compute_range, total_pages, RowRange};
use crate::view::PageView;

/// What a listing asks its source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Committed search text; `None` lists everything.
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl ListQuery {
    pub fn new(search: Option<&str>, page: u32, page_size: u32) -> Self {
        Self {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Row window to fetch.
    pub fn range(&self) -> RowRange {
        compute_range(self.page, self.page_size)
    }
}

/// One fetched page and the number of rows matching the filter overall.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

/// Backing data for a listing.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Row: Clone + Send + Sync + Serialize;

    /// Identifier used to drop a row locally after a delete.
    fn row_id(row: &Self::Row) -> &str;

    /// Fetch the rows of `query.page`; `total` counts the filtered set.
    async fn fetch(&self, query: &ListQuery) -> Result<Page<Self::Row>, ServiceError>;

    /// Delete one row by id.
    async fn remove(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct ListingController<S: PageSource> {
    source: S,
    page_size: u32,
    page: u32,
    committed: String,
    rows: Vec<S::Row>,
    total: u64,
    error: Option<String>,
    search: Debouncer<String>,
    commits: mpsc::UnboundedReceiver<String>,
}

impl<S: PageSource> ListingController<S> {
    pub fn new(source: S, page_size: u32) -> Self {
        Self::with_quiescence(source, page_size, SEARCH_QUIESCENCE)
    }

    pub fn with_quiescence(source: S, page_size: u32, quiescence: Duration) -> Self {
        let (search, commits) = Debouncer::new(quiescence);
        Self {
            source,
            page_size: page_size.max(1),
            page: 1,
            committed: String::new(),
            rows: Vec::new(),
            total: 0,
            error: None,
            search,
            commits,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn rows(&self) -> &[S::Row] {
        &self.rows
    }

    pub fn committed_search(&self) -> &str {
        &self.committed
    }

    /// Message of the last failed fetch, cleared by the next good one.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The query the next refresh will send.
    pub fn query(&self) -> ListQuery {
        ListQuery::new(Some(&self.committed), self.page, self.page_size)
    }

    /// Re-fetch the current page.
    pub async fn refresh(&mut self) -> Result<(), ServiceError> {
        let query = self.query();
        debug!(page = query.page, search = ?query.search, "listing fetch");
        match self.source.fetch(&query).await {
            Ok(page) => {
                self.rows = page.rows;
                self.total = page.total;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.rows.clear();
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// A keystroke in the search box. Commits after quiescence.
    pub fn type_search(&self, text: &str) {
        self.search.input(text.to_string());
    }

    /// Wait for the next debounced search and apply it.
    ///
    /// Returns `None` once the search box is gone.
    pub async fn next_search_commit(&mut self) -> Option<Result<bool, ServiceError>> {
        let text = self.commits.recv().await?;
        Some(self.commit_search(&text).await)
    }

    /// Make `text` the committed search. A change resets to page 1 and
    /// refetches once; committing the same text again does nothing.
    pub async fn commit_search(&mut self, text: &str) -> Result<bool, ServiceError> {
        let text = text.trim();
        if text == self.committed {
            return Ok(false);
        }
        self.committed = text.to_string();
        self.page = 1;
        self.refresh().await?;
        Ok(true)
    }

    /// Navigate to `page`. Selecting the current page is a no-op.
    pub async fn go_to(&mut self, page: u32) -> Result<bool, ServiceError> {
        if page == 0 || page == self.page {
            return Ok(false);
        }
        self.page = page;
        self.refresh().await?;
        Ok(true)
    }

    /// Delete a row and drop it from the visible page. Emptying the last
    /// page steps back to the new last page and fetches it.
    pub async fn remove(&mut self, id: &str) -> Result<(), ServiceError> {
        self.source.remove(id).await?;
        self.rows.retain(|row| S::row_id(row) != id);
        self.total = self.total.saturating_sub(1);

        let last_page = total_pages(self.total, self.page_size).max(1);
        if self.rows.is_empty() && self.page > last_page {
            self.page = last_page;
            self.refresh().await?;
        }
        Ok(())
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> PageView<S::Row> {
        PageView::new(self.rows.clone(), self.total, self.page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::tokens::PageToken;

    #[derive(Debug, Clone, Serialize, PartialEq)]
    struct Item {
        id: String,
        name: String,
    }

    /// In-memory source that records every query it answers.
    struct MemorySource {
        items: Mutex<Vec<Item>>,
        queries: Arc<Mutex<Vec<ListQuery>>>,
        fail: bool,
    }

    impl MemorySource {
        fn with_items(n: usize) -> (Self, Arc<Mutex<Vec<ListQuery>>>) {
            let items = (1..=n)
                .map(|i| Item {
                    id: format!("item-{i}"),
                    name: if i % 3 == 0 { format!("Shirt {i}") } else { format!("Dress {i}") },
                })
                .collect();
            let queries = Arc::new(Mutex::new(Vec::new()));
            let source = Self {
                items: Mutex::new(items),
                queries: Arc::clone(&queries),
                fail: false,
            };
            (source, queries)
        }
    }

    #[async_trait]
    impl PageSource for MemorySource {
        type Row = Item;

        fn row_id(row: &Item) -> &str {
            &row.id
        }

        async fn fetch(&self, query: &ListQuery) -> Result<Page<Item>, ServiceError> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail {
                return Err(ServiceError::Storage("store unavailable".into()));
            }
            let items = self.items.lock().unwrap();
            let needle = query.search.as_deref().map(str::to_lowercase);
            let matching: Vec<Item> = items
                .iter()
                .filter(|it| match &needle {
                    Some(n) => it.name.to_lowercase().contains(n),
                    None => true,
                })
                .cloned()
                .collect();
            let range = query.range();
            let rows = matching
                .iter()
                .skip(range.offset() as usize)
                .take(range.limit() as usize)
                .cloned()
                .collect();
            Ok(Page {
                rows,
                total: matching.len() as u64,
            })
        }

        async fn remove(&self, id: &str) -> Result<(), ServiceError> {
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|it| it.id != id);
            if items.len() == before {
                return Err(ServiceError::NotFound(id.to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn refresh_loads_first_page() {
        let (source, _) = MemorySource::with_items(25);
        let mut listing = ListingController::new(source, 10);
        listing.refresh().await.unwrap();

        assert_eq!(listing.rows().len(), 10);
        assert_eq!(listing.total(), 25);
        assert_eq!(listing.view().total_pages, 3);
    }

    #[tokio::test]
    async fn committing_search_resets_to_page_one() {
        let (source, queries) = MemorySource::with_items(60);
        let mut listing = ListingController::new(source, 5);
        listing.refresh().await.unwrap();
        assert!(listing.go_to(3).await.unwrap());
        assert_eq!(queries.lock().unwrap().last().unwrap().page, 3);

        assert!(listing.commit_search("shirt").await.unwrap());
        let last = queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.page, 1);
        assert_eq!(last.search.as_deref(), Some("shirt"));
        assert_eq!(listing.page(), 1);
        assert_eq!(listing.total(), 20);
    }

    #[tokio::test]
    async fn recommitting_same_search_does_not_refetch() {
        let (source, queries) = MemorySource::with_items(10);
        let mut listing = ListingController::new(source, 5);
        listing.commit_search("dress").await.unwrap();
        let fetches = queries.lock().unwrap().len();

        assert!(!listing.commit_search(" dress ").await.unwrap());
        assert_eq!(queries.lock().unwrap().len(), fetches);
    }

    #[tokio::test]
    async fn selecting_current_page_is_a_noop() {
        let (source, queries) = MemorySource::with_items(30);
        let mut listing = ListingController::new(source, 10);
        listing.refresh().await.unwrap();

        assert!(!listing.go_to(1).await.unwrap());
        assert!(!listing.go_to(0).await.unwrap());
        assert_eq!(queries.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_burst_fetches_once_with_last_text() {
        let (source, queries) = MemorySource::with_items(30);
        let mut listing = ListingController::new(source, 10);
        listing.refresh().await.unwrap();
        listing.go_to(2).await.unwrap();
        let before = queries.lock().unwrap().len();

        for text in ["s", "sh", "shi", "shir", "shirt"] {
            listing.type_search(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let applied = listing.next_search_commit().await.unwrap().unwrap();
        assert!(applied);

        let queries = queries.lock().unwrap();
        assert_eq!(queries.len(), before + 1);
        let last = queries.last().unwrap();
        assert_eq!(last.search.as_deref(), Some("shirt"));
        assert_eq!(last.page, 1);
    }

    #[tokio::test]
    async fn delete_drops_row_and_decrements_total() {
        let (source, _) = MemorySource::with_items(15);
        let mut listing = ListingController::new(source, 10);
        listing.refresh().await.unwrap();
        assert_eq!(listing.rows().len(), 10);

        listing.remove("item-4").await.unwrap();

        assert_eq!(listing.rows().len(), 9);
        assert!(listing.rows().iter().all(|it| it.id != "item-4"));
        assert_eq!(listing.total(), 14);
    }

    #[tokio::test]
    async fn failed_delete_leaves_page_untouched() {
        let (source, _) = MemorySource::with_items(5);
        let mut listing = ListingController::new(source, 10);
        listing.refresh().await.unwrap();

        assert!(listing.remove("nope").await.is_err());
        assert_eq!(listing.rows().len(), 5);
        assert_eq!(listing.total(), 5);
    }

    #[tokio::test]
    async fn window_stays_consistent_when_last_page_empties() {
        let (source, queries) = MemorySource::with_items(11);
        let mut listing = ListingController::new(source, 10);
        listing.refresh().await.unwrap();
        listing.go_to(2).await.unwrap();
        assert_eq!(listing.rows().len(), 1);

        listing.remove("item-11").await.unwrap();

        let view = listing.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.total, 10);
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.pages, vec![PageToken::Page(1)]);
        assert_eq!(view.items.len(), 10);
        assert_eq!(queries.lock().unwrap().last().unwrap().page, 1);
    }

    #[tokio::test]
    async fn removing_only_row_keeps_page_one() {
        let (source, _) = MemorySource::with_items(1);
        let mut listing = ListingController::new(source, 10);
        listing.refresh().await.unwrap();

        listing.remove("item-1").await.unwrap();

        let view = listing.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.total, 0);
        assert!(view.items.is_empty());
        assert_eq!(view.pages, vec![PageToken::Page(1)]);
    }

    #[tokio::test]
    async fn fetch_error_is_kept_for_display() {
        let (mut source, _) = MemorySource::with_items(3);
        source.fail = true;
        let mut listing = ListingController::new(source, 10);

        assert!(listing.refresh().await.is_err());
        assert_eq!(listing.error(), Some("store unavailable"));
        assert!(listing.rows().is_empty());
    }
}
