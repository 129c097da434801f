pub mod customers;
pub mod notifications;
pub mod overview;
pub mod products;

use std::sync::Arc;

use axum::Router;
use storeadmin_core::ListParams;
use storeadmin_paging::{ListQuery, Page, PageView};
use serde::Serialize;

use crate::service::CatalogService;

/// Shared application state.
pub type AppState = Arc<CatalogService>;

/// Build the catalog API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/catalog/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(customers::routes())
        .merge(overview::routes())
        .merge(notifications::routes())
}

pub(crate) fn list_query(params: &ListParams) -> ListQuery {
    ListQuery::new(params.search(), params.page(), params.page_size())
}

/// Render a fetched page for the query that produced it.
pub(crate) fn page_view<T: Serialize>(page: Page<T>, query: &ListQuery) -> PageView<T> {
    PageView::new(page.rows, page.total, query.page, query.page_size)
}
