//! Read-only dashboard endpoints: categories, orders, counters.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use storeadmin_core::{ListParams, ServiceError};
use storeadmin_paging::PageView;

use super::{list_query, page_view, AppState};
use crate::model::{Category, DashboardStats, Order};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/orders", get(list_orders))
        .route("/stats", get(dashboard_stats))
}

async fn list_categories(State(svc): State<AppState>) -> Result<Json<Vec<Category>>, ServiceError> {
    Ok(Json(svc.categories()?))
}

async fn list_orders(
    State(svc): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageView<Order>>, ServiceError> {
    let query = list_query(&params);
    let page = svc.list_orders(&query)?;
    Ok(Json(page_view(page, &query)))
}

async fn dashboard_stats(State(svc): State<AppState>) -> Result<Json<DashboardStats>, ServiceError> {
    Ok(Json(svc.dashboard_stats()?))
}
