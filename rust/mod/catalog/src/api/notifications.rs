use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use storeadmin_core::ServiceError;
use storeadmin_paging::PageView;

use super::AppState;
use crate::model::{DeliveryStatus, Notification, NotificationQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/retry", post(retry_notification))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationParams {
    status: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

async fn list_notifications(
    State(svc): State<AppState>,
    Query(params): Query<NotificationParams>,
) -> Result<Json<PageView<Notification>>, ServiceError> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(DeliveryStatus::from_str(&s.to_ascii_uppercase()).ok_or_else(|| {
            ServiceError::Validation(format!("unknown delivery status {:?}", s))
        })?),
    };
    let query = NotificationQuery {
        status,
        page: params.page,
        page_size: params.page_size,
    };
    let page = svc.list_notifications(&query)?;
    Ok(Json(PageView::new(
        page.rows,
        page.total,
        query.effective_page(),
        query.effective_page_size(),
    )))
}

async fn retry_notification(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ServiceError> {
    Ok(Json(svc.retry_notification(&id)?))
}
