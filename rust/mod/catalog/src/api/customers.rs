use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use storeadmin_core::{ListParams, ServiceError};
use storeadmin_paging::PageView;

use super::{list_query, page_view, AppState};
use crate::model::Customer;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer).delete(delete_customer))
}

async fn list_customers(
    State(svc): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageView<Customer>>, ServiceError> {
    let query = list_query(&params);
    let page = svc.list_customers(&query)?;
    Ok(Json(page_view(page, &query)))
}

async fn get_customer(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ServiceError> {
    Ok(Json(svc.get_customer(&id)?))
}

async fn delete_customer(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.delete_customer(&id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{api, app};
    use crate::model::NewCustomer;

    #[tokio::test]
    async fn list_search_and_delete() {
        let (r, svc, _dir) = app(&[]);
        for (phone, shape) in [("0811", "Pear"), ("0822", "Hourglass"), ("0833", "Pear")] {
            svc.create_customer(NewCustomer {
                phone: Some(phone.into()),
                body_shape: Some(shape.into()),
                ..Default::default()
            })
            .unwrap();
        }

        let (s, page) = api(&r, "GET", "/catalog/v1/customers?q=pear", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(page["total"], 2);
        assert_eq!(page["items"][0]["bodyShape"], "Pear");

        let id = page["items"][0]["id"].as_str().unwrap().to_string();
        let uri = format!("/catalog/v1/customers/{id}");
        let (s, one) = api(&r, "GET", &uri, None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(one["id"], id.as_str());

        let (s, _) = api(&r, "DELETE", &uri, None).await;
        assert_eq!(s, StatusCode::OK);
        let (_, page) = api(&r, "GET", "/catalog/v1/customers", None).await;
        assert_eq!(page["total"], 2);
        assert_eq!(page["pageSize"], 10);
    }

    #[tokio::test]
    async fn unknown_customer_is_404() {
        let (r, _svc, _dir) = app(&[]);
        let (s, err) = api(&r, "GET", "/catalog/v1/customers/ghost", None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
        assert_eq!(err["code"], "NOT_FOUND");
        assert_eq!(err["message"], "profiles/ghost");
    }
}
