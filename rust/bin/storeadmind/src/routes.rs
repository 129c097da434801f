//! Route registration: system endpoints, login, assets, and module routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use storeadmin_blob::{content_type_for, AssetStorage, BlobError};
use storeadmin_core::ServiceError;

use crate::auth_middleware::{self, JwtState};
use crate::config::ServerConfig;
use crate::login;

/// Application shared state.
#[derive(Clone)]
pub struct AppState {
    pub jwt_state: Arc<JwtState>,
    pub server_config: Arc<ServerConfig>,
    pub assets: Arc<AssetStorage>,
}

/// Build the complete router. Module routers carry their own prefixes and
/// state.
pub fn build_router(state: AppState, module_routes: Vec<Router>) -> Router {
    let jwt_state = Arc::clone(&state.jwt_state);

    let system_routes = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    let mut app: Router<()> = Router::new()
        .route("/assets/{bucket}/{*object}", get(serve_asset))
        .merge(login::routes())
        .with_state(state)
        .merge(system_routes);

    for router in module_routes {
        app = app.merge(router);
    }

    app.layer(middleware::from_fn_with_state(
        jwt_state,
        auth_middleware::auth_middleware,
    ))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "storeadmind",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn serve_asset(
    State(state): State<AppState>,
    Path((bucket, object)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let bytes = state
        .assets
        .read(&bucket, &object)
        .map_err(|e| match e {
            BlobError::InvalidKey(msg) => ServiceError::Validation(msg),
            BlobError::Io(msg) => ServiceError::Storage(msg),
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("{}/{}", bucket, object)))?;
    let content_type = content_type_for(&object).unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
