//! Admin login: verifies the password against the configured argon2id hash
//! and issues a JWT.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth_middleware::Claims;
use crate::bootstrap::verify_password;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// `POST /auth/login`. Other methods get axum's 405.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login_handler))
}

fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}

fn invalid_credentials() -> Response {
    failure(StatusCode::UNAUTHORIZED, "Invalid credentials")
}

async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!("login body rejected: {}", rejection.body_text());
            return failure(rejection.status(), "Invalid request body");
        }
    };
    let admin = &state.server_config.admin;

    // Verify the hash even for a wrong username so both cases cost the same.
    let password_ok = verify_password(&body.password, &admin.password_hash);
    if body.username != admin.username || !password_ok {
        warn!(username = %body.username, "login rejected");
        return invalid_credentials();
    }

    let expire_secs = state.server_config.jwt.expire_secs;
    match state.jwt_state.issue(&Claims::new(&admin.username, expire_secs)) {
        Ok(token) => {
            info!(username = %admin.username, "admin logged in");
            let response = LoginResponse {
                success: true,
                access_token: token,
                token_type: "Bearer".to_string(),
                expires_in: expire_secs,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to encode JWT: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}
