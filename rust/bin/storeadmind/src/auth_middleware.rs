//! JWT authentication middleware.
//!
//! Extracts the token from `Authorization: Bearer <token>`, validates it,
//! and stores the `Claims` in the request extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use storeadmin_core::{new_id, now_unix, ServiceError};

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username.
    pub sub: String,
    /// Session id.
    pub sid: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: &str, expire_secs: u64) -> Self {
        let now = now_unix();
        Self {
            sub: sub.to_string(),
            sid: new_id(),
            iat: now,
            exp: now.saturating_add(i64::try_from(expire_secs).unwrap_or(i64::MAX)),
        }
    }
}

/// Keys for signing and checking tokens.
#[derive(Clone)]
pub struct JwtState {
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub validation: Validation,
}

impl JwtState {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
    }
}

/// Authentication failures, rendered like every other service error.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let msg = match self {
            AuthError::MissingToken => "missing authorization token".to_string(),
            AuthError::InvalidToken(e) => format!("invalid token: {}", e),
        };
        ServiceError::Unauthorized(msg).into_response()
    }
}

/// Pass public paths through; everything else needs a valid bearer token.
pub async fn auth_middleware(
    State(jwt_state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let claims = jwt_state
        .verify(token)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Paths reachable without a token.
fn is_public_path(path: &str) -> bool {
    matches!(path, "/health" | "/version" | "/auth/login") || path.starts_with("/assets/")
}
