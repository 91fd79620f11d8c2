//! Bearer authentication for the mutating routes.
//!
//! The token must equal `auth.password`. With no password configured the
//! check is skipped entirely.

use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::context::AppContext;

/// Extract the token from an `Authorization: Bearer <token>` value.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    authorization?.strip_prefix("Bearer ").map(str::trim)
}

/// Whether `presented` satisfies the configured password.
pub fn is_authorized(password: Option<&str>, presented: Option<&str>) -> bool {
    match password {
        None => true,
        Some(expected) => presented == Some(expected),
    }
}

pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if is_authorized(ctx.config.auth.password.as_deref(), bearer_token(authorization)) {
        Ok(next.run(request).await)
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response())
    }
}
