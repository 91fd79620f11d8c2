//! Error-to-HTTP response conversion.
//!
//! Wraps [`mc_core::Error`] so route handlers can return
//! `Result<T, AppError>` and use `?` on core results.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: mc_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: mc_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl From<mc_core::Error> for AppError {
    fn from(e: mc_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::new(mc_core::Error::Validation(format!("malformed multipart body: {e}")))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            mc_core::Error::Validation(_) => "validation_error",
            mc_core::Error::Decode(_) => "decode_error",
            mc_core::Error::Transform { .. } => "transform_error",
            mc_core::Error::InvalidRange(_) => "invalid_range",
            mc_core::Error::NotFound { .. } => "not_found",
            mc_core::Error::Unauthorized(_) => "unauthorized",
            mc_core::Error::Database { .. } => "database_error",
            mc_core::Error::Io { .. } => "io_error",
            mc_core::Error::Tool { .. } => "tool_error",
            mc_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::new(mc_core::Error::not_found("image", "abc"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_range_produces_416() {
        let err = AppError::new(mc_core::Error::InvalidRange("bytes=abc".into()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
    }

    #[test]
    fn validation_produces_400() {
        let err = AppError::new(mc_core::Error::Validation("Duplicate tags".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn with_request_id() {
        let err = AppError::new(mc_core::Error::Internal("oops".into()))
            .with_request_id("req-123".into());
        assert_eq!(err.request_id.as_deref(), Some("req-123"));
    }
}
