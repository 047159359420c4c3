//! Middleware for runtime, [tower_http] extensions.

use crate::error::AppError;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::any::Any;

/// Middleware function for catching runtime panics, logging
/// them, and converting them into a `500 Internal Server` response.
pub fn catch_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic message".to_string()
    };

    tracing::error!(panic = %details, "Handler panicked");

    AppError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        Some("Internal server error"),
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::parse_error;

    #[test_log::test(tokio::test)]
    async fn test_catch_panic_hides_details() {
        let response = catch_panic(Box::new("secret detail"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = parse_error(response).await;
        assert_eq!(err.detail.as_deref(), Some("Internal server error"));
    }
}
