//! Fallback routes.

use crate::error::AppError;
use axum::http::{StatusCode, Uri};

/// 404 fallback.
pub async fn notfound_404(uri: Uri) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, Some(format!("Route {uri} not found")))
}
