//! Custom [axum::extract] Extractors.

pub mod signature;
