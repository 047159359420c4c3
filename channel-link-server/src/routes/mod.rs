//! Routes for [axum::Router].

pub mod fallback;
pub mod health;
pub mod interactions;
pub mod ping;
