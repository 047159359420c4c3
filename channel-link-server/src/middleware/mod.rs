//! Middleware for the http server and for outgoing http clients.

pub mod client;
pub mod runtime;
