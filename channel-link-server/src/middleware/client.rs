//! Middleware for outgoing [reqwest] requests.

use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::time::Instant;
use task_local_extensions::Extensions;

/// Logs every outgoing request and the status it was answered with.
#[derive(Clone, Copy, Debug)]
pub struct Logger;

#[async_trait::async_trait]
impl Middleware for Logger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let url = req.url().clone();
        let method = req.method().clone();
        let started = Instant::now();

        tracing::debug!(%url, %method, "Sending request");

        let result = next.run(req, extensions).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(resp) if resp.status().is_server_error() => {
                tracing::warn!(%url, %method, status = %resp.status(), elapsed_ms, "Server error on response")
            }
            Ok(resp) => {
                tracing::debug!(%url, %method, status = %resp.status(), elapsed_ms, "Got response")
            }
            Err(err) => tracing::warn!(%url, %method, %err, elapsed_ms, "Request failed"),
        }

        result
    }
}
