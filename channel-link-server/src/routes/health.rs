//! Healthcheck route.

use crate::{
    app_state::AppState,
    error::AppResult,
    setups::{CodeStore, ServerSetup},
};
use axum::{self, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// A healthcheck response containing diagnostic information for the service
#[derive(ToSchema, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct HealthcheckResponse {
    code_store_connected: bool,
}

impl HealthcheckResponse {
    /// Whether the service is healthy
    pub fn is_healthy(&self) -> bool {
        self.code_store_connected
    }

    /// The status code for the healthcheck response
    pub fn status_code(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// GET handler for checking service health.
#[utoipa::path(
    get,
    path = "/healthcheck",
    responses(
        (status = 200, description = "channel-link-server healthy", body=HealthcheckResponse),
        (status = 503, description = "channel-link-server not healthy", body=HealthcheckResponse)
    )
)]
pub async fn healthcheck<S: ServerSetup>(
    State(state): State<AppState<S>>,
) -> AppResult<(StatusCode, axum::Json<serde_json::Value>)> {
    let code_store_connected = match state.redemptions.code_store().ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(%err, "Code store ping failed");
            false
        }
    };

    let response = HealthcheckResponse {
        code_store_connected,
    };

    Ok((response.status_code(), axum::Json(json! { response })))
}
