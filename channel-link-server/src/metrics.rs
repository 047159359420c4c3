//! Prometheus metrics.

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Counter of handled `verify` commands, labelled by `outcome`
pub const REDEMPTIONS_TOTAL: &str = "channel_link_redemptions_total";

/// Outcome label values for [`REDEMPTIONS_TOTAL`]
pub mod outcome {
    /// The channel got bound
    pub const REDEEMED: &str = "redeemed";
    /// The code didn't exist or was malformed
    pub const INVALID: &str = "invalid";
    /// A store failed
    pub const FAILED: &str = "failed";
    /// The command was used outside of a direct message
    pub const REJECTED: &str = "rejected";
}

/// Count a handled `verify` command
pub fn record_redemption(outcome: &'static str) {
    metrics::increment_counter!(REDEMPTIONS_TOTAL, "outcome" => outcome);
}

/// Install the global prometheus recorder.
///
/// Only one recorder can be installed per process.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_counter!(REDEMPTIONS_TOTAL, "Handled verify commands by outcome");
    Ok(handle)
}
