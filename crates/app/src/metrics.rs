//! App metrics.
use metrics::{Counter, Gauge};

/// Metrics of the startup sequence.
#[derive(Clone, Debug)]
pub struct AppMetrics {
    /// 1 when the instance accepts traffic, 0 otherwise.
    pub(crate) readiness: Gauge,
    /// Block the live feed was launched at.
    pub(crate) live_start_block: Gauge,
    /// Failed tracker polls while resolving the live start block.
    pub(crate) tracker_failures: Counter,
}

impl AppMetrics {
    /// Registers the metrics with the installed recorder.
    pub fn new() -> Self {
        metrics::describe_gauge!(
            "firehose_app_readiness",
            "Whether the firehose instance accepts requests"
        );
        metrics::describe_gauge!(
            "firehose_live_start_block",
            "Block number the hybrid source was launched at"
        );
        metrics::describe_counter!(
            "firehose_start_block_tracker_failures",
            "Failed tracker polls while resolving the live start block"
        );

        Self {
            readiness: metrics::gauge!("firehose_app_readiness"),
            live_start_block: metrics::gauge!("firehose_live_start_block"),
            tracker_failures: metrics::counter!("firehose_start_block_tracker_failures"),
        }
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.readiness.set(if ready { 1.0 } else { 0.0 });
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}
