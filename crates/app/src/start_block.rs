//! Resolution of the block the live feed is launched at.

use crate::{
    config::{Config, DEFAULT_START_BLOCK_RETRY_INTERVAL, DEFAULT_START_BLOCK_WARN_EVERY},
    metrics::AppMetrics,
    tracker::Tracker,
};
use firehose_primitives::{
    previous_bundle, same_bundle, BlockRefTarget, DEFAULT_BUNDLE_SIZE,
    DEFAULT_FIRST_STREAMABLE_BLOCK,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Picks a bundle aligned replay point from the tracker's LIB and HEAD.
///
/// The LIB is polled until the tracker answers, there is no retry limit. Once known:
/// - if HEAD is unknown, or HEAD is in the same bundle as LIB, the start block is the boundary of
///   the bundle preceding LIB, see [`previous_bundle`];
/// - otherwise the LIB itself is used.
#[derive(Debug, Clone)]
pub struct StartBlockResolver {
    tracker: Arc<dyn Tracker>,
    bundle_size: u64,
    first_streamable_block: u64,
    retry_interval: Duration,
    warn_every: usize,
    metrics: Option<AppMetrics>,
}

impl StartBlockResolver {
    /// Creates a resolver with the default bundle size and retry cadence.
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self {
            tracker,
            bundle_size: DEFAULT_BUNDLE_SIZE,
            first_streamable_block: DEFAULT_FIRST_STREAMABLE_BLOCK,
            retry_interval: DEFAULT_START_BLOCK_RETRY_INTERVAL,
            warn_every: DEFAULT_START_BLOCK_WARN_EVERY,
            metrics: None,
        }
    }

    /// Creates a resolver using the bundle and retry settings of `config`.
    pub fn from_config(tracker: Arc<dyn Tracker>, config: &Config) -> Self {
        Self::new(tracker)
            .with_bundle_size(config.bundle_size)
            .with_first_streamable_block(config.first_streamable_block)
            .with_retry_interval(config.start_block_retry_interval)
            .with_warn_every(config.start_block_warn_every)
    }

    /// Sets the bundle size. Zero is ignored.
    pub fn with_bundle_size(mut self, bundle_size: u64) -> Self {
        if bundle_size > 0 {
            self.bundle_size = bundle_size;
        }
        self
    }

    /// Sets the first streamable block of the protocol.
    pub const fn with_first_streamable_block(mut self, block: u64) -> Self {
        self.first_streamable_block = block;
        self
    }

    /// Sets the wait between two failed LIB polls.
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Sets how many consecutive failures separate two warnings. Zero is ignored.
    pub fn with_warn_every(mut self, warn_every: usize) -> Self {
        if warn_every > 0 {
            self.warn_every = warn_every;
        }
        self
    }

    /// Records tracker failures in `metrics`.
    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Rewinds `block` to the previous bundle boundary with this resolver's settings.
    pub const fn previous_bundle(&self, block: u64) -> u64 {
        previous_bundle(block, self.bundle_size, self.first_streamable_block)
    }

    /// Resolves the start block.
    ///
    /// Returns `None` if `cancel` fired before a start block could be picked. Cancellation wins
    /// over a tracker answer that is ready at the same time.
    pub async fn resolve(&self, cancel: &CancellationToken) -> Option<u64> {
        info!(target: "firehose::start_block", "Retrieving live start block");

        let mut retries = 0usize;
        let lib = loop {
            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                res = self.tracker.get(BlockRefTarget::Lib) => res,
            };

            match res {
                Ok(lib) => break lib,
                Err(err) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.tracker_failures.increment(1);
                    }
                    if retries % self.warn_every == self.warn_every - 1 {
                        warn!(target: "firehose::start_block", retries, %err, "Cannot get LIB from tracker, retrying");
                    } else {
                        debug!(target: "firehose::start_block", retries, %err, "Cannot get LIB from tracker");
                    }
                    retries += 1;
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.retry_interval) => {}
            }
        };

        let head = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            res = self.tracker.get(BlockRefTarget::Head) => res,
        };

        let lib = lib.number();
        let start = match head {
            Err(err) => {
                let start = self.previous_bundle(lib);
                info!(target: "firehose::start_block", lib, start, %err, "Tracker cannot get HEAD, rewinding start block further");
                start
            }
            Ok(head) if same_bundle(head.number(), lib, self.bundle_size) => {
                let start = self.previous_bundle(lib);
                info!(target: "firehose::start_block", head = head.number(), lib, start, "HEAD is in same bundle as LIB, rewinding start block further");
                start
            }
            Ok(head) => {
                debug!(target: "firehose::start_block", head = head.number(), lib, "Starting live feed at LIB");
                lib
            }
        };

        Some(start)
    }
}
