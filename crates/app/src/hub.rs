//! Contracts of the hybrid historical/live block source.
//!
//! How blocks are read, buffered and evicted is up to the implementations, the app only decides
//! when the source is launched and from which block.

use crate::error::HubError;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

/// A block source replaying historical bundles then switching over to the live feed.
#[async_trait::async_trait]
pub trait HybridSource: Send + Sync + Debug {
    /// Runs the source starting at `start_block`.
    ///
    /// The future lives as long as the source does. An error is fatal to the process.
    async fn launch_at(&self, start_block: u64) -> Result<(), HubError>;

    /// Resolves once the source caught up with the chain head.
    async fn wait_until_real_time(&self);
}

/// Background eviction of the tail of the live block buffer.
#[async_trait::async_trait]
pub trait TailManager: Send + Sync + Debug {
    /// Runs until `shutdown` is cancelled.
    async fn launch(&self, shutdown: CancellationToken);
}
