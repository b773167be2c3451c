//! Access to the chain's irreversible and head block references.

use crate::error::TrackerError;
use firehose_primitives::{BlockRef, BlockRefTarget};
use std::fmt::Debug;

/// Answers "what is the current LIB/HEAD block".
///
/// Implementations must be safe to call concurrently and repeatedly. Failures are expected while
/// the live source warms up.
#[async_trait::async_trait]
pub trait Tracker: Send + Sync + Debug {
    /// Fetches a fresh reference for `target`.
    async fn get(&self, target: BlockRefTarget) -> Result<BlockRef, TrackerError>;
}
