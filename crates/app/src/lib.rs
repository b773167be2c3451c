//! Startup and readiness orchestration of the firehose block streaming service.
//!
//! The [`App`] launches the transport server, resolves the block the live feed starts at from
//! the tracker's LIB and HEAD, launches the hybrid historical/live source there and flips the
//! [`ReadinessState`] once the source caught up with the chain head. A single [`Terminator`]
//! cancels all of it, at any point, and tears the app down in a fixed order.
//!
//! ## Feature Flags
//!
//! - `test-utils`: Export scripted collaborators for testing.

#![doc(issue_tracker_base_url = "https://github.com/streamingfast/firehose-core/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod app;
pub mod args;
pub mod config;
pub mod error;
pub mod hub;
pub mod live;
pub mod metrics;
pub mod readiness;
pub mod runner;
pub mod server;
pub mod shutdown;
pub mod start_block;
pub mod tracker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{App, Modules};
pub use args::{FirehoseArgs, LogArgs};
pub use config::{Config, ConfigError};
pub use error::{AppError, HubError, ServerError, TrackerError};
pub use hub::{HybridSource, TailManager};
pub use live::{LiveFeedBootstrapper, SyncOutcome};
pub use readiness::ReadinessState;
pub use runner::run_until_ctrl_c;
pub use server::{HealthServer, TransportServer};
pub use shutdown::Terminator;
pub use start_block::StartBlockResolver;
pub use tracker::Tracker;

pub use firehose_primitives::{BlockRef, BlockRefTarget};
