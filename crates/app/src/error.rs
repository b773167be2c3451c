//! Error types of the orchestration layer.

use crate::config::ConfigError;
use firehose_primitives::BlockRefTarget;
use std::{io, net::SocketAddr};

/// Failure to answer a [`Tracker`](crate::Tracker) query.
///
/// These are expected while the live source is starting and are retried by the start block
/// resolver.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The tracker has no value for the target yet.
    #[error("tracker has no {0} block yet")]
    NotFound(BlockRefTarget),
    /// The remote block source could not be reached.
    #[error("block source unavailable: {0}")]
    Unavailable(String),
    /// Any other tracker failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Failure of the hybrid historical/live block source.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The source could not be launched.
    #[error("failed to launch hybrid source at block {start_block}: {reason}")]
    Launch {
        /// Block the source was launched at.
        start_block: u64,
        /// Why it failed.
        reason: String,
    },
    /// The source stopped before catching up with the chain head.
    #[error("hybrid source stopped before reaching real-time")]
    StoppedBeforeRealTime,
    /// The source launch task panicked or was aborted.
    #[error("hybrid source task failed: {0}")]
    Task(String),
}

/// Failure of a [`TransportServer`](crate::TransportServer).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Could not bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The server was launched twice.
    #[error("server already launched")]
    AlreadyLaunched,
    /// Generic I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Fatal errors of [`App`](crate::App).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid configuration.
    #[error("invalid app config: {0}")]
    Config(#[from] ConfigError),
    /// Live streaming is enabled but no hybrid source was provided.
    #[error("live streaming is enabled but no hybrid source was provided")]
    MissingHybridSource,
    /// The hybrid source failed.
    #[error(transparent)]
    Hub(#[from] HubError),
    /// The transport server failed.
    #[error(transparent)]
    Server(#[from] ServerError),
    /// The startup task panicked or was aborted.
    #[error("startup task failed: {0}")]
    StartupTask(String),
    /// The app was terminated because of an error.
    #[error("terminated: {0}")]
    Terminated(String),
    /// Failed to listen for process signals.
    #[error(transparent)]
    Io(#[from] io::Error),
}
