//! Transport server contract and the readiness probe server.

mod health;

pub use health::{health_response, HealthServer, HEALTH_PATH};

use crate::error::ServerError;
use std::{fmt::Debug, time::Duration};

/// The server exposing firehose to clients.
///
/// The app launches it in a tracked task. When [`TransportServer::launch`] returns, for whatever
/// reason, the app terminates.
#[async_trait::async_trait]
pub trait TransportServer: Send + Sync + Debug {
    /// Serves until shut down.
    async fn launch(&self) -> Result<(), ServerError>;

    /// Stops accepting connections and lets in-flight ones drain for at most `grace_period`
    /// before forcing them closed. Returns once the server stopped.
    async fn shutdown(&self, grace_period: Duration);
}
