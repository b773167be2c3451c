//! Shutdown coordination.
//!
//! A single [`Terminator`] is shared by everything the app spawns. The first call to
//! [`Terminator::terminate`] runs the teardown, in order:
//!
//! 1. the readiness state is marked terminating, so the probe reports not ready from now on;
//! 2. the shared [`CancellationToken`] is cancelled, aborting start block resolution and the wait
//!    for real-time;
//! 3. the transport server is shut down, connections get the grace period to drain;
//! 4. tracked tasks are joined, stragglers are aborted once the grace period is over;
//! 5. the app is marked terminated.

use crate::{metrics::AppMetrics, readiness::ReadinessState, server::TransportServer};
use parking_lot::Mutex;
use std::{fmt, future::Future, sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Single-fire termination trigger shared across the app's tasks.
#[derive(Clone)]
pub struct Terminator {
    inner: Arc<TerminatorInner>,
}

struct TerminatorInner {
    readiness: Arc<ReadinessState>,
    server: Arc<dyn TransportServer>,
    grace_period: Duration,
    /// Cancelled as soon as termination starts.
    cancel: CancellationToken,
    /// Cancelled once the teardown completed.
    terminated: CancellationToken,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    error: Mutex<Option<String>>,
    metrics: Option<AppMetrics>,
}

impl Terminator {
    /// Creates a new terminator tearing down `server` with `grace_period`.
    pub fn new(
        readiness: Arc<ReadinessState>,
        server: Arc<dyn TransportServer>,
        grace_period: Duration,
    ) -> Self {
        Self::with_metrics(readiness, server, grace_period, None)
    }

    pub(crate) fn with_metrics(
        readiness: Arc<ReadinessState>,
        server: Arc<dyn TransportServer>,
        grace_period: Duration,
        metrics: Option<AppMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(TerminatorInner {
                readiness,
                server,
                grace_period,
                cancel: CancellationToken::new(),
                terminated: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
                error: Mutex::new(None),
                metrics,
            }),
        }
    }

    /// Token cancelled when termination starts.
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Returns `true` once termination started.
    pub fn is_terminating(&self) -> bool {
        self.inner.readiness.is_terminating()
    }

    /// Returns `true` once the teardown completed.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.is_cancelled()
    }

    /// The error termination was triggered with, if any.
    pub fn error(&self) -> Option<String> {
        self.inner.error.lock().clone()
    }

    /// Spawns `fut` and keeps its handle so the teardown can join it.
    ///
    /// Tasks spawned after the teardown started joining are not waited for.
    pub fn spawn<F>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        debug!(target: "firehose::shutdown", name, "Spawned tracked task");
        self.inner.tasks.lock().push((name, handle));
    }

    /// Starts termination, optionally because of `error`.
    ///
    /// Only the first call has an effect. The readiness state observes termination before the
    /// cancellation token fires. Must be called from within a tokio runtime.
    pub fn terminate(&self, error: Option<String>) {
        if !self.inner.readiness.set_terminating() {
            debug!(target: "firehose::shutdown", ?error, "Already terminating");
            return
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.set_ready(false);
        }
        match &error {
            Some(err) => error!(target: "firehose::shutdown", %err, "Terminating because of error"),
            None => info!(target: "firehose::shutdown", "Terminating"),
        }
        *self.inner.error.lock() = error;

        self.inner.cancel.cancel();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.teardown().await });
    }

    /// Resolves once the teardown completed.
    pub async fn terminated(&self) {
        self.inner.terminated.cancelled().await
    }

    /// Terminates without error and waits for the teardown.
    pub async fn shutdown(&self) {
        self.terminate(None);
        self.terminated().await
    }
}

impl TerminatorInner {
    async fn teardown(&self) {
        debug!(target: "firehose::shutdown", grace_period = ?self.grace_period, "Shutting down transport server");
        self.server.shutdown(self.grace_period).await;

        let deadline = Instant::now() + self.grace_period;
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!(target: "firehose::shutdown", name, "Task stopped"),
                Ok(Err(err)) if err.is_cancelled() => {
                    debug!(target: "firehose::shutdown", name, "Task cancelled")
                }
                Ok(Err(err)) => warn!(target: "firehose::shutdown", name, %err, "Task failed"),
                Err(_) => {
                    warn!(target: "firehose::shutdown", name, "Task did not stop within grace period, aborting");
                    handle.abort();
                }
            }
        }

        self.terminated.cancel();
        info!(target: "firehose::shutdown", "Terminated");
    }
}

impl fmt::Debug for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminator")
            .field("terminating", &self.is_terminating())
            .field("terminated", &self.is_terminated())
            .field("grace_period", &self.inner.grace_period)
            .field("tasks", &self.inner.tasks.lock().len())
            .finish_non_exhaustive()
    }
}
