//! Scripted collaborators for tests.

use crate::{
    error::{HubError, ServerError, TrackerError},
    hub::{HybridSource, TailManager},
    server::TransportServer,
    tracker::Tracker,
};
use firehose_primitives::{BlockRef, BlockRefTarget};
use parking_lot::Mutex;
use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// A [`Tracker`] answering fixed LIB and HEAD values.
///
/// Unset targets fail with [`TrackerError::NotFound`].
#[derive(Debug)]
pub struct TestTracker {
    lib: Option<u64>,
    head: Option<u64>,
    lib_failures: AtomicUsize,
    block: AtomicBool,
    lib_calls: watch::Sender<usize>,
    head_calls: AtomicUsize,
}

impl Default for TestTracker {
    fn default() -> Self {
        Self {
            lib: None,
            head: None,
            lib_failures: AtomicUsize::new(0),
            block: AtomicBool::new(false),
            lib_calls: watch::channel(0).0,
            head_calls: AtomicUsize::new(0),
        }
    }
}

impl TestTracker {
    /// Sets the LIB number.
    pub const fn with_lib(mut self, lib: u64) -> Self {
        self.lib = Some(lib);
        self
    }

    /// Sets the HEAD number.
    pub const fn with_head(mut self, head: u64) -> Self {
        self.head = Some(head);
        self
    }

    /// Makes the next `times` LIB queries fail.
    pub fn fail_lib_times(&self, times: usize) {
        self.lib_failures.store(times, Ordering::SeqCst);
    }

    /// Makes every query hang forever.
    pub fn block_forever(&self) {
        self.block.store(true, Ordering::SeqCst);
    }

    /// Number of LIB queries received.
    pub fn lib_calls(&self) -> usize {
        *self.lib_calls.borrow()
    }

    /// Number of HEAD queries received.
    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    /// Resolves once at least one LIB query was received.
    pub async fn wait_for_lib_call(&self) {
        let mut calls = self.lib_calls.subscribe();
        let _ = calls.wait_for(|calls| *calls > 0).await;
    }
}

#[async_trait::async_trait]
impl Tracker for TestTracker {
    async fn get(&self, target: BlockRefTarget) -> Result<BlockRef, TrackerError> {
        let value = match target {
            BlockRefTarget::Lib => {
                self.lib_calls.send_modify(|calls| *calls += 1);
                self.lib
            }
            BlockRefTarget::Head => {
                self.head_calls.fetch_add(1, Ordering::SeqCst);
                self.head
            }
        };

        if self.block.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if target == BlockRefTarget::Lib &&
            self.lib_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
        {
            return Err(TrackerError::Unavailable("connection refused".to_string()))
        }

        value.map(|number| BlockRef::new(number, format!("{number:08x}"))).ok_or(
            TrackerError::NotFound(target),
        )
    }
}

/// A [`HybridSource`] driven by the test.
///
/// [`HybridSource::launch_at`] runs until [`TestHybridSource::fail_launch`] or
/// [`TestHybridSource::stop_launch`] is called.
#[derive(Debug)]
pub struct TestHybridSource {
    launched_at: watch::Sender<Option<u64>>,
    outcome: watch::Sender<Option<Result<(), String>>>,
    real_time: watch::Sender<bool>,
}

impl Default for TestHybridSource {
    fn default() -> Self {
        Self {
            launched_at: watch::channel(None).0,
            outcome: watch::channel(None).0,
            real_time: watch::channel(false).0,
        }
    }
}

impl TestHybridSource {
    /// Lets [`HybridSource::wait_until_real_time`] resolve.
    pub fn reach_real_time(&self) {
        self.real_time.send_replace(true);
    }

    /// Makes the running launch fail with `reason`.
    pub fn fail_launch(&self, reason: &str) {
        self.outcome.send_replace(Some(Err(reason.to_string())));
    }

    /// Makes the running launch return without error.
    pub fn stop_launch(&self) {
        self.outcome.send_replace(Some(Ok(())));
    }

    /// Block the source was launched at.
    pub fn launched_at(&self) -> Option<u64> {
        *self.launched_at.borrow()
    }

    /// Resolves once the source was launched.
    pub async fn wait_for_launch(&self) {
        let mut launched = self.launched_at.subscribe();
        let _ = launched.wait_for(Option::is_some).await;
    }
}

#[async_trait::async_trait]
impl HybridSource for TestHybridSource {
    async fn launch_at(&self, start_block: u64) -> Result<(), HubError> {
        self.launched_at.send_replace(Some(start_block));

        let mut outcome = self.outcome.subscribe();
        let res = match outcome.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        match res {
            Some(Err(reason)) => Err(HubError::Launch { start_block, reason }),
            _ => Ok(()),
        }
    }

    async fn wait_until_real_time(&self) {
        let mut real_time = self.real_time.subscribe();
        let _ = real_time.wait_for(|reached| *reached).await;
    }
}

/// A [`TransportServer`] that serves nothing.
///
/// [`TransportServer::launch`] returns when shut down or after
/// [`TestTransportServer::crash`].
#[derive(Debug, Default)]
pub struct TestTransportServer {
    launched: AtomicBool,
    stop: CancellationToken,
    crashed: AtomicBool,
    shutdown_calls: AtomicUsize,
    last_grace_period: Mutex<Option<Duration>>,
}

impl TestTransportServer {
    /// Makes the running launch return an error.
    pub fn crash(&self) {
        self.crashed.store(true, Ordering::SeqCst);
        self.stop.cancel();
    }

    /// Returns `true` once launched.
    pub fn is_launched(&self) -> bool {
        self.launched.load(Ordering::SeqCst)
    }

    /// Number of shutdown requests.
    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    /// Grace period of the last shutdown request.
    pub fn last_grace_period(&self) -> Option<Duration> {
        *self.last_grace_period.lock()
    }
}

#[async_trait::async_trait]
impl TransportServer for TestTransportServer {
    async fn launch(&self) -> Result<(), ServerError> {
        self.launched.store(true, Ordering::SeqCst);
        self.stop.cancelled().await;
        if self.crashed.load(Ordering::SeqCst) {
            return Err(ServerError::Io(std::io::Error::other("listener closed")))
        }
        Ok(())
    }

    async fn shutdown(&self, grace_period: Duration) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_grace_period.lock() = Some(grace_period);
        self.stop.cancel();
    }
}

/// A [`TailManager`] recording whether it ran.
#[derive(Debug, Default)]
pub struct TestTailManager {
    running: AtomicBool,
    stopped: AtomicBool,
}

impl TestTailManager {
    /// Returns `true` while launched.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns `true` once it observed shutdown.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TailManager for TestTailManager {
    async fn launch(&self, shutdown: CancellationToken) {
        self.running.store(true, Ordering::SeqCst);
        shutdown.cancelled().await;
        self.running.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }
}
