//! Launch of the hybrid source and the wait for real-time.

use crate::{error::HubError, hub::HybridSource, shutdown::Terminator};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

/// How [`LiveFeedBootstrapper::bootstrap`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The hybrid source caught up with the chain head.
    RealTime,
    /// Termination started before the source caught up.
    Cancelled,
}

/// Launches the hybrid source and blocks until it reports real-time.
#[derive(Debug, Clone)]
pub struct LiveFeedBootstrapper {
    source: Arc<dyn HybridSource>,
    terminator: Terminator,
}

impl LiveFeedBootstrapper {
    /// Creates a new bootstrapper spawning its tasks through `terminator`.
    pub fn new(source: Arc<dyn HybridSource>, terminator: Terminator) -> Self {
        Self { source, terminator }
    }

    /// Launches the source at `start_block` in a tracked task and waits for it to reach real-time.
    ///
    /// The source failing, or stopping, before real-time is returned as an error. Once real-time
    /// was reached, a failure of the source terminates the app instead.
    pub async fn bootstrap(&self, start_block: u64) -> Result<SyncOutcome, HubError> {
        let cancel = self.terminator.cancellation();
        let (launched_tx, mut launched_rx) = oneshot::channel();

        let source = Arc::clone(&self.source);
        let terminator = self.terminator.clone();
        self.terminator.spawn("hybrid-source", async move {
            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                res = source.launch_at(start_block) => res,
            };

            // receiver is gone once the source reached real-time
            match launched_tx.send(res) {
                Ok(()) => {}
                Err(Err(err)) => {
                    error!(target: "firehose::live", %err, "Hybrid source failed");
                    terminator.terminate(Some(err.to_string()));
                }
                Err(Ok(())) => {
                    if !terminator.is_terminating() {
                        error!(target: "firehose::live", "Hybrid source stopped");
                        terminator.terminate(Some("hybrid source stopped".to_string()));
                    }
                }
            }
        });

        info!(target: "firehose::live", start_block, "Waiting until hub is real-time synced");
        let cancel = self.terminator.cancellation();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(SyncOutcome::Cancelled),
            res = &mut launched_rx => match res {
                Ok(Ok(())) => Err(HubError::StoppedBeforeRealTime),
                Ok(Err(err)) => Err(err),
                Err(_) if cancel.is_cancelled() => Ok(SyncOutcome::Cancelled),
                Err(_) => Err(HubError::Task("hybrid source task ended unexpectedly".to_string())),
            },
            _ = self.source.wait_until_real_time() => Ok(SyncOutcome::RealTime),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        readiness::ReadinessState,
        server::TransportServer,
        test_utils::{TestHybridSource, TestTransportServer},
    };
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn setup(source: &Arc<TestHybridSource>) -> (LiveFeedBootstrapper, Terminator) {
        let terminator = Terminator::new(
            Arc::new(ReadinessState::new()),
            Arc::new(TestTransportServer::default()) as Arc<dyn TransportServer>,
            Duration::from_millis(100),
        );
        let bootstrapper = LiveFeedBootstrapper::new(
            Arc::clone(source) as Arc<dyn HybridSource>,
            terminator.clone(),
        );
        (bootstrapper, terminator)
    }

    #[tokio::test]
    async fn returns_once_real_time() {
        let source = Arc::new(TestHybridSource::default());
        source.reach_real_time();
        let (bootstrapper, terminator) = setup(&source);

        assert_eq!(bootstrapper.bootstrap(200).await.unwrap(), SyncOutcome::RealTime);
        source.wait_for_launch().await;
        assert_eq!(source.launched_at(), Some(200));
        assert!(!terminator.is_terminating());
    }

    #[tokio::test]
    async fn launch_failure_is_fatal() {
        let source = Arc::new(TestHybridSource::default());
        source.fail_launch("no block store");
        let (bootstrapper, terminator) = setup(&source);

        assert_matches!(
            bootstrapper.bootstrap(200).await,
            Err(HubError::Launch { start_block: 200, .. })
        );
        assert!(!terminator.is_terminating());
    }

    #[tokio::test]
    async fn stopping_before_real_time_is_fatal() {
        let source = Arc::new(TestHybridSource::default());
        source.stop_launch();
        let (bootstrapper, _terminator) = setup(&source);

        assert_matches!(bootstrapper.bootstrap(0).await, Err(HubError::StoppedBeforeRealTime));
    }

    #[tokio::test]
    async fn cancelled_while_waiting() {
        let source = Arc::new(TestHybridSource::default());
        let (bootstrapper, terminator) = setup(&source);

        let task = tokio::spawn(async move { bootstrapper.bootstrap(300).await });
        source.wait_for_launch().await;
        terminator.shutdown().await;

        assert_eq!(task.await.unwrap().unwrap(), SyncOutcome::Cancelled);
    }

    #[tokio::test]
    async fn failure_after_real_time_terminates() {
        let source = Arc::new(TestHybridSource::default());
        source.reach_real_time();
        let (bootstrapper, terminator) = setup(&source);

        assert_eq!(bootstrapper.bootstrap(400).await.unwrap(), SyncOutcome::RealTime);
        source.wait_for_launch().await;
        source.fail_launch("relayer disconnected");

        tokio::time::timeout(Duration::from_secs(5), terminator.terminated()).await.unwrap();
        assert!(terminator.error().unwrap().contains("relayer disconnected"));
    }
}
