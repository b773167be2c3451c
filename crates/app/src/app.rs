use crate::{
    config::Config,
    error::{AppError, HubError},
    hub::{HybridSource, TailManager},
    live::{LiveFeedBootstrapper, SyncOutcome},
    metrics::AppMetrics,
    readiness::ReadinessState,
    server::TransportServer,
    shutdown::Terminator,
    start_block::StartBlockResolver,
    tracker::Tracker,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Collaborators the app orchestrates.
#[derive(Debug, Clone)]
pub struct Modules {
    /// Source of the LIB and HEAD references.
    pub tracker: Arc<dyn Tracker>,
    /// Hybrid historical/live source, required when live streaming is enabled.
    pub hybrid_source: Option<Arc<dyn HybridSource>>,
    /// Tail eviction of the live buffer, launched with live streaming.
    pub tail_manager: Option<Arc<dyn TailManager>>,
    /// Server exposing firehose.
    pub server: Arc<dyn TransportServer>,
}

impl Modules {
    /// Modules without live streaming support.
    pub fn new(tracker: Arc<dyn Tracker>, server: Arc<dyn TransportServer>) -> Self {
        Self { tracker, hybrid_source: None, tail_manager: None, server }
    }

    /// Sets the hybrid source.
    pub fn with_hybrid_source(mut self, source: Arc<dyn HybridSource>) -> Self {
        self.hybrid_source = Some(source);
        self
    }

    /// Sets the tail manager.
    pub fn with_tail_manager(mut self, tail_manager: Arc<dyn TailManager>) -> Self {
        self.tail_manager = Some(tail_manager);
        self
    }
}

/// The firehose app.
///
/// [`App::run`] launches the transport server and, with live streaming, resolves the live start
/// block, launches the hybrid source and waits for it to reach real-time. Only then does the
/// readiness gate flip.
#[derive(Debug)]
pub struct App {
    config: Config,
    modules: Modules,
    readiness: Arc<ReadinessState>,
    terminator: Terminator,
    metrics: AppMetrics,
}

impl App {
    /// Creates a new app.
    pub fn new(config: Config, modules: Modules) -> Self {
        Self::with_readiness(config, modules, Arc::new(ReadinessState::new()))
    }

    /// Creates a new app sharing `readiness` with an already built server.
    pub fn with_readiness(config: Config, modules: Modules, readiness: Arc<ReadinessState>) -> Self {
        let metrics = AppMetrics::new();
        metrics.set_ready(false);
        let terminator = Terminator::with_metrics(
            Arc::clone(&readiness),
            Arc::clone(&modules.server),
            config.grpc_shutdown_grace_period,
            Some(metrics.clone()),
        );
        Self { config, modules, readiness, terminator, metrics }
    }

    /// The app config.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Shared readiness state, to be handed to the readiness probe.
    pub fn readiness(&self) -> Arc<ReadinessState> {
        Arc::clone(&self.readiness)
    }

    /// Returns `true` if the app accepts requests.
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// The app's shutdown coordinator.
    pub const fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    /// Runs the startup sequence.
    ///
    /// Returns once the app is ready, or without error if termination interrupted the startup. On
    /// error the app is terminated before returning.
    pub async fn run(&self) -> Result<(), AppError> {
        info!(target: "firehose::app", config = ?self.config, "Running firehose");
        if let Err(err) = self.config.validate() {
            return self.fail(err.into())
        }

        let live = self.config.live_enabled();
        let source = match (&self.modules.hybrid_source, live) {
            (Some(source), true) => Some(Arc::clone(source)),
            (None, true) => return self.fail(AppError::MissingHybridSource),
            (_, false) => None,
        };

        if let (Some(tail_manager), true) = (&self.modules.tail_manager, live) {
            let tail_manager = Arc::clone(tail_manager);
            let cancel = self.terminator.cancellation();
            self.terminator.spawn("tail-manager", async move { tail_manager.launch(cancel).await });
        }

        info!(target: "firehose::app", live_support = live, addr = %self.config.grpc_listen_addr, "Launching transport server");
        let server = Arc::clone(&self.modules.server);
        let terminator = self.terminator.clone();
        self.terminator.spawn("transport-server", async move {
            let res = server.launch().await;
            if !terminator.is_terminating() {
                warn!(target: "firehose::app", ?res, "Transport server stopped on its own");
            }
            terminator.terminate(res.err().map(|err| err.to_string()));
        });

        let Some(source) = source else {
            self.mark_ready();
            return Ok(())
        };

        let resolver = StartBlockResolver::from_config(Arc::clone(&self.modules.tracker), &self.config)
            .with_metrics(self.metrics.clone());
        let bootstrapper = LiveFeedBootstrapper::new(source, self.terminator.clone());
        let cancel = self.terminator.cancellation();
        let metrics = self.metrics.clone();
        let (startup_tx, startup_rx) = oneshot::channel();
        self.terminator.spawn("live-startup", async move {
            let res = start_live(&resolver, &bootstrapper, &cancel, &metrics).await;
            let _ = startup_tx.send(res);
        });

        match startup_rx.await {
            Ok(Ok(SyncOutcome::RealTime)) => {
                self.mark_ready();
                Ok(())
            }
            Ok(Ok(SyncOutcome::Cancelled)) => {
                info!(target: "firehose::app", "Startup interrupted by termination");
                Ok(())
            }
            Ok(Err(err)) => self.fail(err.into()),
            Err(_) if self.terminator.is_terminating() => Ok(()),
            Err(_) => self.fail(AppError::StartupTask("live startup task ended unexpectedly".into())),
        }
    }

    fn mark_ready(&self) {
        if self.readiness.set_ready() && !self.readiness.is_terminating() {
            self.metrics.set_ready(true);
            info!(target: "firehose::app", "Firehose is now ready to accept requests");
        }
    }

    fn fail(&self, err: AppError) -> Result<(), AppError> {
        self.terminator.terminate(Some(err.to_string()));
        Err(err)
    }
}

/// Resolves the start block and launches the hybrid source there.
async fn start_live(
    resolver: &StartBlockResolver,
    bootstrapper: &LiveFeedBootstrapper,
    cancel: &CancellationToken,
    metrics: &AppMetrics,
) -> Result<SyncOutcome, HubError> {
    let Some(start_block) = resolver.resolve(cancel).await else {
        return Ok(SyncOutcome::Cancelled)
    };
    metrics.live_start_block.set(start_block as f64);

    info!(target: "firehose::app", start_block, "Launching hybrid source");
    bootstrapper.bootstrap(start_block).await
}
