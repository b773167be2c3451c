use super::TransportServer;
use crate::{error::ServerError, readiness::ReadinessState};
use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Path of the readiness probe.
pub const HEALTH_PATH: &str = "/healthz";

/// Serves the readiness gate over HTTP/1 for load balancer probes.
///
/// `GET /healthz` (or `/`) answers `200` while the instance is ready and `503` otherwise.
#[derive(Debug)]
pub struct HealthServer {
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    readiness: Arc<ReadinessState>,
    launched: AtomicBool,
    /// Stop accepting, drain connections.
    shutdown: CancellationToken,
    /// Abort remaining connections.
    force: CancellationToken,
    /// The accept loop and all connections are gone.
    stopped: CancellationToken,
}

impl HealthServer {
    /// Binds `addr`. Use port 0 to pick a free port, see [`HealthServer::local_addr`].
    pub async fn bind(
        addr: SocketAddr,
        readiness: Arc<ReadinessState>,
    ) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(addr).await.map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener: Mutex::new(Some(listener)),
            local_addr,
            readiness,
            launched: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            force: CancellationToken::new(),
            stopped: CancellationToken::new(),
        })
    }

    /// The bound address.
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait::async_trait]
impl TransportServer for HealthServer {
    async fn launch(&self) -> Result<(), ServerError> {
        let listener = self.listener.lock().take().ok_or(ServerError::AlreadyLaunched)?;
        self.launched.store(true, Ordering::SeqCst);
        info!(target: "firehose::health", addr = %self.local_addr, "Serving readiness probe");

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                res = listener.accept() => match res {
                    Ok((stream, remote_addr)) => {
                        debug!(target: "firehose::health", %remote_addr, "Accepted connection");
                        connections.spawn(serve_connection(
                            stream,
                            Arc::clone(&self.readiness),
                            self.shutdown.clone(),
                        ));
                    }
                    Err(err) => warn!(target: "firehose::health", %err, "Failed to accept connection"),
                },
                // reap finished connections so the set does not grow unbounded
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
        drop(listener);

        loop {
            tokio::select! {
                biased;
                _ = self.force.cancelled() => {
                    connections.shutdown().await;
                    break
                }
                next = connections.join_next() => if next.is_none() { break },
            }
        }

        self.stopped.cancel();
        debug!(target: "firehose::health", "Readiness probe stopped");
        Ok(())
    }

    async fn shutdown(&self, grace_period: Duration) {
        self.shutdown.cancel();
        if !self.launched.load(Ordering::SeqCst) {
            return
        }

        if tokio::time::timeout(grace_period, self.stopped.cancelled()).await.is_err() {
            warn!(target: "firehose::health", ?grace_period, "Connections did not drain in time, forcing shutdown");
            self.force.cancel();
            self.stopped.cancelled().await;
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    readiness: Arc<ReadinessState>,
    shutdown: CancellationToken,
) {
    let service = service_fn(move |req: Request<Incoming>| {
        let response = health_response(req.method(), req.uri().path(), readiness.is_ready());
        async move { Ok::<_, Infallible>(response) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    let mut conn = std::pin::pin!(conn);
    let mut draining = false;
    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(err) = res {
                    debug!(target: "firehose::health", %err, "Failed to serve connection");
                }
                break
            }
            _ = shutdown.cancelled(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

/// Builds the probe response for a request on `path`.
pub fn health_response(method: &Method, path: &str, ready: bool) -> Response<Full<Bytes>> {
    let (status, body) = match path {
        HEALTH_PATH | "/" if method == Method::GET || method == Method::HEAD => {
            if ready {
                (StatusCode::OK, "ready\n")
            } else {
                (StatusCode::SERVICE_UNAVAILABLE, "not ready\n")
            }
        }
        HEALTH_PATH | "/" => (StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n"),
        _ => (StatusCode::NOT_FOUND, "not found\n"),
    };

    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
