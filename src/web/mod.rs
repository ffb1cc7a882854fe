//! # Web API Module
//!
//! Axum-based API server for a glu system.
//!
//! ## Routes
//!
//! - `GET /health` - liveness
//! - `GET /api/v1/pipelines` - every registered pipeline
//! - `GET /api/v1/pipelines/{name}` - one pipeline, 404 when unknown
//! - `GET /metrics` - prometheus scrape, 404 unless the prometheus exporter is selected
//! - everything else falls back to the static UI directory when one is configured
//!
//! The server is started with [`ApiServer::serve`] and stopped through the
//! shutdown action returned by [`ApiServer::stop_action`], which triggers a
//! graceful close and waits for in-flight connections up to the shared
//! shutdown deadline. Connections still open at the deadline are dropped.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod tls;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::config::{Protocol, ServerConfig};
use crate::error::{GluError, GluResult};
use crate::orchestration::ShutdownAction;
use state::AppState;

/// Upper bound on handling a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/pipelines", get(handlers::pipelines::list_pipelines))
        .route("/pipelines/{name}", get(handlers::pipelines::get_pipeline))
}

/// Create the application router with all routes and middleware
pub fn create_app(app_state: AppState, ui: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/metrics", get(handlers::metrics::metrics))
        .nest("/api/v1", api_v1_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::count_requests,
        ));

    if let Some(dir) = ui {
        debug!(directory = %dir.display(), "Serving UI");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(tower_http::timeout::TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state)
}

/// The API server for one service run
pub struct ApiServer {
    config: ServerConfig,
    app: Router,
    stop: CancellationToken,
    force: CancellationToken,
    stopped: CancellationToken,
    // Marks the server stopped if it is dropped without ever serving.
    _stopped_guard: DropGuard,
}

impl ApiServer {
    pub fn new(config: ServerConfig, app: Router) -> Self {
        let stopped = CancellationToken::new();
        Self {
            config,
            app,
            stop: CancellationToken::new(),
            force: CancellationToken::new(),
            _stopped_guard: stopped.clone().drop_guard(),
            stopped,
        }
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Shutdown action: request a graceful close and wait for the serve loop
    /// to finish, bounded by the shutdown deadline.
    ///
    /// Connections still open at the deadline are abandoned and the serve
    /// loop returns, so a stalled client cannot hold the service open.
    pub fn stop_action(&self) -> ShutdownAction {
        let stop = self.stop.clone();
        let force = self.force.clone();
        let stopped = self.stopped.clone();
        ShutdownAction::new("api-server", move |deadline| async move {
            // Also fires if this future is dropped at the deadline.
            let force = force.drop_guard();
            stop.cancel();
            match timeout_at(deadline, stopped.cancelled()).await {
                Ok(()) => {
                    let _ = force.disarm();
                    Ok(())
                }
                Err(_) => Err(GluError::Server(
                    "graceful close exceeded deadline, dropping open connections".to_string(),
                )),
            }
        })
    }

    /// Bind the configured address and serve until stopped.
    ///
    /// A graceful close is a successful return, as is a close forced by the
    /// shutdown deadline.
    pub async fn serve(self) -> GluResult<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| GluError::Server(format!("binding {address}: {e}")))?;
        self.serve_with_listener(listener).await
    }

    pub async fn serve_with_listener(self, listener: TcpListener) -> GluResult<()> {
        let local_addr = listener.local_addr()?;
        let Self {
            config,
            app,
            stop,
            force,
            _stopped_guard,
            ..
        } = self;

        let result = match config.protocol {
            Protocol::Http => {
                info!(address = %local_addr, protocol = "http", "API server listening");
                let serving = axum::serve(listener, app)
                    .with_graceful_shutdown(stop.cancelled_owned())
                    .into_future();
                tokio::select! {
                    result = serving => {
                        result.map_err(|e| GluError::Server(format!("serving http: {e}")))
                    }
                    _ = force.cancelled() => {
                        warn!(address = %local_addr, "Abandoning open connections");
                        Ok(())
                    }
                }
            }
            Protocol::Https => {
                let (cert, key) = match (&config.cert_file, &config.key_file) {
                    (Some(cert), Some(key)) => (cert, key),
                    _ => {
                        return Err(GluError::Server(
                            "https requires cert_file and key_file".to_string(),
                        ))
                    }
                };
                let acceptor = tls::load_acceptor(cert, key)?;
                info!(address = %local_addr, protocol = "https", "API server listening");
                serve_tls(listener, acceptor, app, stop, force).await
            }
        };

        info!(address = %local_addr, "API server stopped");
        result
    }
}

/// Pause after a failed accept, e.g. when the process is out of descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn serve_tls(
    listener: TcpListener,
    acceptor: tokio_rustls::TlsAcceptor,
    app: Router,
    stop: CancellationToken,
    force: CancellationToken,
) -> GluResult<()> {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_tls_connection(
                        stream,
                        peer,
                        acceptor.clone(),
                        app.clone(),
                        stop.clone(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                    }
                }
            },
        }
    }

    drop(listener);

    loop {
        tokio::select! {
            joined = connections.join_next() => {
                if joined.is_none() {
                    break;
                }
            }
            _ = force.cancelled() => {
                warn!(connections = connections.len(), "Abandoning open connections");
                connections.abort_all();
                break;
            }
        }
    }

    Ok(())
}

async fn serve_tls_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: tokio_rustls::TlsAcceptor,
    app: Router,
    stop: CancellationToken,
) {
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use hyper_util::server::conn::auto;

    let stream = tokio::select! {
        _ = stop.cancelled() => return,
        accepted = acceptor.accept(stream) => match accepted {
            Ok(stream) => stream,
            Err(e) => {
                debug!(peer = %peer, error = %e, "TLS handshake failed");
                return;
            }
        },
    };

    let service = hyper::service::service_fn(
        move |request: hyper::Request<hyper::body::Incoming>| app.clone().oneshot(request),
    );
    let builder = auto::Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => {
            if let Err(e) = result {
                debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        }
        _ = stop.cancelled() => {
            connection.as_mut().graceful_shutdown();
            if let Err(e) = connection.await {
                debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        }
    }
}
