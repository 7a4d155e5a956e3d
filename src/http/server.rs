//! HTTP server lifecycle.
//!
//! # Responsibilities
//! - Bind the listener and serve connections on a spawned task
//! - Watch for termination signals and external cancellation on a second task
//! - Stop accepting, drain in-flight requests, and give up after the grace period
//! - Join every task it started before reporting shutdown complete
//!
//! # Data Flow
//! ```text
//! start()
//!     → Listener::bind            Stopped → Starting → Running
//!     → serve task                accept loop, one task per connection (JoinSet)
//!     → watcher task              select { signal, cancellation } → ShuttingDown
//! serve task on ShuttingDown
//!     → drop listener             no new connections
//!     → graceful close            race drain against grace period
//!     → abort leftovers           only if the grace period elapsed
//!     → Terminated
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::ConnectInfo, Router};
use hyper::{body::Incoming, server::conn::http1, Request};
use hyper_util::rt::{TokioIo, TokioTimer};
use thiserror::Error;
use tokio::{net::TcpStream, sync::watch, task::JoinHandle, task::JoinSet};
use tower::ServiceExt;

use crate::config::ServerConfig;
use crate::lifecycle::{
    signals,
    state::{ServerState, StateTracker},
    Shutdown, ShutdownTrigger,
};
use crate::net::{ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener, ListenerError};

/// Default time in-flight requests get once shutdown starts.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Errors that stop the server from serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Runtime settings for [`HttpServer`].
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Upper bound on draining in-flight requests during shutdown.
    pub grace_period: Duration,
    /// Maximum concurrently served connections.
    pub max_connections: usize,
    /// Install SIGINT/SIGTERM handlers as shutdown triggers.
    pub listen_for_signals: bool,
}

impl ServerSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            grace_period: config.shutdown.grace_period(),
            max_connections: config.listener.max_connections,
            listen_for_signals: true,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            max_connections: 10_000,
            listen_for_signals: true,
        }
    }
}

/// HTTP server owning the listener and its shutdown.
pub struct HttpServer {
    app: Router,
    settings: ServerSettings,
    shutdown: Shutdown,
    state: StateTracker,
}

impl HttpServer {
    /// Create a server for an application router (usually [`Pipeline::apply`] output).
    ///
    /// [`Pipeline::apply`]: crate::http::Pipeline::apply
    pub fn new(settings: ServerSettings, app: Router) -> Self {
        Self {
            app,
            settings,
            shutdown: Shutdown::new(),
            state: StateTracker::new(),
        }
    }

    /// Use a caller-supplied cancellation instead of a fresh one.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// Bind `address` and start serving in the background.
    ///
    /// Returns as soon as the listener is bound. A bind failure is fatal for
    /// this server; the returned error is the only report of it.
    pub async fn start(self, address: &str) -> Result<ServerHandle, ServerError> {
        let entered = self
            .state
            .transition(ServerState::Stopped, ServerState::Starting);
        assert!(entered, "HttpServer::start called on a server that is not stopped");

        tracing::info!(address, "Starting server");
        let listener = match Listener::bind(address, self.settings.max_connections).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state
                    .transition(ServerState::Starting, ServerState::Terminated);
                tracing::error!(error = %e, "Server failed to start");
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr();

        self.state
            .transition(ServerState::Starting, ServerState::Running);
        tracing::info!(address = %local_addr, "Server running");

        let serve = tokio::spawn(serve(
            listener,
            self.app,
            self.state.clone(),
            self.settings.grace_period,
        ));
        let watcher = tokio::spawn(watch_triggers(
            self.state.clone(),
            self.shutdown.clone(),
            self.settings.listen_for_signals,
        ));

        Ok(ServerHandle {
            local_addr,
            state: self.state,
            shutdown: self.shutdown,
            serve: Some(serve),
            watcher: Some(watcher),
        })
    }
}

/// Handle to a started server.
///
/// Dropping the handle without awaiting [`await_shutdown`](Self::await_shutdown)
/// aborts the server tasks.
pub struct ServerHandle {
    local_addr: SocketAddr,
    state: StateTracker,
    shutdown: Shutdown,
    serve: Option<JoinHandle<Result<(), ServerError>>>,
    watcher: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// Cancellation handle feeding this server's shutdown watcher.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Ask the server to shut down. Repeated calls are no-ops.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait until the server has fully stopped and all its tasks are joined.
    ///
    /// Returns the fatal serving error, if the server stopped because of one.
    pub async fn await_shutdown(mut self) -> Result<(), ServerError> {
        let served = match self.serve.take() {
            Some(serve) => serve.await,
            None => Ok(Ok(())),
        };
        if let Some(watcher) = self.watcher.take() {
            watcher.await?;
        }
        served?
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(serve) = self.serve.take() {
            serve.abort();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

/// Single `Running → ShuttingDown` transition. Returns whether this call made it.
fn begin_shutdown(state: &StateTracker, trigger: ShutdownTrigger) -> bool {
    if state.transition(ServerState::Running, ServerState::ShuttingDown) {
        tracing::info!(%trigger, "Shutting down server gracefully");
        true
    } else {
        tracing::debug!(%trigger, state = ?state.get(), "Shutdown already under way, ignoring trigger");
        false
    }
}

async fn watch_triggers(state: StateTracker, shutdown: Shutdown, listen_for_signals: bool) {
    let signal = async {
        if listen_for_signals {
            signals::termination().await
        } else {
            std::future::pending::<()>().await
        }
    };

    let trigger = tokio::select! {
        _ = signal => ShutdownTrigger::Signal,
        _ = shutdown.triggered() => ShutdownTrigger::Cancelled,
        // The serve task ended on its own (fatal error); nothing left to trigger.
        _ = state.wait_until(|s| s.is_terminated()) => return,
    };

    begin_shutdown(&state, trigger);
}

async fn draining(rx: &mut watch::Receiver<ServerState>) {
    let _ = rx.wait_for(|s| s.is_draining()).await;
}

/// Sleep for `delay`, waking early once the server starts draining.
async fn back_off(delay: Duration, rx: &mut watch::Receiver<ServerState>) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = draining(rx) => {}
    }
}

async fn serve(
    listener: Listener,
    app: Router,
    state: StateTracker,
    grace_period: Duration,
) -> Result<(), ServerError> {
    let mut state_rx = state.subscribe();
    let tracker = ConnectionTracker::new();
    let mut connections = JoinSet::new();
    let mut backoff = Duration::ZERO;

    let outcome = loop {
        tokio::select! {
            biased;

            _ = draining(&mut state_rx) => break Ok(()),

            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                log_connection_exit(joined);
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    backoff = Duration::ZERO;
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        permit,
                        tracker.track(),
                        app.clone(),
                        state.subscribe(),
                    ));
                }
                Err(e) if e.is_transient() => {
                    backoff = (backoff * 2).clamp(Duration::from_millis(5), MAX_ACCEPT_BACKOFF);
                    tracing::warn!(error = %e, retry_in = ?backoff, "Accept failed, retrying");
                    back_off(backoff, &mut state_rx).await;
                }
                Err(e) => break Err(e),
            },
        }
    };

    // The listener is closed here and nowhere else.
    drop(listener);

    if let Err(e) = outcome {
        tracing::error!(error = %e, "Server encountered an error");
        connections.shutdown().await;
        state.transition(ServerState::Running, ServerState::Terminated);
        state.transition(ServerState::ShuttingDown, ServerState::Terminated);
        return Err(e.into());
    }

    tracing::info!(
        in_flight = tracker.active_count(),
        grace_period = ?grace_period,
        "Listener closed, draining connections"
    );

    let drained = tokio::time::timeout(grace_period, async {
        while let Some(joined) = connections.join_next().await {
            log_connection_exit(joined);
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            abandoned = tracker.active_count(),
            grace_period = ?grace_period,
            "Grace period elapsed, abandoning in-flight requests"
        );
        connections.shutdown().await;
    }

    state.transition(ServerState::ShuttingDown, ServerState::Terminated);
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    _permit: ConnectionPermit,
    guard: ConnectionGuard,
    app: Router,
    mut state_rx: watch::Receiver<ServerState>,
) {
    let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        app.clone().oneshot(request)
    });

    let mut builder = http1::Builder::new();
    builder.timer(TokioTimer::new());
    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = draining(&mut state_rx) => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = %guard.id(), peer = %peer, error = %e, "Connection ended with error");
    }
}

fn log_connection_exit(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        }
    }
}
