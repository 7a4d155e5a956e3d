//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Tell transient accept errors apart from fatal ones

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    /// Failed to accept connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
    /// The connection limiter was closed.
    #[error("connection limiter closed")]
    Closed,
}

impl ListenerError {
    /// Accept errors that concern one connection or a momentary resource
    /// shortage; the accept loop backs off and carries on after these.
    pub fn is_transient(&self) -> bool {
        match self {
            ListenerError::Accept(e) => is_transient_accept_error(e),
            _ => false,
        }
    }
}

fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || is_resource_exhaustion(e)
}

/// EMFILE / ENFILE / ENOBUFS / ENOMEM: too many open files or no buffer space.
fn is_resource_exhaustion(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::OutOfMemory
        || e.raw_os_error().is_some_and(|code| RESOURCE_ERRNOS.contains(&code))
}

#[cfg(target_os = "linux")]
const RESOURCE_ERRNOS: &[i32] = &[12, 23, 24, 105];

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
const RESOURCE_ERRNOS: &[i32] = &[12, 23, 24, 55];

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
const RESOURCE_ERRNOS: &[i32] = &[];

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Address actually bound (resolves port 0).
    local_addr: SocketAddr,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind to `address` (`host:port`, hostnames are resolved).
    pub async fn bind(address: &str, max_connections: usize) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            address: address.to_string(),
            source,
        };

        let inner = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::info!(
            address = %local_addr,
            max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner,
            local_addr,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Waits while the limit is reached. The returned permit must be held for
    /// the connection's lifetime. Cancel safe.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::trace!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool, even if
/// the connection task was aborted.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_resolves_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0", 4).await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        assert_eq!(listener.available_permits(), 4);
    }

    #[tokio::test]
    async fn bind_on_taken_port_fails() {
        let first = Listener::bind("127.0.0.1:0", 4).await.unwrap();
        let taken = first.local_addr().to_string();

        let err = Listener::bind(&taken, 4).await.err().unwrap();
        assert!(matches!(err, ListenerError::Bind { ref address, .. } if *address == taken));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn permit_is_held_per_connection() {
        let listener = Listener::bind("127.0.0.1:0", 2).await.unwrap();
        let addr = listener.local_addr();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
    }

    #[test]
    fn classifies_accept_errors() {
        let reset = ListenerError::Accept(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(reset.is_transient());

        let oom = ListenerError::Accept(io::Error::from(io::ErrorKind::OutOfMemory));
        assert!(oom.is_transient());

        let denied = ListenerError::Accept(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!denied.is_transient());
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn descriptor_exhaustion_is_transient() {
        // EMFILE shares its value across Linux and the BSDs.
        let emfile = ListenerError::Accept(io::Error::from_raw_os_error(24));
        assert!(emfile.is_transient());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_enobufs_is_transient() {
        let enobufs = ListenerError::Accept(io::Error::from_raw_os_error(105));
        assert!(enobufs.is_transient());
    }
}
