//! Shutdown coordination for the server.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// What asked the server to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// SIGINT / SIGTERM (Ctrl-C on non-unix targets).
    Signal,
    /// [`Shutdown::trigger`] was called.
    Cancelled,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Signal => write!(f, "termination signal"),
            ShutdownTrigger::Cancelled => write!(f, "cancellation"),
        }
    }
}

/// Externally supplied cancellation for a running server.
///
/// Clones share the same flag. Triggering is sticky: tasks that start
/// waiting after the trigger still observe it, and triggering twice is the
/// same as triggering once.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new, untriggered shutdown handle.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called on any clone.
    pub async fn triggered(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_before_wait_is_observed() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), shutdown.triggered())
            .await
            .expect("trigger should be sticky");
    }

    #[tokio::test]
    async fn clones_share_the_flag() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();
        let waiter = tokio::spawn(async move { clone.triggered().await });

        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(shutdown.is_triggered());
    }
}
