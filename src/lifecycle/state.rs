//! Server state machine.
//!
//! ```text
//! Stopped → Starting → Running → ShuttingDown → Terminated
//!              │           │
//!              └───────────┴──────→ Terminated   (bind or serve failure)
//! ```
//!
//! The state is published over a watch channel; the serve task and the
//! shutdown watcher only ever talk to each other through it.

use std::sync::Arc;

use tokio::sync::watch;

/// Lifecycle state of one server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Created, not started yet.
    Stopped,
    /// Binding the listener.
    Starting,
    /// Accepting connections.
    Running,
    /// No new connections; in-flight requests are draining.
    ShuttingDown,
    /// Final state. The listener is closed and all connection tasks are gone.
    Terminated,
}

impl ServerState {
    /// Whether the accept loop should stop.
    pub fn is_draining(self) -> bool {
        matches!(self, ServerState::ShuttingDown | ServerState::Terminated)
    }

    pub fn is_terminated(self) -> bool {
        self == ServerState::Terminated
    }
}

/// Shared handle to a server's state.
#[derive(Debug, Clone)]
pub struct StateTracker {
    tx: Arc<watch::Sender<ServerState>>,
}

impl StateTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Stopped);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> ServerState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }

    /// Move to `to` if, and only if, the current state is `from`.
    ///
    /// The check and the update happen under the channel lock, so of two
    /// racing callers exactly one succeeds.
    pub fn transition(&self, from: ServerState, to: ServerState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Resolves once the state satisfies `predicate`.
    pub async fn wait_until<F>(&self, predicate: F)
    where
        F: FnMut(&ServerState) -> bool,
    {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(predicate).await;
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped() {
        assert_eq!(StateTracker::new().get(), ServerState::Stopped);
    }

    #[test]
    fn transition_requires_expected_state() {
        let state = StateTracker::new();
        assert!(!state.transition(ServerState::Running, ServerState::ShuttingDown));
        assert_eq!(state.get(), ServerState::Stopped);

        assert!(state.transition(ServerState::Stopped, ServerState::Starting));
        assert!(state.transition(ServerState::Starting, ServerState::Running));
        assert_eq!(state.get(), ServerState::Running);
    }

    #[test]
    fn second_shutdown_transition_is_a_no_op() {
        let state = StateTracker::new();
        state.transition(ServerState::Stopped, ServerState::Starting);
        state.transition(ServerState::Starting, ServerState::Running);

        assert!(state.transition(ServerState::Running, ServerState::ShuttingDown));
        assert!(!state.transition(ServerState::Running, ServerState::ShuttingDown));
        assert_eq!(state.get(), ServerState::ShuttingDown);
    }

    #[test]
    fn draining_covers_shutdown_and_terminated() {
        assert!(!ServerState::Running.is_draining());
        assert!(ServerState::ShuttingDown.is_draining());
        assert!(ServerState::Terminated.is_draining());
        assert!(ServerState::Terminated.is_terminated());
    }

    #[tokio::test]
    async fn wait_until_observes_later_transition() {
        let state = StateTracker::new();
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait_until(|s| s.is_terminated()).await })
        };

        state.transition(ServerState::Stopped, ServerState::Terminated);
        waiter.await.unwrap();
    }
}
