//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build pipeline (origin policy) → Metrics → Bind listener → Running
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM or Shutdown::trigger → ShuttingDown
//!     → Stop accepting → Drain (bounded) → Terminated
//!
//! State (state.rs):
//!     Stopped → Starting → Running → ShuttingDown → Terminated
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The first shutdown trigger wins; later ones are ignored
//! - Shutdown has a timeout: in-flight requests are abandoned after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::{Shutdown, ShutdownTrigger};
pub use state::{ServerState, StateTracker};
