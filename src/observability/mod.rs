//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → audit.rs (one record per request, masked client address)
//!     → AuditSink (tracing by default)
//!     → metrics.rs (request counter, latency histogram)
//!
//! Startup:
//!     → logging.rs (subscriber installed once)
//!     → metrics.rs (optional Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing in release mode
//! - Client addresses are truncated before any log line is built
//! - Metrics are cheap (no-op without a recorder)

pub mod anonymize;
pub mod audit;
pub mod logging;
pub mod metrics;

pub use anonymize::mask;
pub use audit::{
    AuditRecord, AuditSink, PendingAudit, RequestAuditor, RequestInfo, Severity, TracingSink,
    CLIENT_CLOSED_REQUEST,
};
pub use logging::init_logging;
