//! Per-request audit records.
//!
//! # Responsibilities
//! - Build one [`AuditRecord`] per completed request
//! - Truncate the client address before it leaves the process
//! - Pick the log level from the error the handler reported, if any
//! - Hand the record to an [`AuditSink`]
//! - Still emit a record when the request is dropped before it completes
//!
//! # Design Decisions
//! - The sink is injected, so tests and alternative outputs never touch the
//!   global subscriber
//! - Emission never fails; serialization problems are logged on their own line

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};
use serde::Serialize;

use crate::http::error::HandlerError;
use crate::observability::anonymize::mask;
use crate::observability::metrics;

/// Tracing target audit lines are written under.
pub const AUDIT_TARGET: &str = "flow_server::audit";

/// Status recorded for a request dropped before a response existed
/// (client went away, shutdown abort, outer timeout).
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

const ABORTED_MESSAGE: &str = "request aborted before a response was produced";

/// Level an audit record is emitted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Warn,
    Error,
}

/// Privacy-safe summary of one completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub status_code: String,
    pub latency: String,
    pub user_agent: String,
    pub method: String,
    pub path: String,
    pub client_address_masked: String,
}

/// Request details captured before the handler runs.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub started: Instant,
    pub method: Method,
    pub path: String,
    pub user_agent: String,
    /// Unmasked client address; masked when the record is built.
    pub client_address: String,
}

impl AuditRecord {
    pub fn new(request: &RequestInfo, status: StatusCode, latency: Duration) -> Self {
        Self::with_status_code(request, status.as_u16(), latency)
    }

    fn with_status_code(request: &RequestInfo, status: u16, latency: Duration) -> Self {
        Self {
            status_code: status.to_string(),
            latency: format!("{latency:?}"),
            user_agent: request.user_agent.clone(),
            method: request.method.to_string(),
            path: request.path.clone(),
            client_address_masked: mask(&request.client_address),
        }
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync + 'static {
    fn emit(&self, severity: Severity, record: &AuditRecord, error: Option<&str>);
}

/// Writes audit records through `tracing` as JSON-encoded `record` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn emit(&self, severity: Severity, record: &AuditRecord, error: Option<&str>) {
        let record = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(target: AUDIT_TARGET, error = %e, "Failed to serialize audit record");
                format!("{record:?}")
            }
        };

        match severity {
            Severity::Error => tracing::error!(
                target: AUDIT_TARGET,
                error = error.unwrap_or_default(),
                record = %record,
                "Endpoint call"
            ),
            Severity::Warn => tracing::warn!(
                target: AUDIT_TARGET,
                error = error.unwrap_or_default(),
                record = %record,
                "Endpoint call"
            ),
            Severity::Debug => tracing::debug!(target: AUDIT_TARGET, record = %record, "Endpoint call"),
        }
    }
}

/// Derives and emits the audit record for each request.
#[derive(Clone)]
pub struct RequestAuditor {
    sink: Arc<dyn AuditSink>,
    trust_forwarded_headers: bool,
}

impl RequestAuditor {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            trust_forwarded_headers: false,
        }
    }

    /// Auditor writing through the process-wide `tracing` subscriber.
    pub fn with_tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP` when present.
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    pub fn trusts_forwarded_headers(&self) -> bool {
        self.trust_forwarded_headers
    }

    /// Record a finished request. Returns the record that was emitted.
    pub fn observe(
        &self,
        request: &RequestInfo,
        status: StatusCode,
        error: Option<&HandlerError>,
    ) -> AuditRecord {
        self.emit_record(request, status.as_u16(), error)
    }

    /// Start auditing a request. The returned guard emits exactly one
    /// record: on [`PendingAudit::complete`], or on drop if the request
    /// never completed.
    pub fn begin(&self, request: RequestInfo) -> PendingAudit {
        PendingAudit {
            auditor: self.clone(),
            request,
            emitted: false,
        }
    }

    fn emit_record(&self, request: &RequestInfo, status: u16, error: Option<&HandlerError>) -> AuditRecord {
        let latency = request.started.elapsed();
        let record = AuditRecord::with_status_code(request, status, latency);
        let severity = error.map_or(Severity::Debug, HandlerError::severity);

        self.sink
            .emit(severity, &record, error.map(HandlerError::message));
        metrics::record_request(request.method.as_str(), status, latency);

        record
    }
}

/// Audit record owed for an in-flight request.
pub struct PendingAudit {
    auditor: RequestAuditor,
    request: RequestInfo,
    emitted: bool,
}

impl PendingAudit {
    /// Record the final response.
    pub fn complete(mut self, status: StatusCode, error: Option<&HandlerError>) -> AuditRecord {
        self.emitted = true;
        self.auditor.observe(&self.request, status, error)
    }
}

impl Drop for PendingAudit {
    fn drop(&mut self) {
        if !self.emitted {
            let aborted = HandlerError::client(ABORTED_MESSAGE);
            self.auditor
                .emit_record(&self.request, CLIENT_CLOSED_REQUEST, Some(&aborted));
        }
    }
}

impl std::fmt::Debug for RequestAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuditor")
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that keeps every emitted record for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) entries: Mutex<Vec<(Severity, AuditRecord, Option<String>)>>,
    }

    impl AuditSink for RecordingSink {
        fn emit(&self, severity: Severity, record: &AuditRecord, error: Option<&str>) {
            self.entries
                .lock()
                .unwrap()
                .push((severity, record.clone(), error.map(String::from)));
        }
    }

    fn request() -> RequestInfo {
        RequestInfo {
            started: Instant::now(),
            method: Method::GET,
            path: "/users".into(),
            user_agent: "curl/8.0".into(),
            client_address: "203.0.113.42".into(),
        }
    }

    #[test]
    fn record_has_masked_address_and_string_fields() {
        let record = AuditRecord::new(&request(), StatusCode::OK, Duration::from_millis(12));
        assert_eq!(record.status_code, "200");
        assert_eq!(record.latency, "12ms");
        assert_eq!(record.method, "GET");
        assert_eq!(record.path, "/users");
        assert_eq!(record.user_agent, "curl/8.0");
        assert_eq!(record.client_address_masked, "203.0.113.xxx");
    }

    #[test]
    fn record_serializes_with_fixed_keys() {
        let record = AuditRecord::new(&request(), StatusCode::OK, Duration::from_millis(1));
        let value = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "client_address_masked",
                "latency",
                "method",
                "path",
                "status_code",
                "user_agent"
            ]
        );
    }

    #[test]
    fn success_is_emitted_at_debug() {
        let sink = Arc::new(RecordingSink::default());
        let auditor = RequestAuditor::new(sink.clone());

        auditor.observe(&request(), StatusCode::OK, None);

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Severity::Debug);
        assert_eq!(entries[0].2, None);
    }

    #[test]
    fn internal_error_is_emitted_at_error_with_text() {
        let sink = Arc::new(RecordingSink::default());
        let auditor = RequestAuditor::new(sink.clone());
        let error = HandlerError::internal("database unreachable");

        auditor.observe(&request(), StatusCode::INTERNAL_SERVER_ERROR, Some(&error));

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Severity::Error);
        assert_eq!(entries[0].1.status_code, "500");
        assert_eq!(entries[0].2.as_deref(), Some("database unreachable"));
    }

    #[test]
    fn client_error_is_emitted_at_warn() {
        let sink = Arc::new(RecordingSink::default());
        let auditor = RequestAuditor::new(sink.clone());
        let error = HandlerError::client("invalid email");

        auditor.observe(&request(), StatusCode::BAD_REQUEST, Some(&error));

        assert_eq!(sink.entries.lock().unwrap()[0].0, Severity::Warn);
    }

    #[test]
    fn completed_request_is_emitted_once() {
        let sink = Arc::new(RecordingSink::default());
        let auditor = RequestAuditor::new(sink.clone());

        let pending = auditor.begin(request());
        let record = pending.complete(StatusCode::CREATED, None);

        assert_eq!(record.status_code, "201");
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Severity::Debug);
    }

    #[test]
    fn dropped_request_is_emitted_as_aborted() {
        let sink = Arc::new(RecordingSink::default());
        let auditor = RequestAuditor::new(sink.clone());

        drop(auditor.begin(request()));

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let (severity, record, error) = &entries[0];
        assert_eq!(*severity, Severity::Warn);
        assert_eq!(record.status_code, "499");
        assert_eq!(record.path, "/users");
        assert_eq!(error.as_deref(), Some(ABORTED_MESSAGE));
    }

    #[test]
    fn tracing_sink_does_not_panic_without_subscriber() {
        let record = AuditRecord::new(&request(), StatusCode::OK, Duration::from_millis(1));
        TracingSink.emit(Severity::Error, &record, Some("boom"));
        TracingSink.emit(Severity::Debug, &record, None);
    }
}
