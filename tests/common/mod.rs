//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{routing::get, Router};
use flow_server::http::{HttpServer, Pipeline, ServerHandle, ServerSettings};
use flow_server::observability::{AuditRecord, AuditSink, RequestAuditor, Severity};
use flow_server::security::OriginPolicy;

pub const ALLOWED_ORIGIN: &str = "https://app.example.com";

/// Audit sink that keeps every record for later assertions.
#[derive(Default)]
pub struct CapturedAudit {
    entries: Mutex<Vec<(Severity, AuditRecord)>>,
}

impl CapturedAudit {
    pub fn entries(&self) -> Vec<(Severity, AuditRecord)> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditSink for CapturedAudit {
    fn emit(&self, severity: Severity, record: &AuditRecord, _error: Option<&str>) {
        self.entries.lock().unwrap().push((severity, record.clone()));
    }
}

/// A started server plus the counters tests assert on.
pub struct TestServer {
    pub handle: ServerHandle,
    pub calls: Arc<AtomicUsize>,
    pub audit: Arc<CapturedAudit>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.local_addr(), path)
    }

    pub fn handler_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Start a server on an ephemeral port with `/ping` and `/slow` routes.
///
/// `/slow` sleeps for `slow_for` before answering.
pub async fn start_server(grace_period: Duration, slow_for: Duration) -> TestServer {
    let calls = Arc::new(AtomicUsize::new(0));
    let audit = Arc::new(CapturedAudit::default());

    let ping_calls = calls.clone();
    let slow_calls = calls.clone();
    let routes = Router::new()
        .route(
            "/ping",
            get(move || {
                ping_calls.fetch_add(1, Ordering::SeqCst);
                async { "pong" }
            }),
        )
        .route(
            "/slow",
            get(move || {
                slow_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(slow_for).await;
                    "finally"
                }
            }),
        );

    let policy = OriginPolicy::new([ALLOWED_ORIGIN]).unwrap();
    let pipeline = Pipeline::new(policy, RequestAuditor::new(audit.clone()));
    let settings = ServerSettings {
        grace_period,
        max_connections: 64,
        listen_for_signals: false,
    };

    let handle = HttpServer::new(settings, pipeline.apply(routes))
        .start("127.0.0.1:0")
        .await
        .expect("server should bind an ephemeral port");

    TestServer {
        handle,
        calls,
        audit,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
