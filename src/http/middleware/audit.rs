//! Audit middleware.
//!
//! Outermost stage: captures request details, lets every inner stage run,
//! then records the final status exactly once. A request whose future is
//! dropped midway is still recorded, as aborted.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::USER_AGENT, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::http::error::HandlerError;
use crate::observability::audit::{RequestAuditor, RequestInfo};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

pub async fn audit_middleware(
    State(auditor): State<RequestAuditor>,
    request: Request,
    next: Next,
) -> Response {
    let info = RequestInfo {
        started: Instant::now(),
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        user_agent: header_str(request.headers(), USER_AGENT.as_str())
            .unwrap_or_default()
            .to_string(),
        client_address: client_address(&request, auditor.trusts_forwarded_headers()),
    };

    // Emits on drop if this future is cancelled before `next` finishes.
    let pending = auditor.begin(info);
    let response = next.run(request).await;

    pending.complete(
        response.status(),
        response.extensions().get::<HandlerError>(),
    );
    response
}

fn client_address(request: &Request, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers {
        let forwarded = header_str(request.headers(), X_FORWARDED_FOR)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded.or_else(|| {
            header_str(request.headers(), X_REAL_IP)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        }) {
            return addr.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
