//! Origin enforcement middleware.
//! Rejects cross-origin callers that are not on the allow-list.

use axum::{
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::observability::metrics;
use crate::security::origin_policy::{Decision, OriginPolicy, ALLOWED_HEADERS, ALLOWED_METHODS};

pub async fn origin_middleware(
    State(policy): State<OriginPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    // 1. Unknown or missing origin: stop before the handler sees anything.
    let echoed = match policy.evaluate(&origin) {
        Decision::Allow(echoed) => HeaderValue::from_str(&echoed).ok(),
        Decision::Reject => None,
    };
    let Some(echoed) = echoed else {
        warn!(origin = %origin, "Given origin is not allowed");
        metrics::record_origin_rejected();
        return StatusCode::FORBIDDEN.into_response();
    };
    debug!(origin = %origin, "CORS allowed origin");

    // 2. Preflight is answered here, never forwarded.
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    apply_cors_headers(response.headers_mut(), echoed);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));
}
