//! Panic boundary.
//!
//! A panic inside a handler becomes a 500 response with a [`HandlerError`]
//! attached, so the audit stage records it at error level. The origin stage
//! above still adds its headers. The connection and the serving loop are
//! unaffected.

use std::any::Any;

use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::http::error::HandlerError;

pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Layer converting panics into audited 500 responses.
pub fn layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    HandlerError::internal(format!("handler panicked: {detail}")).into_response()
}
