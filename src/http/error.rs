//! Errors handlers report to the request auditor.
//!
//! A handler attaches a [`HandlerError`] to its response (either by returning
//! it directly or via `Extension`) and the audit stage picks it up from the
//! response extensions. The error text is logged, never sent to the client
//! for internal failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::observability::audit::Severity;

/// What kind of failure a handler observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The client sent something unacceptable (validation, bad input).
    Client,
    /// Something failed on our side.
    Internal,
}

/// A failure recorded by a handler for the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    kind: ErrorKind,
    message: String,
}

impl HandlerError {
    pub fn client(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Client,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Log level the audit record is written at when this error is attached.
    pub fn severity(&self) -> Severity {
        match self.kind {
            ErrorKind::Client => Severity::Warn,
            ErrorKind::Internal => Severity::Error,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Client => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let body = match self.kind {
            ErrorKind::Client => self.message.clone(),
            ErrorKind::Internal => "Internal Server Error".to_string(),
        };
        let mut response = (self.status(), body).into_response();
        response.extensions_mut().insert(self);
        response
    }
}
