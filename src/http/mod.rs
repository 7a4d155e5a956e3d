//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1 connection, lifecycle)
//!     → pipeline.rs (audit → origin policy → recover)
//!     → caller's router (handlers)
//!     → error.rs (HandlerError attached for the audit record)
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod server;

pub use error::{ErrorKind, HandlerError};
pub use pipeline::Pipeline;
pub use server::{HttpServer, ServerError, ServerHandle, ServerSettings};
