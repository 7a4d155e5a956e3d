//! HTTP server core: lifecycle, origin policy and request auditing.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::ServerConfig;
pub use http::{HandlerError, HttpServer, Pipeline, ServerError, ServerHandle, ServerSettings};
pub use lifecycle::{ServerState, Shutdown};
pub use observability::mask;
pub use security::OriginPolicy;
