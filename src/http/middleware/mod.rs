//! Request pipeline stages, outermost first.
//!
//! ```text
//! audit.rs     deferred observer, one record per request
//!   cors.rs      origin allow-list, 403 / 204 short-circuits
//!     recovery.rs  panic → 500 + HandlerError
//!       router       caller's routes
//! ```

pub mod audit;
pub mod cors;
pub mod recovery;
