//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → origin_policy.rs (allow-list lookup on the Origin header)
//!     → Allow: CORS headers added, request continues (preflight answered directly)
//!     → Reject: 403 before any handler runs
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing or unknown Origin is rejected
//! - The wildcard origin is refused at construction, never at request time

pub mod origin_policy;

pub use origin_policy::{Decision, OriginAllowList, OriginPolicy, PolicyError};
