//! Cross-origin allow-list and per-request decisions.
//!
//! The allow-list is fixed when the policy is built and shared read-only
//! between all request paths afterwards. A policy that allows every origin
//! can never be constructed.

use std::sync::Arc;

use thiserror::Error;

/// The token browsers and CORS libraries use for "any origin".
pub const WILDCARD_ORIGIN: &str = "*";

/// Methods advertised on allowed cross-origin responses.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Request headers advertised on allowed cross-origin responses.
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Error raised when an allow-list cannot become a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("allowing all origins (\"*\") is not supported")]
    Wildcard,
}

/// Outcome of evaluating a request origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The origin is allowed; carries the value to echo back verbatim.
    Allow(String),
    /// The origin is not on the allow-list.
    Reject,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Ordered, case-insensitive set of allowed origins.
#[derive(Debug, Clone)]
pub struct OriginAllowList {
    origins: Arc<[String]>,
}

impl OriginAllowList {
    fn new(origins: Vec<String>) -> Result<Self, PolicyError> {
        if origins.iter().any(|o| o.trim() == WILDCARD_ORIGIN) {
            return Err(PolicyError::Wildcard);
        }
        Ok(Self {
            origins: origins.into(),
        })
    }

    /// Iterate the configured origins in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    fn contains(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o.eq_ignore_ascii_case(origin))
    }
}

/// Cross-origin policy built from a validated allow-list.
///
/// Cloning is cheap; every clone shares the same list.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allow_list: OriginAllowList,
}

impl OriginPolicy {
    /// Build a policy, refusing an allow-list that contains the wildcard.
    pub fn new<I, S>(origins: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allow_list = OriginAllowList::new(origins.into_iter().map(Into::into).collect())?;
        tracing::debug!(origins = allow_list.len(), "Origin policy built");
        Ok(Self { allow_list })
    }

    /// Decide whether a request carrying `origin` may proceed.
    pub fn evaluate(&self, origin: &str) -> Decision {
        if !origin.is_empty() && self.allow_list.contains(origin) {
            Decision::Allow(origin.to_string())
        } else {
            Decision::Reject
        }
    }

    pub fn allow_list(&self) -> &OriginAllowList {
        &self.allow_list
    }
}
