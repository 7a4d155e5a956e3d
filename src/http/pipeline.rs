//! Middleware composition.
//!
//! Every request goes through the same fixed stages:
//!
//! 1. audit: observes the final response, whatever produced it
//! 2. authorize: origin policy, with its 403 and preflight short-circuits
//! 3. recover: panics become 500 responses with an attached error
//! 4. dispatch: the caller's routes
//!
//! Recovery sits inside the origin stage so a recovered 500 still carries
//! the CORS headers of an allowed origin.
//!
//! Axum applies the last `.layer` call outermost, so [`Pipeline::apply`]
//! adds the stages innermost first.

use axum::{middleware, Router};

use crate::config::ServerConfig;
use crate::http::middleware::{audit, cors, recovery};
use crate::observability::audit::RequestAuditor;
use crate::security::origin_policy::{OriginPolicy, PolicyError};

/// The stages wrapped around every route.
#[derive(Debug, Clone)]
pub struct Pipeline {
    policy: OriginPolicy,
    auditor: RequestAuditor,
}

impl Pipeline {
    pub fn new(policy: OriginPolicy, auditor: RequestAuditor) -> Self {
        Self { policy, auditor }
    }

    /// Build the pipeline from configuration, auditing through `tracing`.
    ///
    /// Fails if the configured allow-list contains the wildcard origin.
    pub fn from_config(config: &ServerConfig) -> Result<Self, PolicyError> {
        let policy = OriginPolicy::new(config.cors.allowed_origins.iter().cloned())?;
        let auditor = RequestAuditor::with_tracing()
            .trust_forwarded_headers(config.observability.trust_forwarded_headers);
        Ok(Self::new(policy, auditor))
    }

    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Wrap `routes` (including their fallback) in the pipeline.
    pub fn apply(&self, routes: Router) -> Router {
        routes
            .layer(recovery::layer())
            .layer(middleware::from_fn_with_state(
                self.policy.clone(),
                cors::origin_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.auditor.clone(),
                audit::audit_middleware,
            ))
    }
}
