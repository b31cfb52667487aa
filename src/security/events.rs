//! Authentication event sink
//!
//! The handler reports every gateway verdict to an injected sink, exactly
//! once per attempt. Sinks must be quick and must not fail; anything heavier
//! than counters or logs belongs behind a channel, not in the sink.

use tracing::{info, warn};

use crate::error::AuthenticationError;
use crate::metrics;
use crate::security::principal::{AuthenticatedPrincipal, CandidatePrincipal};

pub trait AuthenticationEventSink: Send + Sync {
    fn on_success(&self, principal: &AuthenticatedPrincipal);
    fn on_failure(&self, error: &AuthenticationError, candidate: &CandidatePrincipal);
}

/// Default sink: structured logs only.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyEventSink;

impl AuthenticationEventSink for LogOnlyEventSink {
    fn on_success(&self, principal: &AuthenticatedPrincipal) {
        info!(subject = %principal.subject, "Authentication succeeded");
    }

    fn on_failure(&self, error: &AuthenticationError, candidate: &CandidatePrincipal) {
        warn!(
            subject = candidate.subject().unwrap_or("<unknown>"),
            error = %error,
            "Authentication failed"
        );
    }
}

/// Production sink: prometheus counters plus the same logs.
#[derive(Debug, Clone, Default)]
pub struct MetricsEventSink;

impl AuthenticationEventSink for MetricsEventSink {
    fn on_success(&self, principal: &AuthenticatedPrincipal) {
        metrics::record_auth_success();
        info!(subject = %principal.subject, "Authentication succeeded");
    }

    fn on_failure(&self, error: &AuthenticationError, candidate: &CandidatePrincipal) {
        metrics::record_auth_failure(error.reason());
        warn!(
            subject = candidate.subject().unwrap_or("<unknown>"),
            error = %error,
            "Authentication failed"
        );
    }
}
