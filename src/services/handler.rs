//! Message authentication handler
//!
//! Runs the per-message unit of work: clear whatever identity the previous
//! message left behind, decode the attached token without verifying it,
//! hand the candidate to the gateway, install the granted principal, then
//! exercise the five protected operation probes. Nothing in here escalates:
//! malformed tokens, gateway rejections, and probe denials are all recorded
//! in the returned report and the message is still considered handled.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::security::{
    decode_unverified, AuthenticationEventSink, AuthenticationGateway, CandidatePrincipal,
    SecurityContext, TokenDetails,
};
use crate::services::protected::ProtectedOperations;

/// Payload literal marking deliberately unauthenticated traffic.
pub const UNAUTHORIZED_SENTINEL: &str = "unauthorized";

/// Wire envelope for the messaging topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub payload: Option<String>,
}

impl InboundMessage {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    pub fn empty() -> Self {
        Self { payload: None }
    }

    /// The token to authenticate with, unless the message is deliberately
    /// unauthenticated. Only the exact sentinel literal skips; any other
    /// payload, including an empty string, is treated as a token.
    fn token(&self) -> Option<&str> {
        match self.payload.as_deref() {
            None | Some(UNAUTHORIZED_SENTINEL) => None,
            Some(token) => Some(token),
        }
    }
}

/// How a message's authentication phase concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Deliberately unauthenticated; nothing was decoded or authenticated.
    Skipped,
    /// The gateway accepted the candidate and the context now holds it.
    Authenticated { subject: String },
    /// The token failed structural decoding; the gateway was never asked.
    Malformed { error: String },
    /// The gateway rejected the candidate; the context stays unset.
    Rejected { error: String },
}

impl AuthOutcome {
    /// Stable low-cardinality label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Authenticated { .. } => "authenticated",
            Self::Malformed { .. } => "malformed",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// One probe's result. Errors are carried as display strings; by the time
/// they reach the report they are observations, not control flow.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub operation: &'static str,
    pub result: Result<String, String>,
}

/// Everything that happened while handling one message.
///
/// [`MessageAuthenticationHandler::handle`] resolving to this report is the
/// unit-of-work completion signal; there is nothing further to wait on.
#[derive(Debug, Clone)]
pub struct MessageReport {
    pub outcome: AuthOutcome,
    pub probes: Vec<ProbeOutcome>,
}

impl MessageReport {
    pub fn denied_probes(&self) -> usize {
        self.probes.iter().filter(|p| p.result.is_err()).count()
    }
}

/// Per-message authentication orchestrator. Holds no per-message state of
/// its own; everything message-scoped lives in the caller's
/// [`SecurityContext`].
pub struct MessageAuthenticationHandler {
    gateway: Arc<dyn AuthenticationGateway>,
    event_sink: Arc<dyn AuthenticationEventSink>,
    operations: Arc<dyn ProtectedOperations>,
}

impl MessageAuthenticationHandler {
    pub fn new(
        gateway: Arc<dyn AuthenticationGateway>,
        event_sink: Arc<dyn AuthenticationEventSink>,
        operations: Arc<dyn ProtectedOperations>,
    ) -> Self {
        Self {
            gateway,
            event_sink,
            operations,
        }
    }

    /// Handle one message end to end.
    ///
    /// Skips authentication entirely (guard included) for deliberately
    /// unauthenticated messages; the probes run either way, each one
    /// fault-isolated from the others. Never fails: every local problem is
    /// captured in the report so the transport can acknowledge the message
    /// unconditionally.
    pub async fn handle(
        &self,
        ctx: &mut SecurityContext,
        message: InboundMessage,
    ) -> MessageReport {
        let outcome = match message.token() {
            None => {
                debug!("Deliberately unauthenticated message, skipping authentication");
                AuthOutcome::Skipped
            }
            Some(token) => self.authenticate(ctx, token).await,
        };

        let probes = self.run_protected_operations(ctx).await;

        MessageReport { outcome, probes }
    }

    async fn authenticate(&self, ctx: &mut SecurityContext, token: &str) -> AuthOutcome {
        // Stale identity goes first, before the token is even decoded.
        ctx.reset_for_message();

        let decoded = match decode_unverified(token) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, "Inbound token is structurally malformed");
                return AuthOutcome::Malformed {
                    error: err.to_string(),
                };
            }
        };

        let mut candidate = CandidatePrincipal::from_token(token);
        candidate.attach_details(TokenDetails::new(decoded));

        match self.gateway.authenticate(&candidate).await {
            Ok(principal) => {
                self.event_sink.on_success(&principal);
                let subject = principal.subject.clone();
                ctx.install(principal);
                info!(subject = %subject, "Principal installed for this unit of work");
                AuthOutcome::Authenticated { subject }
            }
            Err(err) => {
                self.event_sink.on_failure(&err, &candidate);
                AuthOutcome::Rejected {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn run_protected_operations(&self, ctx: &SecurityContext) -> Vec<ProbeOutcome> {
        let ops = self.operations.as_ref();
        vec![
            record_probe("check_open", ops.check_open(ctx).await),
            record_probe("check_user_role", ops.check_user_role(ctx).await),
            record_probe("check_admin_role", ops.check_admin_role(ctx).await),
            record_probe("check_path_pattern", ops.check_path_pattern(ctx).await),
            record_probe("check_token_details", ops.check_token_details(ctx).await),
        ]
    }
}

/// One probe call, fault-isolated: a denial is logged and recorded, never
/// propagated, so the probes after it always run.
fn record_probe(
    operation: &'static str,
    result: Result<String, crate::error::ProtectedOperationError>,
) -> ProbeOutcome {
    match result {
        Ok(message) => {
            info!(operation, message = %message, "Protected operation succeeded");
            ProbeOutcome {
                operation,
                result: Ok(message),
            }
        }
        Err(err) => {
            warn!(operation, error = %err, "Protected operation denied");
            ProbeOutcome {
                operation,
                result: Err(err.to_string()),
            }
        }
    }
}
