//! Protected operation probes
//!
//! Five downstream operations with different protection rules, invoked after
//! each message's authentication attempt to exercise the installed identity.
//! The handler knows only the signatures; the rules live here.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProtectedOperationError;
use crate::security::{AuthenticatedPrincipal, SecurityContext};

pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[async_trait]
pub trait ProtectedOperations: Send + Sync {
    /// Unprotected; succeeds for any caller.
    async fn check_open(&self, ctx: &SecurityContext) -> Result<String, ProtectedOperationError>;

    /// Requires the user role.
    async fn check_user_role(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError>;

    /// Requires the admin role.
    async fn check_admin_role(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError>;

    /// Governed by the service's resource-pattern rule.
    async fn check_path_pattern(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError>;

    /// Legacy authorization scheme: inspects the raw token details carried
    /// by the principal instead of its granted authorities.
    async fn check_token_details(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError>;
}

/// Reference probes used in production wiring.
///
/// The pattern rule protects every resource under `secured_prefix`; the
/// path-pattern probe always asks about `probe_resource`.
pub struct SecurityCheckService {
    secured_prefix: String,
    probe_resource: String,
}

impl Default for SecurityCheckService {
    fn default() -> Self {
        Self {
            secured_prefix: "secured/".to_string(),
            probe_resource: "secured/status".to_string(),
        }
    }
}

impl SecurityCheckService {
    pub fn new(secured_prefix: impl Into<String>, probe_resource: impl Into<String>) -> Self {
        Self {
            secured_prefix: secured_prefix.into(),
            probe_resource: probe_resource.into(),
        }
    }

    fn require_principal<'a>(
        &self,
        ctx: &'a SecurityContext,
    ) -> Result<&'a AuthenticatedPrincipal, ProtectedOperationError> {
        ctx.principal().ok_or_else(|| {
            ProtectedOperationError::AccessDenied("no authenticated principal".into())
        })
    }

    fn require_authority<'a>(
        &self,
        ctx: &'a SecurityContext,
        authority: &str,
    ) -> Result<&'a AuthenticatedPrincipal, ProtectedOperationError> {
        let principal = self.require_principal(ctx)?;
        if principal.has_authority(authority) {
            Ok(principal)
        } else {
            Err(ProtectedOperationError::AccessDenied(format!(
                "{} lacks {}",
                principal.subject, authority
            )))
        }
    }
}

#[async_trait]
impl ProtectedOperations for SecurityCheckService {
    async fn check_open(&self, ctx: &SecurityContext) -> Result<String, ProtectedOperationError> {
        let caller = ctx
            .principal()
            .map(|p| p.subject.as_str())
            .unwrap_or("anonymous");
        Ok(format!("not a protected resource, called by {caller}"))
    }

    async fn check_user_role(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError> {
        let principal = self.require_authority(ctx, ROLE_USER)?;
        Ok(format!("user role confirmed for {}", principal.subject))
    }

    async fn check_admin_role(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError> {
        let principal = self.require_authority(ctx, ROLE_ADMIN)?;
        Ok(format!("admin role confirmed for {}", principal.subject))
    }

    async fn check_path_pattern(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError> {
        if !self.probe_resource.starts_with(&self.secured_prefix) {
            debug!(resource = %self.probe_resource, "Resource is outside the secured pattern");
            return Ok(format!("{} is not under a secured path", self.probe_resource));
        }

        let principal = self.require_principal(ctx)?;
        Ok(format!(
            "{} granted access to {}",
            principal.subject, self.probe_resource
        ))
    }

    async fn check_token_details(
        &self,
        ctx: &SecurityContext,
    ) -> Result<String, ProtectedOperationError> {
        let principal = self.require_principal(ctx)?;
        match principal.details.subject() {
            Some(subject) => Ok(format!("token details carry subject {subject}")),
            None => Err(ProtectedOperationError::AccessDenied(
                "token details name no subject".into(),
            )),
        }
    }
}
