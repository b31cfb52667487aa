//! Task-owned security context
//!
//! One context value belongs to one consumer task and is threaded by
//! reference into the message handler and every protected operation. There
//! is no thread-local or global holder, so identity cannot bleed across
//! tasks; within a task, [`SecurityContext::reset_for_message`] evicts
//! whatever the previous message left behind.

use tracing::debug;

use crate::security::principal::AuthenticatedPrincipal;

/// What the context slot currently holds.
#[derive(Debug, Clone)]
pub enum Authentication {
    /// A placeholder identity. Counts as unauthenticated for authorization
    /// purposes and is never evicted by the per-message reset.
    Anonymous,
    Principal(AuthenticatedPrincipal),
}

/// Single-slot ambient identity for one consumer task.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    authentication: Option<Authentication>,
}

impl SecurityContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True only when a real (non-anonymous) principal is installed.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.authentication, Some(Authentication::Principal(_)))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.authentication, Some(Authentication::Anonymous))
    }

    pub fn principal(&self) -> Option<&AuthenticatedPrincipal> {
        match &self.authentication {
            Some(Authentication::Principal(principal)) => Some(principal),
            _ => None,
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.principal()
            .map(|p| p.has_authority(authority))
            .unwrap_or(false)
    }

    pub fn install(&mut self, principal: AuthenticatedPrincipal) {
        self.authentication = Some(Authentication::Principal(principal));
    }

    pub fn install_anonymous(&mut self) {
        self.authentication = Some(Authentication::Anonymous);
    }

    pub fn clear(&mut self) {
        self.authentication = None;
    }

    /// Evict any identity a previous message left in the slot.
    ///
    /// Runs before authentication on every token-bearing message,
    /// regardless of how the rest of that message turns out. Clears only a
    /// real principal; an empty or anonymous slot is left as it is, and the
    /// call never fails.
    pub fn reset_for_message(&mut self) {
        if let Some(Authentication::Principal(stale)) = &self.authentication {
            debug!(subject = %stale.subject, "Evicting stale principal before authentication");
            self.authentication = None;
        }
    }
}
