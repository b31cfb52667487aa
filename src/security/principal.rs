//! Principal types for the pre-authenticated token flow
//!
//! A message's token becomes a [`CandidatePrincipal`] (identity asserted,
//! nothing granted yet), and a gateway turns that into an
//! [`AuthenticatedPrincipal`] (subject resolved, authorities granted).

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::security::claims::DecodedToken;

/// Decoded token material attached to a principal.
///
/// Downstream authorization consults this for claims the authority list does
/// not capture, so it exposes the full claim set alongside typed accessors
/// for the common ones.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDetails {
    token: DecodedToken,
}

impl TokenDetails {
    pub fn new(token: DecodedToken) -> Self {
        Self { token }
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.token.string_claim("sub")
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<&str> {
        self.token.string_claim("iss")
    }

    /// Entries of the space-separated `scope` claim.
    pub fn scopes(&self) -> Vec<&str> {
        self.token
            .string_claim("scope")
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// String entries of the `roles` claim.
    pub fn roles(&self) -> Vec<&str> {
        self.token
            .claim("roles")
            .and_then(Value::as_array)
            .map(|roles| roles.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// The `exp` claim as a UTC timestamp. Informational only; expired
    /// tokens are still honored on this topic.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token
            .claim("exp")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.token.claim(name)
    }

    pub fn raw_token(&self) -> &str {
        self.token.raw()
    }
}

/// An identity assertion awaiting a gateway decision.
///
/// Construction never fails and never judges the token; whether the
/// candidate is trustworthy is entirely the gateway's call.
#[derive(Debug, Clone)]
pub struct CandidatePrincipal {
    /// The raw compact token, standing in as the identity assertion.
    pub token: String,
    /// Pre-authenticated marker. Empty by construction: the edge already
    /// checked the real credentials before the message was published.
    credentials: String,
    /// Decoded token details, attached after a successful decode.
    pub details: Option<TokenDetails>,
}

impl CandidatePrincipal {
    pub fn from_token(token: &str) -> Self {
        Self {
            token: token.to_string(),
            credentials: String::new(),
            details: None,
        }
    }

    /// Attach decoded details. The only mutation a candidate supports.
    pub fn attach_details(&mut self, details: TokenDetails) {
        self.details = Some(details);
    }

    /// Always empty for a pre-authenticated candidate.
    pub fn credentials(&self) -> &str {
        &self.credentials
    }

    /// Subject claim from the attached details, when present.
    pub fn subject(&self) -> Option<&str> {
        self.details.as_ref().and_then(TokenDetails::subject)
    }
}

/// The principal a gateway granted, installed into the security context for
/// the remainder of the unit of work.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub subject: String,
    /// Granted authority strings (`ROLE_*` entries and raw scopes).
    pub authorities: Vec<String>,
    pub details: TokenDetails,
}

impl AuthenticatedPrincipal {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}
