//! Authentication gateway
//!
//! The handler never decides trust on its own; it hands every candidate to
//! an injected gateway. [`TrustPolicyGateway`] is the production gateway:
//! it applies the trust rules configured for pre-authenticated tokens and,
//! when a verification key is configured, re-checks the token signature.

use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::config::AuthSettings;
use crate::error::AuthenticationError;
use crate::security::principal::{AuthenticatedPrincipal, CandidatePrincipal, TokenDetails};

const ROLE_PREFIX: &str = "ROLE_";

/// Decides whether a candidate principal is trusted.
///
/// Implementations may consult external state and suspend. The handler
/// imposes no timeout; a slow gateway simply delays that message's unit of
/// work.
#[async_trait]
pub trait AuthenticationGateway: Send + Sync {
    async fn authenticate(
        &self,
        candidate: &CandidatePrincipal,
    ) -> Result<AuthenticatedPrincipal, AuthenticationError>;
}

/// Trust rules for pre-authenticated tokens.
///
/// With an empty configuration every structurally valid token that names a
/// subject is accepted, which matches the trust boundary of this topic: the
/// edge verified the token before publishing. The issuer allow-list, the
/// subject deny-list, and strict signature verification each narrow that.
pub struct TrustPolicyGateway {
    /// Issuers accepted in the `iss` claim. Empty means any issuer.
    trusted_issuers: HashSet<String>,
    /// Subjects rejected outright (disabled accounts).
    denied_subjects: HashSet<String>,
    verification: Option<(DecodingKey, Validation)>,
}

impl TrustPolicyGateway {
    pub fn new(trusted_issuers: Vec<String>, denied_subjects: Vec<String>) -> Self {
        Self {
            trusted_issuers: trusted_issuers.into_iter().collect(),
            denied_subjects: denied_subjects.into_iter().collect(),
            verification: None,
        }
    }

    /// Enable strict mode: the raw token's signature is re-checked against
    /// `key`. Expiry stays unenforced even then, since messages may outlive
    /// their tokens on the topic.
    pub fn with_signature_verification(mut self, key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        self.verification = Some((key, validation));
        self
    }

    /// Build the gateway from environment settings. Strict mode turns on
    /// when a verification key is configured: RS256 keys are PEM public
    /// keys, HS256 keys are shared secrets (development parity).
    pub fn from_settings(settings: &AuthSettings) -> anyhow::Result<Self> {
        let gateway = Self::new(
            settings.trusted_issuers.clone(),
            settings.denied_subjects.clone(),
        );

        match &settings.verification_key {
            None => Ok(gateway),
            Some(key_material) => {
                let (key, algorithm) = match settings.verification_algorithm.as_str() {
                    "RS256" => (
                        DecodingKey::from_rsa_pem(key_material.as_bytes())
                            .context("AUTH_VERIFICATION_KEY is not a valid RSA public key PEM")?,
                        Algorithm::RS256,
                    ),
                    "HS256" => (
                        DecodingKey::from_secret(key_material.as_bytes()),
                        Algorithm::HS256,
                    ),
                    other => anyhow::bail!(
                        "unsupported AUTH_VERIFICATION_ALGORITHM: {other} (expected RS256 or HS256)"
                    ),
                };
                Ok(gateway.with_signature_verification(key, algorithm))
            }
        }
    }
}

#[async_trait]
impl AuthenticationGateway for TrustPolicyGateway {
    async fn authenticate(
        &self,
        candidate: &CandidatePrincipal,
    ) -> Result<AuthenticatedPrincipal, AuthenticationError> {
        let details = candidate.details.as_ref().ok_or_else(|| {
            AuthenticationError::BadCredentials("candidate carries no token details".into())
        })?;

        let subject = details
            .subject()
            .filter(|subject| !subject.is_empty())
            .ok_or_else(|| {
                AuthenticationError::PrincipalNotFound("token names no subject".into())
            })?;

        if self.denied_subjects.contains(subject) {
            return Err(AuthenticationError::AccountDisabled(subject.to_string()));
        }

        if !self.trusted_issuers.is_empty() {
            match details.issuer() {
                Some(issuer) if self.trusted_issuers.contains(issuer) => {}
                Some(issuer) => {
                    return Err(AuthenticationError::Failure(format!(
                        "issuer {issuer} is not trusted"
                    )))
                }
                None => {
                    return Err(AuthenticationError::Failure(
                        "token names no issuer but an issuer allow-list is enforced".into(),
                    ))
                }
            }
        }

        if let Some((key, validation)) = &self.verification {
            jsonwebtoken::decode::<serde_json::Map<String, serde_json::Value>>(
                &candidate.token,
                key,
                validation,
            )
            .map_err(|e| {
                AuthenticationError::BadCredentials(format!("signature verification failed: {e}"))
            })?;
        }

        let authorities = grant_authorities(details);
        debug!(
            subject = %subject,
            authorities = authorities.len(),
            "Candidate accepted by trust policy"
        );

        Ok(AuthenticatedPrincipal {
            subject: subject.to_string(),
            authorities,
            details: details.clone(),
        })
    }
}

/// Authorities granted to an accepted candidate: `roles` entries normalized
/// to the `ROLE_` prefix, then raw `scope` entries.
fn grant_authorities(details: &TokenDetails) -> Vec<String> {
    let mut authorities: Vec<String> = details
        .roles()
        .into_iter()
        .map(|role| {
            if role.starts_with(ROLE_PREFIX) {
                role.to_string()
            } else {
                format!("{ROLE_PREFIX}{}", role.to_uppercase())
            }
        })
        .collect();
    authorities.extend(details.scopes().into_iter().map(String::from));
    authorities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::claims::decode_unverified;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    fn unsigned_token(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"alg": "RS256"})).unwrap());
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{}.{}.sig", header, payload)
    }

    fn signed_token(claims: &Value, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn candidate_for(token: &str) -> CandidatePrincipal {
        let mut candidate = CandidatePrincipal::from_token(token);
        candidate.attach_details(TokenDetails::new(decode_unverified(token).unwrap()));
        candidate
    }

    #[tokio::test]
    async fn accepts_subject_and_grants_role_and_scope_authorities() {
        let gateway = TrustPolicyGateway::new(vec![], vec![]);
        let token = unsigned_token(&json!({
            "sub": "alice",
            "roles": ["user", "ROLE_ADMIN"],
            "scope": "read write",
        }));

        let principal = gateway.authenticate(&candidate_for(&token)).await.unwrap();

        assert_eq!(principal.subject, "alice");
        assert_eq!(
            principal.authorities,
            vec!["ROLE_USER", "ROLE_ADMIN", "read", "write"]
        );
        assert_eq!(principal.details.subject(), Some("alice"));
    }

    #[tokio::test]
    async fn rejects_candidate_without_details() {
        let gateway = TrustPolicyGateway::new(vec![], vec![]);
        let candidate = CandidatePrincipal::from_token("a.b.c");

        let err = gateway.authenticate(&candidate).await.unwrap_err();
        assert!(matches!(err, AuthenticationError::BadCredentials(_)));
    }

    #[tokio::test]
    async fn rejects_token_without_subject() {
        let gateway = TrustPolicyGateway::new(vec![], vec![]);

        let missing = unsigned_token(&json!({"roles": ["user"]}));
        let err = gateway.authenticate(&candidate_for(&missing)).await.unwrap_err();
        assert!(matches!(err, AuthenticationError::PrincipalNotFound(_)));

        let empty = unsigned_token(&json!({"sub": ""}));
        let err = gateway.authenticate(&candidate_for(&empty)).await.unwrap_err();
        assert!(matches!(err, AuthenticationError::PrincipalNotFound(_)));
    }

    #[tokio::test]
    async fn rejects_denied_subject() {
        let gateway = TrustPolicyGateway::new(vec![], vec!["mallory".to_string()]);
        let token = unsigned_token(&json!({"sub": "mallory"}));

        let err = gateway.authenticate(&candidate_for(&token)).await.unwrap_err();
        assert!(matches!(err, AuthenticationError::AccountDisabled(_)));
    }

    #[tokio::test]
    async fn enforces_issuer_allow_list_when_configured() {
        let gateway = TrustPolicyGateway::new(vec!["https://sso.example".to_string()], vec![]);

        let trusted = unsigned_token(&json!({"sub": "alice", "iss": "https://sso.example"}));
        assert!(gateway.authenticate(&candidate_for(&trusted)).await.is_ok());

        let untrusted = unsigned_token(&json!({"sub": "alice", "iss": "https://evil.example"}));
        let err = gateway
            .authenticate(&candidate_for(&untrusted))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthenticationError::Failure(_)));

        let no_issuer = unsigned_token(&json!({"sub": "alice"}));
        let err = gateway
            .authenticate(&candidate_for(&no_issuer))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthenticationError::Failure(_)));
    }

    #[tokio::test]
    async fn any_issuer_passes_with_empty_allow_list() {
        let gateway = TrustPolicyGateway::new(vec![], vec![]);
        let token = unsigned_token(&json!({"sub": "alice", "iss": "https://anywhere.example"}));

        assert!(gateway.authenticate(&candidate_for(&token)).await.is_ok());
    }

    #[tokio::test]
    async fn strict_mode_accepts_properly_signed_token() {
        let secret = b"test-secret";
        let gateway = TrustPolicyGateway::new(vec![], vec![])
            .with_signature_verification(DecodingKey::from_secret(secret), Algorithm::HS256);

        let token = signed_token(&json!({"sub": "alice"}), secret);
        let principal = gateway.authenticate(&candidate_for(&token)).await.unwrap();
        assert_eq!(principal.subject, "alice");
    }

    #[tokio::test]
    async fn strict_mode_rejects_bad_signature() {
        let gateway = TrustPolicyGateway::new(vec![], vec![]).with_signature_verification(
            DecodingKey::from_secret(b"the-real-secret"),
            Algorithm::HS256,
        );

        let forged = signed_token(&json!({"sub": "alice"}), b"some-other-secret");
        let err = gateway.authenticate(&candidate_for(&forged)).await.unwrap_err();
        assert!(matches!(err, AuthenticationError::BadCredentials(_)));
    }

    #[tokio::test]
    async fn strict_mode_still_accepts_expired_tokens() {
        // Messages can outlive their tokens; strict mode re-checks the
        // signature but never the expiry.
        let secret = b"test-secret";
        let gateway = TrustPolicyGateway::new(vec![], vec![])
            .with_signature_verification(DecodingKey::from_secret(secret), Algorithm::HS256);

        let token = signed_token(&json!({"sub": "alice", "exp": 1_000_000}), secret);
        assert!(gateway.authenticate(&candidate_for(&token)).await.is_ok());
    }
}
