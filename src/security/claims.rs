//! Unverified JWT structure decoding
//!
//! Tokens on the message topic were already verified at the edge before
//! publication, so this module checks token shape only. Signatures are never
//! evaluated and expiry is never enforced here: a message can sit on the
//! topic long enough for its token to expire before it is consumed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};

use crate::error::MalformedTokenError;

/// A structurally valid token, decoded without verification.
///
/// Carries every claim the token held (no claim is dropped) together with
/// the original compact form, which strict-mode verification can re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    claims: Map<String, Value>,
    raw: String,
}

impl DecodedToken {
    /// All claims, exactly as carried by the token.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// The compact token this was decoded from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn string_claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }
}

/// Decode the header and claims of a compact JWT without verifying it.
///
/// Structure checks only: three dot-separated segments, unpadded base64url
/// encoding, and JSON-object header and claims. The signature segment is not
/// inspected.
///
/// ## Errors
///
/// Returns [`MalformedTokenError`] when a structural rule is violated. An
/// expired token is not a structural violation and decodes normally.
pub fn decode_unverified(token: &str) -> Result<DecodedToken, MalformedTokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(MalformedTokenError::SegmentCount(segments.len()));
    }

    let header_bytes = URL_SAFE_NO_PAD.decode(segments[0])?;
    let header: Value = serde_json::from_slice(&header_bytes)?;
    if !header.is_object() {
        return Err(MalformedTokenError::HeaderNotObject);
    }

    let claims_bytes = URL_SAFE_NO_PAD.decode(segments[1])?;
    match serde_json::from_slice::<Value>(&claims_bytes)? {
        Value::Object(claims) => Ok(DecodedToken {
            claims,
            raw: token.to_string(),
        }),
        _ => Err(MalformedTokenError::ClaimsNotObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode_segment(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn make_token(claims: Value) -> String {
        let header = encode_segment(&json!({"alg": "RS256", "typ": "JWT"}));
        format!("{}.{}.sig", header, encode_segment(&claims))
    }

    #[test]
    fn decodes_every_claim_without_loss() {
        let token = make_token(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "scope": "read write",
            "roles": ["user", "admin"],
            "custom": {"nested": true},
        }));

        let decoded = decode_unverified(&token).unwrap();
        assert_eq!(decoded.claims().len(), 5);
        assert_eq!(decoded.string_claim("sub"), Some("alice"));
        assert_eq!(decoded.string_claim("iss"), Some("https://issuer.example"));
        assert_eq!(decoded.claim("custom"), Some(&json!({"nested": true})));
        assert_eq!(decoded.raw(), token);
    }

    #[test]
    fn accepts_expired_tokens() {
        // Expiry is a verification concern, not a structural one.
        let token = make_token(json!({"sub": "alice", "exp": 1_000_000}));
        assert!(decode_unverified(&token).is_ok());
    }

    #[test]
    fn accepts_empty_signature_segment() {
        let header = encode_segment(&json!({"alg": "none"}));
        let claims = encode_segment(&json!({"sub": "alice"}));
        let token = format!("{}.{}.", header, claims);

        assert!(decode_unverified(&token).is_ok());
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = decode_unverified("not-a-valid-token").unwrap_err();
        assert!(matches!(err, MalformedTokenError::SegmentCount(1)));

        let err = decode_unverified("only.two").unwrap_err();
        assert!(matches!(err, MalformedTokenError::SegmentCount(2)));

        let err = decode_unverified("a.b.c.d").unwrap_err();
        assert!(matches!(err, MalformedTokenError::SegmentCount(4)));
    }

    #[test]
    fn rejects_invalid_base64_segment() {
        let claims = encode_segment(&json!({"sub": "alice"}));
        let err = decode_unverified(&format!("!!!.{}.sig", claims)).unwrap_err();
        assert!(matches!(err, MalformedTokenError::InvalidBase64(_)));
    }

    #[test]
    fn rejects_non_json_claims() {
        let header = encode_segment(&json!({"alg": "RS256"}));
        let claims = URL_SAFE_NO_PAD.encode(b"not json at all");
        let err = decode_unverified(&format!("{}.{}.sig", header, claims)).unwrap_err();
        assert!(matches!(err, MalformedTokenError::InvalidJson(_)));
    }

    #[test]
    fn rejects_non_object_claims() {
        let header = encode_segment(&json!({"alg": "RS256"}));
        let claims = encode_segment(&json!(["an", "array"]));
        let err = decode_unverified(&format!("{}.{}.sig", header, claims)).unwrap_err();
        assert!(matches!(err, MalformedTokenError::ClaimsNotObject));
    }

    #[test]
    fn rejects_non_object_header() {
        let header = encode_segment(&json!("just-a-string"));
        let claims = encode_segment(&json!({"sub": "alice"}));
        let err = decode_unverified(&format!("{}.{}.sig", header, claims)).unwrap_err();
        assert!(matches!(err, MalformedTokenError::HeaderNotObject));
    }
}
