use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Structural failures while decoding the token carried by a message.
///
/// Shape violations only. Signature and expiry problems are deliberately not
/// represented: tokens arrive pre-verified, and may legitimately be expired
/// by the time the message is consumed.
#[derive(Debug, Error)]
pub enum MalformedTokenError {
    #[error("expected 3 dot-separated token segments, found {0}")]
    SegmentCount(usize),

    #[error("token segment is not valid base64url: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("token segment is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("token header is not a JSON object")]
    HeaderNotObject,

    #[error("token claims are not a JSON object")]
    ClaimsNotObject,
}

/// Rejections produced by an [`AuthenticationGateway`](crate::security::AuthenticationGateway).
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("Bad credentials: {0}")]
    BadCredentials(String),

    #[error("Principal not found: {0}")]
    PrincipalNotFound(String),

    #[error("Account disabled: {0}")]
    AccountDisabled(String),

    #[error("Authentication failure: {0}")]
    Failure(String),
}

impl AuthenticationError {
    /// Stable low-cardinality label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadCredentials(_) => "bad_credentials",
            Self::PrincipalNotFound(_) => "principal_not_found",
            Self::AccountDisabled(_) => "account_disabled",
            Self::Failure(_) => "failure",
        }
    }
}

/// Denials and faults raised by protected operations.
#[derive(Debug, Error)]
pub enum ProtectedOperationError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Malformed message envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
