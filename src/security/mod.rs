//! Security layer for the message-triggered authentication flow:
//! - Unverified token decoding (structure checks only)
//! - Principal types (candidate in, authenticated out)
//! - Task-owned security context with per-message reset
//! - Authentication gateway (trust policy, optional strict verification)
//! - Authentication event sink (logs, metrics)

pub mod claims;
pub mod context;
pub mod events;
pub mod gateway;
pub mod principal;

pub use claims::{decode_unverified, DecodedToken};
pub use context::{Authentication, SecurityContext};
pub use events::{AuthenticationEventSink, LogOnlyEventSink, MetricsEventSink};
pub use gateway::{AuthenticationGateway, TrustPolicyGateway};
pub use principal::{AuthenticatedPrincipal, CandidatePrincipal, TokenDetails};
