//! Message-triggered authentication context management.
//!
//! A long-lived Kafka consumer receives messages whose payload is a
//! pre-authenticated token. Each message gets request-equivalent
//! authentication semantics: any identity left by the previous message is
//! evicted, the token is decoded and handed to an authentication gateway,
//! the granted principal is installed into a task-owned security context,
//! and a fixed set of protected operations runs under that identity with
//! each call fault-isolated from the others.

pub mod config;
pub mod error;
pub mod metrics;
pub mod security;
pub mod services;

pub use config::Settings;
pub use error::{
    AuthenticationError, MalformedTokenError, ProtectedOperationError, Result, ServiceError,
};
