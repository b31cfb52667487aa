//! Message handling services: the per-message authentication handler, the
//! protected operation probes it exercises, and the Kafka consumer loop
//! that drives both.

pub mod consumer;
pub mod handler;
pub mod protected;

pub use consumer::{MessageConsumer, MessageConsumerConfig};
pub use handler::{
    AuthOutcome, InboundMessage, MessageAuthenticationHandler, MessageReport, ProbeOutcome,
};
pub use protected::{ProtectedOperations, SecurityCheckService};
