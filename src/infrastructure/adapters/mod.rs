//! Infrastructure Adapters

pub mod gateway;
pub mod peers;
pub mod synthesis;

pub use gateway::FakeVoiceGateway;
pub use peers::HttpPeerClient;
pub use synthesis::{HttpSynthesisClient, HttpSynthesisClientConfig};
