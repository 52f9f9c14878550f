//! Gateway Adapters

mod fake_gateway;

pub use fake_gateway::FakeVoiceGateway;
