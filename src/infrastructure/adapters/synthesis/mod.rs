//! Synthesis Adapters

mod http_client;

pub use http_client::{HttpSynthesisClient, HttpSynthesisClientConfig};
