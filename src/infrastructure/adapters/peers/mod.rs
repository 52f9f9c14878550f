//! Peer Adapters

mod http_peer_client;

pub use http_peer_client::HttpPeerClient;
