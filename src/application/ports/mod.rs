//! Application Ports
//!
//! 端口定义 - 外部协作方与进程内注册表的抽象接口，具体实现在 infrastructure 层

mod gateway;
mod peer_client;
mod registry;
mod state_store;
mod synthesis;

pub use gateway::{GatewayError, VoiceGatewayPort, VoiceSessionHandle};
pub use peer_client::{JoinInstruction, PeerClientPort, PeerError};
pub use registry::{ActiveSession, SessionRegistryPort};
pub use state_store::{DesiredBinding, DesiredState, StateStoreError, StateStorePort};
pub use synthesis::{SynthesisEnginePort, SynthesisError, SynthesisPlan};
