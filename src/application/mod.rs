//! Application Layer
//!
//! 应用层 - 端口定义与核心服务
//!
//! - ports: 外部协作方与注册表的抽象接口
//! - speech: 每社区播放队列与合成-播放流水线
//! - cluster: 跨进程会话所有权编排与启动重建

pub mod cluster;
pub mod ports;
pub mod speech;

pub use cluster::{
    DesiredSessions, DiscoveryService, JoinOutcome, LeaveOutcome, Orchestrator,
    OrchestratorConfig, ReconcileReport, Reconciler, WorkerIdentity,
};
pub use ports::{
    ActiveSession, DesiredBinding, DesiredState, GatewayError, JoinInstruction, PeerClientPort,
    PeerError, SessionRegistryPort, StateStoreError, StateStorePort, SynthesisEnginePort,
    SynthesisError, SynthesisPlan, VoiceGatewayPort, VoiceSessionHandle,
};
pub use speech::{
    cache_key, PlaybackController, PlaybackQueues, PlaybackSettings, QueueSettings, QueueStatus,
    SpeechResolver, SynthesisCache, SynthesisCacheConfig,
};
