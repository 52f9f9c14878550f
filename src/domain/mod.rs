//! Domain Layer
//!
//! 领域层 - 纯值类型与状态机，不依赖任何基础设施
//!
//! - speech: 语音播报上下文（Utterance, Priority）
//! - ownership: 社区会话所有权状态机
//! - worker: Worker 描述符与对等节点探测结果

pub mod ownership;
pub mod speech;
pub mod worker;

pub use ownership::OwnershipState;
pub use speech::{Priority, Utterance};
pub use worker::{PeerStatus, WorkerDescriptor};

/// 社区 ID（外部平台分配的数字 ID）
pub type CommunityId = u64;

/// 频道 ID
pub type ChannelId = u64;
