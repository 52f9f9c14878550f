//! Peer Client Port - 对等 worker 之间的出站调用
//!
//! 所有调用都带显式超时，任何进程都不会无限期阻塞在对等节点上。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::state_store::DesiredState;
use crate::domain::{ChannelId, CommunityId, WorkerDescriptor};

/// 对等节点调用错误
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Peer unreachable: {0}")]
    Unreachable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Peer returned error: {0}")]
    PeerError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// join 指示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinInstruction {
    pub community_id: CommunityId,
    pub voice_channel_id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_channel_id: Option<ChannelId>,
}

/// Peer Client Port
#[async_trait]
pub trait PeerClientPort: Send + Sync {
    /// 获取对等节点的描述符
    async fn fetch_info(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> Result<WorkerDescriptor, PeerError>;

    /// 指示对等节点建立会话
    async fn instruct_join(
        &self,
        base_url: &str,
        instruction: &JoinInstruction,
        timeout: Duration,
    ) -> Result<(), PeerError>;

    /// 指示对等节点拆除会话
    async fn instruct_leave(
        &self,
        base_url: &str,
        community_id: CommunityId,
        timeout: Duration,
    ) -> Result<(), PeerError>;

    /// 向对等节点推送完整状态文档（尽力而为）
    async fn push_state(
        &self,
        base_url: &str,
        state: &DesiredState,
        timeout: Duration,
    ) -> Result<(), PeerError>;

    /// 从对等节点拉取完整状态文档（尽力而为）
    async fn pull_state(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> Result<DesiredState, PeerError>;
}
