//! State Store Port - 期望会话状态的持久化

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{ChannelId, CommunityId};

/// 状态存储错误
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 一个社区的期望绑定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredBinding {
    /// 语音频道 ID
    pub channel_id: ChannelId,

    /// 配套文字频道 ID
    ///
    /// 缺失的条目不参与自动重建（目标不明确时跳过而不是猜测）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_channel_id: Option<ChannelId>,
}

/// 期望会话状态：社区 ID -> 期望绑定，即状态文件的完整内容
pub type DesiredState = BTreeMap<CommunityId, DesiredBinding>;

/// State Store Port
///
/// save 必须是原子的：先写临时文件再 rename 覆盖，
/// 任何读者都不会观察到写了一半的文件。
#[async_trait]
pub trait StateStorePort: Send + Sync {
    /// 读取状态文件，文件不存在视为空状态
    async fn load(&self) -> Result<DesiredState, StateStoreError>;

    /// 原子写入状态文件
    async fn save(&self, state: &DesiredState) -> Result<(), StateStoreError>;
}
