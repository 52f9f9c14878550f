//! Voice Gateway Port - 实时语音传输边界
//!
//! 网关连接/断开与音频帧传输协议本身不在本核心范围内，
//! 这里只定义建立/拆除会话与单会话播放控制的边界。

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{ChannelId, CommunityId};

/// 网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("No session for community: {0}")]
    NoSession(CommunityId),

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),
}

/// 单个语音会话的传输句柄
///
/// 重连会在底层静默替换会话，替换后 generation 改变；
/// 播放前必须重新校验 generation 是否仍与构造时一致。
#[async_trait]
pub trait VoiceSessionHandle: Send + Sync {
    /// 会话代次，重连替换后递增
    fn generation(&self) -> u64;

    /// 是否正在播放
    fn is_playing(&self) -> bool;

    /// 将音频输出设备订阅到会话传输
    async fn attach_output(&self) -> Result<(), GatewayError>;

    /// 播放一个音频产物，在空闲事件或错误事件时返回
    async fn play_to_end(&self, artifact: &Path) -> Result<(), GatewayError>;

    /// 强制停止当前播放
    async fn stop(&self);
}

/// Voice Gateway Port
///
/// 建立/拆除语音会话的边界
#[async_trait]
pub trait VoiceGatewayPort: Send + Sync {
    /// 目标语音频道是否仍然存在（重建前校验）
    async fn channel_exists(&self, community_id: CommunityId, channel_id: ChannelId) -> bool;

    /// 建立会话，返回传输句柄
    async fn join(
        &self,
        community_id: CommunityId,
        voice_channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSessionHandle>, GatewayError>;

    /// 拆除会话
    async fn leave(&self, community_id: CommunityId) -> Result<(), GatewayError>;
}
