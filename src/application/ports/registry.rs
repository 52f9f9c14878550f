//! Session Registry Port - 本进程持有的语音会话注册表

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::gateway::VoiceSessionHandle;
use crate::application::speech::PlaybackController;
use crate::domain::{ChannelId, CommunityId};

/// 一个已建立的语音会话（进程本地，从不跨进程共享）
#[derive(Clone)]
pub struct ActiveSession {
    pub community_id: CommunityId,
    pub voice_channel_id: ChannelId,
    pub text_channel_id: Option<ChannelId>,
    /// 建立时记录的会话代次
    pub generation: u64,
    /// 就绪状态：传输建立成功后为 true
    pub ready: bool,
    pub handle: Arc<dyn VoiceSessionHandle>,
    pub controller: Arc<PlaybackController>,
    pub established_at: DateTime<Utc>,
    /// 最近一次播放活动时间（健康检查用）
    pub last_activity: DateTime<Utc>,
}

/// Session Registry Port
///
/// 每个社区同一时刻至多一个条目；插入会替换同社区的旧条目。
pub trait SessionRegistryPort: Send + Sync {
    /// 注册会话（替换同社区的旧会话）
    fn insert(&self, session: ActiveSession);

    /// 获取会话
    fn get(&self, community_id: CommunityId) -> Option<ActiveSession>;

    /// 移除会话
    fn remove(&self, community_id: CommunityId) -> Option<ActiveSession>;

    /// 社区是否有就绪的会话
    fn is_ready(&self, community_id: CommunityId) -> bool;

    /// 更新最近活动时间
    fn touch(&self, community_id: CommunityId);

    /// 当前持有会话的社区列表
    fn held_communities(&self) -> Vec<CommunityId>;

    /// 当前会话数
    fn count(&self) -> usize;
}
