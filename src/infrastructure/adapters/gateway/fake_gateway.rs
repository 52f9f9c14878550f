//! Fake Voice Gateway - 进程内模拟网关（测试与本地联调用）
//!
//! 真实的网关接入协议不在本核心范围内。该适配器模拟其边界行为：
//! join 返回会话句柄，rejoin 会替换句柄并递增代次；
//! 播放按产物大小模拟耗时，stop 可以提前打断。

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::application::ports::{GatewayError, VoiceGatewayPort, VoiceSessionHandle};
use crate::domain::{ChannelId, CommunityId};

/// 模拟的会话句柄
struct FakeSessionHandle {
    generation: u64,
    playing: AtomicBool,
    stop_notify: Notify,
}

impl FakeSessionHandle {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            playing: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }
}

#[async_trait]
impl VoiceSessionHandle for FakeSessionHandle {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    async fn attach_output(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn play_to_end(&self, artifact: &Path) -> Result<(), GatewayError> {
        let metadata = tokio::fs::metadata(artifact)
            .await
            .map_err(|e| GatewayError::PlaybackError(format!("artifact unreadable: {}", e)))?;

        // 按产物大小模拟播放耗时
        let duration = Duration::from_millis(10 + metadata.len() / 1024);

        self.playing.store(true, Ordering::SeqCst);
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stop_notify.notified() => {}
        }
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
    }
}

/// 进程内模拟网关
pub struct FakeVoiceGateway {
    sessions: DashMap<CommunityId, Arc<FakeSessionHandle>>,
    /// 每个社区的累计代次，rejoin 递增
    generations: DashMap<CommunityId, u64>,
    /// 被标记为不存在的频道（模拟频道被删除）
    missing_channels: DashSet<ChannelId>,
}

impl FakeVoiceGateway {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            generations: DashMap::new(),
            missing_channels: DashSet::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 把频道标记为已删除
    pub fn mark_channel_missing(&self, channel_id: ChannelId) {
        self.missing_channels.insert(channel_id);
    }
}

impl Default for FakeVoiceGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceGatewayPort for FakeVoiceGateway {
    async fn channel_exists(&self, _community_id: CommunityId, channel_id: ChannelId) -> bool {
        !self.missing_channels.contains(&channel_id)
    }

    async fn join(
        &self,
        community_id: CommunityId,
        voice_channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSessionHandle>, GatewayError> {
        if self.missing_channels.contains(&voice_channel_id) {
            return Err(GatewayError::ChannelNotFound(voice_channel_id));
        }

        let generation = {
            let mut entry = self.generations.entry(community_id).or_insert(0);
            *entry += 1;
            *entry
        };

        let handle = Arc::new(FakeSessionHandle::new(generation));
        self.sessions.insert(community_id, handle.clone());

        tracing::info!(
            community_id = community_id,
            voice_channel_id = voice_channel_id,
            generation = generation,
            "Fake gateway session established"
        );
        Ok(handle)
    }

    async fn leave(&self, community_id: CommunityId) -> Result<(), GatewayError> {
        match self.sessions.remove(&community_id) {
            Some((_, handle)) => {
                handle.stop().await;
                tracing::info!(community_id = community_id, "Fake gateway session closed");
                Ok(())
            }
            None => Err(GatewayError::NoSession(community_id)),
        }
    }
}
