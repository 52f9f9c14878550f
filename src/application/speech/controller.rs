//! Playback Controller - 单会话播放控制
//!
//! 每个语音会话一个实例，串行化该会话的所有播放：
//! - 上一段未结束时有界等待，超过上限强制停止
//! - 播放前重新校验会话代次（重连会静默替换会话）
//! - 单段播放带硬超时
//! - 每条退出路径都删除临时产物并记录最近活动时间
//!
//! 播放期间的错误只记录日志并视为完成，不重试。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::application::ports::{GatewayError, SessionRegistryPort, VoiceSessionHandle};
use crate::config::PlaybackConfig;
use crate::domain::CommunityId;

/// 播放控制参数
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    /// 等待上一段播放结束的上限
    pub busy_wait: Duration,
    /// 单段播放的硬超时
    pub play_timeout: Duration,
    /// 空闲轮询间隔
    pub poll_interval: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            busy_wait: Duration::from_secs(10),
            play_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl From<&PlaybackConfig> for PlaybackSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            busy_wait: Duration::from_secs(config.busy_wait_secs),
            play_timeout: Duration::from_secs(config.play_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

#[derive(Debug, Error)]
enum PlaybackError {
    /// 会话代次与构造时不一致：会话已被重连替换，放弃播放
    #[error("session replaced (expected generation {expected}, found {found})")]
    StaleSession { expected: u64, found: u64 },

    #[error("playback timed out")]
    Timeout,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// 播放控制器
pub struct PlaybackController {
    community_id: CommunityId,
    handle: Arc<dyn VoiceSessionHandle>,
    /// 构造时记录的会话代次
    generation: u64,
    registry: Arc<dyn SessionRegistryPort>,
    settings: PlaybackSettings,
}

impl PlaybackController {
    pub fn new(
        community_id: CommunityId,
        handle: Arc<dyn VoiceSessionHandle>,
        registry: Arc<dyn SessionRegistryPort>,
        settings: PlaybackSettings,
    ) -> Self {
        let generation = handle.generation();
        Self {
            community_id,
            handle,
            generation,
            registry,
            settings,
        }
    }

    /// 播放一个音频产物
    ///
    /// 对调用方不可失败：错误记录日志后视为完成。无论结果如何，
    /// 返回前都会删除产物文件并更新注册表的最近活动时间。
    pub async fn play(&self, artifact: PathBuf) {
        match self.play_inner(&artifact).await {
            Ok(()) => {
                tracing::debug!(
                    community_id = self.community_id,
                    artifact = %artifact.display(),
                    "Playback finished"
                );
            }
            Err(e) => {
                tracing::warn!(
                    community_id = self.community_id,
                    artifact = %artifact.display(),
                    error = %e,
                    "Playback aborted"
                );
            }
        }

        self.cleanup(&artifact).await;
        self.registry.touch(self.community_id);
    }

    async fn play_inner(&self, artifact: &Path) -> Result<(), PlaybackError> {
        // 有界等待上一段播放结束
        let waited_since = tokio::time::Instant::now();
        while self.handle.is_playing() {
            if waited_since.elapsed() >= self.settings.busy_wait {
                tracing::warn!(
                    community_id = self.community_id,
                    "Previous playback still busy after wait cap, force stopping"
                );
                self.handle.stop().await;
                break;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        // 会话可能已被重连替换，代次不一致时放弃播放
        let found = self.handle.generation();
        if found != self.generation {
            return Err(PlaybackError::StaleSession {
                expected: self.generation,
                found,
            });
        }

        self.handle.attach_output().await?;

        match tokio::time::timeout(self.settings.play_timeout, self.handle.play_to_end(artifact))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                self.handle.stop().await;
                Err(PlaybackError::Timeout)
            }
        }
    }

    /// 删除临时产物文件
    async fn cleanup(&self, artifact: &Path) {
        if let Err(e) = tokio::fs::remove_file(artifact).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    artifact = %artifact.display(),
                    error = %e,
                    "Failed to remove playback artifact"
                );
            }
        }
    }
}
