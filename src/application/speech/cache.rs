//! Synthesis Cache - 进程本地的合成结果缓存
//!
//! 以 (音色, 规范化文本) 为 key 缓存合成产物的字节流。
//! 条目带固定 TTL，过期条目绝不返回；后台清扫任务按固定间隔移除过期条目。
//! 缓存不跨 worker 共享：两个 worker 播报相同文本会各自合成一次。

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// 生成缓存 key
///
/// 使用 md5(text) + voice 作为缓存 key。调用方负责在计算 key
/// 之前把文本截断到配置的最大长度。
pub fn cache_key(text: &str, voice: &str) -> String {
    let digest = md5::compute(text.as_bytes());
    format!("{:x}:{}", digest, voice)
}

/// 缓存配置
#[derive(Debug, Clone)]
pub struct SynthesisCacheConfig {
    /// 条目 TTL
    pub ttl: Duration,
    /// 清扫间隔
    pub sweep_interval: Duration,
}

impl Default for SynthesisCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// 缓存条目
///
/// 条目持有音频字节而不是文件路径：播放产物是一次性的，
/// 由播放控制器在每条退出路径上删除。
struct CacheEntry {
    audio: Vec<u8>,
    created_at: Instant,
}

/// 合成结果缓存
pub struct SynthesisCache {
    entries: DashMap<String, CacheEntry>,
    config: SynthesisCacheConfig,
    sweeper_started: AtomicBool,
}

impl SynthesisCache {
    pub fn new(config: SynthesisCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            sweeper_started: AtomicBool::new(false),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 获取未过期条目的音频字节
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entry = self.entries.get(key)?;
        if entry.created_at.elapsed() >= self.config.ttl {
            return None;
        }
        Some(entry.audio.clone())
    }

    /// 插入条目（覆盖同 key 的旧条目）
    pub fn insert(&self, key: String, audio: Vec<u8>) {
        self.entries.insert(
            key,
            CacheEntry {
                audio,
                created_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 移除所有过期条目，返回移除数量
    ///
    /// 清扫期间其他任务可能并发插入，移除数只能在 retain 闭包内统计，
    /// 不能用前后长度差推算。
    pub fn sweep(&self) -> usize {
        let ttl = self.config.ttl;
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.created_at.elapsed() < ttl;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// 启动后台清扫任务
    ///
    /// 每个进程生命周期只启动一次：重复调用是空操作，不会泄漏第二个定时器。
    pub fn start_sweeper(self: Arc<Self>) {
        if self.sweeper_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let cache = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cache.config.sweep_interval);
            // 第一个 tick 立即完成，跳过
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = cache.sweep();
                if removed > 0 {
                    tracing::debug!(
                        removed = removed,
                        remaining = cache.entries.len(),
                        "Cache sweep completed"
                    );
                }
            }
        });
    }
}
