//! Speech Pipeline
//!
//! 每社区播放队列与合成-缓存-播放流水线：
//! - cache: 进程本地的合成结果缓存（TTL + 定时清扫）
//! - resolver: 文本 -> 音频产物（先查缓存，未命中走合成服务）
//! - controller: 单会话播放控制（串行、硬超时、产物清理）
//! - queue: 每社区优先级队列与唯一的顺序排空循环

mod cache;
mod controller;
mod queue;
mod resolver;

pub use cache::{cache_key, SynthesisCache, SynthesisCacheConfig};
pub use controller::{PlaybackController, PlaybackSettings};
pub use queue::{PlaybackQueues, QueueSettings, QueueStatus};
pub use resolver::SpeechResolver;
