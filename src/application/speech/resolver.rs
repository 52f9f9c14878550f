//! Speech Resolver - 文本到音频产物
//!
//! resolve_audio 先查缓存：未过期条目直接落盘返回（无网络调用），
//! 未命中则走合成服务的两步调用（plan -> render），成功后写入缓存。
//! 任何失败都向调用方传播，不产生部分缓存条目。

use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::cache::{cache_key, SynthesisCache};
use crate::application::ports::{SynthesisEnginePort, SynthesisError};

/// 语音解析器
pub struct SpeechResolver {
    engine: Arc<dyn SynthesisEnginePort>,
    cache: Arc<SynthesisCache>,
    artifact_dir: PathBuf,
}

impl SpeechResolver {
    pub fn new(
        engine: Arc<dyn SynthesisEnginePort>,
        cache: Arc<SynthesisCache>,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            cache,
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 解析文本为音频产物，返回新建临时文件的路径
    ///
    /// 调用方负责预先截断文本。返回的产物是一次性的，
    /// 播放完成后由播放控制器删除；缓存持有的是字节而非文件。
    pub async fn resolve_audio(&self, text: &str, voice: &str) -> Result<PathBuf, SynthesisError> {
        let key = cache_key(text, voice);

        if let Some(audio) = self.cache.get(&key) {
            tracing::debug!(voice = %voice, text_len = text.len(), "Synthesis cache hit");
            return self.write_artifact(&audio).await;
        }

        let plan = self.engine.plan(text, voice).await?;
        let audio = self.engine.render(&plan, voice).await?;

        tracing::info!(
            voice = %voice,
            text_len = text.len(),
            audio_size = audio.len(),
            "Synthesis completed"
        );

        let artifact = self.write_artifact(&audio).await?;
        self.cache.insert(key, audio);
        Ok(artifact)
    }

    /// 把音频字节写入新建的临时产物文件
    async fn write_artifact(&self, audio: &[u8]) -> Result<PathBuf, SynthesisError> {
        tokio::fs::create_dir_all(&self.artifact_dir)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;

        let path = self.artifact_dir.join(format!("{}.wav", Uuid::new_v4()));
        tokio::fs::write(&path, audio)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SynthesisPlan;
    use crate::application::speech::cache::SynthesisCacheConfig;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 统计调用次数的假合成引擎
    struct CountingEngine {
        plan_calls: AtomicUsize,
    }

    impl CountingEngine {
        fn new() -> Self {
            Self {
                plan_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SynthesisEnginePort for CountingEngine {
        async fn plan(&self, text: &str, _voice: &str) -> Result<SynthesisPlan, SynthesisError> {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SynthesisPlan {
                text: text.to_string(),
                payload: serde_json::json!({ "text": text }),
            })
        }

        async fn render(
            &self,
            plan: &SynthesisPlan,
            _voice: &str,
        ) -> Result<Vec<u8>, SynthesisError> {
            Ok(plan.text.as_bytes().to_vec())
        }
    }

    /// 始终失败的假合成引擎
    struct FailingEngine;

    #[async_trait]
    impl SynthesisEnginePort for FailingEngine {
        async fn plan(&self, _text: &str, _voice: &str) -> Result<SynthesisPlan, SynthesisError> {
            Err(SynthesisError::ServiceError("boom".to_string()))
        }

        async fn render(
            &self,
            _plan: &SynthesisPlan,
            _voice: &str,
        ) -> Result<Vec<u8>, SynthesisError> {
            unreachable!("render should not be called when plan fails")
        }
    }

    fn resolver_with(
        engine: Arc<dyn SynthesisEnginePort>,
        ttl: Duration,
        dir: &Path,
    ) -> SpeechResolver {
        let cache = SynthesisCache::new(SynthesisCacheConfig {
            ttl,
            sweep_interval: Duration::from_secs(60),
        })
        .arc();
        SpeechResolver::new(engine, cache, dir)
    }

    #[tokio::test]
    async fn test_second_resolve_within_ttl_skips_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CountingEngine::new());
        let resolver = resolver_with(engine.clone(), Duration::from_secs(600), dir.path());

        let first = resolver.resolve_audio("hi", "voice1").await.unwrap();
        let second = resolver.resolve_audio("hi", "voice1").await.unwrap();

        assert_eq!(engine.plan_calls.load(Ordering::SeqCst), 1);
        // 每次调用都产出新的临时产物
        assert_ne!(first, second);
        assert!(second.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_after_ttl_invokes_engine_again() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CountingEngine::new());
        let resolver = resolver_with(engine.clone(), Duration::from_millis(100), dir.path());

        let first = resolver.resolve_audio("hi", "voice1").await.unwrap();
        tokio::time::advance(Duration::from_millis(101)).await;
        let second = resolver.resolve_audio("hi", "voice1").await.unwrap();

        assert_eq!(engine.plan_calls.load(Ordering::SeqCst), 2);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_failure_leaves_no_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SynthesisCache::new(SynthesisCacheConfig::default()).arc();
        let resolver = SpeechResolver::new(Arc::new(FailingEngine), cache.clone(), dir.path());

        let result = resolver.resolve_audio("hi", "voice1").await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
