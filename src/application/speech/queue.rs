//! Session Playback Queue - 每社区播放队列
//!
//! 每个社区一个队列，按优先级（HIGH > NORMAL > LOW）排序，
//! 同优先级内按到达顺序稳定排序。每个社区同一时刻只有一个排空循环：
//! enqueue 在循环未运行时启动它，队列排空后循环自然退出。
//!
//! 至多一次交付：单条播报在合成或播放失败时直接丢弃并记录日志，
//! 绝不重试、不重新入队，任何单条失败都不会中止循环。

use dashmap::DashMap;
use serde::Serialize;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::resolver::SpeechResolver;
use crate::application::ports::SessionRegistryPort;
use crate::domain::{CommunityId, Priority, Utterance};

/// 队列行为参数
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// 文本最大长度（字符数），入队文本在计算缓存 key 之前截断
    pub max_text_len: usize,
    /// 未指定音色时使用的默认音色
    pub default_voice: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_text_len: 200,
            default_voice: "default".to_string(),
        }
    }
}

/// 队列状态快照
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStatus {
    pub length: usize,
    pub is_processing: bool,
}

/// 堆内排序包装：优先级降序，同优先级按入队序号升序
struct QueuedUtterance(Utterance);

impl PartialEq for QueuedUtterance {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}

impl Eq for QueuedUtterance {}

impl PartialOrd for QueuedUtterance {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedUtterance {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap 是最大堆：优先级高的在前，同优先级 seq 小的在前
        self.0
            .priority
            .cmp(&other.0.priority)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

/// 单个社区的队列状态
struct CommunityQueue {
    heap: BinaryHeap<QueuedUtterance>,
    processing: bool,
}

impl CommunityQueue {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            processing: false,
        }
    }
}

/// 每社区播放队列的键控存储
///
/// 进程内唯一的协调组件：队列、处理标志都集中于此，
/// 以引用传入使用方，不使用模块级全局状态。
pub struct PlaybackQueues {
    queues: DashMap<CommunityId, Arc<Mutex<CommunityQueue>>>,
    seq: AtomicU64,
    resolver: Arc<SpeechResolver>,
    registry: Arc<dyn SessionRegistryPort>,
    settings: QueueSettings,
}

impl PlaybackQueues {
    pub fn new(
        resolver: Arc<SpeechResolver>,
        registry: Arc<dyn SessionRegistryPort>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            queues: DashMap::new(),
            seq: AtomicU64::new(0),
            resolver,
            registry,
            settings,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn community_queue(&self, community_id: CommunityId) -> Arc<Mutex<CommunityQueue>> {
        self.queues
            .entry(community_id)
            .or_insert_with(|| Arc::new(Mutex::new(CommunityQueue::new())))
            .clone()
    }

    /// 入队一条播报，必要时启动该社区的排空循环
    ///
    /// 同步完成插入与处理标志翻转，返回入队后的状态快照。
    pub fn enqueue(
        &self,
        community_id: CommunityId,
        text: String,
        voice: Option<String>,
        priority: Priority,
        provenance: Option<String>,
    ) -> QueueStatus {
        let utterance = Utterance {
            community_id,
            text,
            voice: voice.unwrap_or_else(|| self.settings.default_voice.clone()),
            priority,
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            enqueued_at: chrono::Utc::now(),
            provenance,
        };

        let queue = self.community_queue(community_id);
        let (status, start_loop) = {
            let mut q = queue.lock().expect("queue mutex poisoned");
            q.heap.push(QueuedUtterance(utterance));
            let start_loop = !q.processing;
            if start_loop {
                q.processing = true;
            }
            (
                QueueStatus {
                    length: q.heap.len(),
                    is_processing: true,
                },
                start_loop,
            )
        };

        if start_loop {
            self.spawn_drain(community_id, queue);
        }

        status
    }

    /// 查询队列状态
    pub fn status(&self, community_id: CommunityId) -> QueueStatus {
        match self.queues.get(&community_id) {
            Some(queue) => {
                let q = queue.lock().expect("queue mutex poisoned");
                QueueStatus {
                    length: q.heap.len(),
                    is_processing: q.processing,
                }
            }
            None => QueueStatus {
                length: 0,
                is_processing: false,
            },
        }
    }

    /// 清空队列中的待播条目，返回移除数量
    ///
    /// 不影响正在播放的条目，也不停止排空循环。
    pub fn clear(&self, community_id: CommunityId) -> usize {
        match self.queues.get(&community_id) {
            Some(queue) => {
                let mut q = queue.lock().expect("queue mutex poisoned");
                let removed = q.heap.len();
                q.heap.clear();
                removed
            }
            None => 0,
        }
    }

    /// 启动排空循环：每个社区同一时刻至多一个
    fn spawn_drain(&self, community_id: CommunityId, queue: Arc<Mutex<CommunityQueue>>) {
        let resolver = Arc::clone(&self.resolver);
        let registry = Arc::clone(&self.registry);
        let settings = self.settings.clone();

        tokio::spawn(async move {
            loop {
                let item = {
                    let mut q = queue.lock().expect("queue mutex poisoned");
                    match q.heap.pop() {
                        Some(QueuedUtterance(utterance)) => utterance,
                        None => {
                            // 在持有锁时观察到空队列才清理标志，
                            // 保证 enqueue 不会在循环退出的间隙漏启动
                            q.processing = false;
                            break;
                        }
                    }
                };

                process_item(&resolver, &registry, &settings, item).await;
            }

            tracing::debug!(community_id = community_id, "Queue drained");
        });
    }
}

/// 处理单条播报：任何失败记录日志后丢弃，循环继续
async fn process_item(
    resolver: &SpeechResolver,
    registry: &Arc<dyn SessionRegistryPort>,
    settings: &QueueSettings,
    item: Utterance,
) {
    // 会话未就绪时丢弃，不发起任何网络调用
    let session = match registry.get(item.community_id) {
        Some(session) if session.ready => session,
        _ => {
            tracing::warn!(
                community_id = item.community_id,
                priority = item.priority.as_str(),
                "No ready session, dropping utterance"
            );
            return;
        }
    };

    let text = truncate_chars(&item.text, settings.max_text_len);
    let artifact = match resolver.resolve_audio(text, &item.voice).await {
        Ok(artifact) => artifact,
        Err(e) => {
            tracing::warn!(
                community_id = item.community_id,
                voice = %item.voice,
                error = %e,
                "Synthesis failed, dropping utterance"
            );
            return;
        }
    };

    session.controller.play(artifact).await;
}

/// 按字符截断文本（字符边界安全）
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ActiveSession, GatewayError, SynthesisEnginePort, SynthesisError, SynthesisPlan,
        VoiceSessionHandle,
    };
    use crate::application::speech::{
        PlaybackController, PlaybackSettings, SynthesisCache, SynthesisCacheConfig,
    };
    use crate::infrastructure::memory::InMemorySessionRegistry;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;

    /// 记录合成顺序的假引擎
    struct RecordingEngine {
        texts: Mutex<Vec<String>>,
    }

    impl RecordingEngine {
        fn new() -> Self {
            Self {
                texts: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SynthesisEnginePort for RecordingEngine {
        async fn plan(&self, text: &str, _voice: &str) -> Result<SynthesisPlan, SynthesisError> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(SynthesisPlan {
                text: text.to_string(),
                payload: serde_json::Value::Null,
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

    struct NoopHandle;

    #[async_trait]
    impl VoiceSessionHandle for NoopHandle {
        fn generation(&self) -> u64 {
            1
        }

        fn is_playing(&self) -> bool {
            false
        }

        async fn attach_output(&self) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn play_to_end(&self, _artifact: &Path) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn stop(&self) {}
    }

    struct Fixture {
        queues: Arc<PlaybackQueues>,
        engine: Arc<RecordingEngine>,
        _dir: tempfile::TempDir,
    }

    /// 组装带就绪会话的队列组件
    fn fixture(community_id: CommunityId, with_session: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(RecordingEngine::new());
        let cache = SynthesisCache::new(SynthesisCacheConfig::default()).arc();
        let resolver = SpeechResolver::new(engine.clone(), cache, dir.path()).arc();
        let registry = Arc::new(InMemorySessionRegistry::new());

        if with_session {
            let handle = Arc::new(NoopHandle);
            let controller = Arc::new(PlaybackController::new(
                community_id,
                handle.clone(),
                registry.clone(),
                PlaybackSettings {
                    busy_wait: Duration::from_millis(50),
                    play_timeout: Duration::from_millis(200),
                    poll_interval: Duration::from_millis(5),
                },
            ));
            registry.insert(ActiveSession {
                community_id,
                voice_channel_id: 100,
                text_channel_id: Some(200),
                generation: 1,
                ready: true,
                handle,
                controller,
                established_at: chrono::Utc::now(),
                last_activity: chrono::Utc::now(),
            });
        }

        let queues = PlaybackQueues::new(
            resolver,
            registry,
            QueueSettings {
                max_text_len: 200,
                default_voice: "v".to_string(),
            },
        )
        .arc();

        Fixture {
            queues,
            engine,
            _dir: dir,
        }
    }

    async fn wait_until_idle(queues: &Arc<PlaybackQueues>, community_id: CommunityId) {
        for _ in 0..200 {
            let status = queues.status(community_id);
            if status.length == 0 && !status.is_processing {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queue did not drain in time");
    }

    #[tokio::test]
    async fn test_high_priority_plays_before_earlier_normal() {
        let f = fixture(1, true);

        // 当前线程运行时：两次入队之间没有让出点，排空循环在之后才运行
        f.queues
            .enqueue(1, "hello".to_string(), None, Priority::Normal, None);
        f.queues
            .enqueue(1, "urgent".to_string(), None, Priority::High, None);

        wait_until_idle(&f.queues, 1).await;
        assert_eq!(f.engine.recorded(), vec!["urgent", "hello"]);
    }

    #[tokio::test]
    async fn test_equal_priority_preserves_arrival_order() {
        let f = fixture(1, true);

        for text in ["a", "b", "c"] {
            f.queues
                .enqueue(1, text.to_string(), None, Priority::Normal, None);
        }
        f.queues
            .enqueue(1, "low".to_string(), None, Priority::Low, None);
        f.queues
            .enqueue(1, "first".to_string(), None, Priority::High, None);
        f.queues
            .enqueue(1, "second".to_string(), None, Priority::High, None);

        wait_until_idle(&f.queues, 1).await;
        assert_eq!(
            f.engine.recorded(),
            vec!["first", "second", "a", "b", "c", "low"]
        );
    }

    #[tokio::test]
    async fn test_enqueue_flips_processing_until_drained() {
        let f = fixture(1, true);

        assert!(!f.queues.status(1).is_processing);
        let status = f
            .queues
            .enqueue(1, "hello".to_string(), None, Priority::Normal, None);
        assert!(status.is_processing);

        wait_until_idle(&f.queues, 1).await;
        let status = f.queues.status(1);
        assert_eq!(status.length, 0);
        assert!(!status.is_processing);
    }

    #[tokio::test]
    async fn test_clear_returns_exact_removed_count() {
        let f = fixture(1, true);

        for text in ["a", "b", "c"] {
            f.queues
                .enqueue(1, text.to_string(), None, Priority::Normal, None);
        }
        // 排空循环尚未获得运行机会，三条都还在队列里
        let removed = f.queues.clear(1);
        assert_eq!(removed, 3);
        assert_eq!(f.queues.status(1).length, 0);

        wait_until_idle(&f.queues, 1).await;
        assert!(f.engine.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_items_dropped_without_ready_session() {
        let f = fixture(1, false);

        f.queues
            .enqueue(1, "hello".to_string(), None, Priority::Normal, None);
        wait_until_idle(&f.queues, 1).await;

        // 无就绪会话：不发起任何合成调用
        assert!(f.engine.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_does_not_abort_loop() {
        struct FlakyEngine {
            calls: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl SynthesisEnginePort for FlakyEngine {
            async fn plan(
                &self,
                text: &str,
                _voice: &str,
            ) -> Result<SynthesisPlan, SynthesisError> {
                self.calls.lock().unwrap().push(text.to_string());
                if text == "bad" {
                    return Err(SynthesisError::ServiceError("boom".to_string()));
                }
                Ok(SynthesisPlan {
                    text: text.to_string(),
                    payload: serde_json::Value::Null,
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

        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FlakyEngine {
            calls: Mutex::new(Vec::new()),
        });
        let cache = SynthesisCache::new(SynthesisCacheConfig::default()).arc();
        let resolver = SpeechResolver::new(engine.clone(), cache, dir.path()).arc();

        let registry = Arc::new(InMemorySessionRegistry::new());
        let handle = Arc::new(NoopHandle);
        let controller = Arc::new(PlaybackController::new(
            1,
            handle.clone(),
            registry.clone(),
            PlaybackSettings::default(),
        ));
        registry.insert(ActiveSession {
            community_id: 1,
            voice_channel_id: 100,
            text_channel_id: None,
            generation: 1,
            ready: true,
            handle,
            controller,
            established_at: chrono::Utc::now(),
            last_activity: chrono::Utc::now(),
        });

        let queues = PlaybackQueues::new(resolver, registry, QueueSettings::default()).arc();
        queues.enqueue(1, "bad".to_string(), None, Priority::Normal, None);
        queues.enqueue(1, "good".to_string(), None, Priority::Normal, None);

        wait_until_idle(&queues, 1).await;
        let calls = engine.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["bad", "good"]);
    }

    #[test]
    fn test_truncate_is_char_boundary_safe() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("你好世界", 2), "你好");
    }
}
