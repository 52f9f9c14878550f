//! Desired Sessions - 期望状态的内存视图与变更落盘
//!
//! 状态文件是期望绑定的唯一持久来源，所有写入都走原子写。
//! 落盘失败只记录日志：内存状态对运行中的进程保持权威，
//! 但不会在重启后幸存。

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::ports::{DesiredBinding, DesiredState, StateStorePort};
use crate::domain::{ChannelId, CommunityId};

/// 期望会话状态服务
pub struct DesiredSessions {
    store: Arc<dyn StateStorePort>,
    current: Mutex<DesiredState>,
}

impl DesiredSessions {
    pub fn new(store: Arc<dyn StateStorePort>) -> Self {
        Self {
            store,
            current: Mutex::new(DesiredState::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 从状态文件加载初始内容
    pub async fn load(&self) -> DesiredState {
        match self.store.load().await {
            Ok(state) => {
                let mut current = self.current.lock().await;
                *current = state.clone();
                tracing::info!(entries = state.len(), "Desired session state loaded");
                state
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load desired session state, starting empty");
                DesiredState::new()
            }
        }
    }

    /// 当前状态快照
    pub async fn snapshot(&self) -> DesiredState {
        self.current.lock().await.clone()
    }

    /// 记录一个社区的期望绑定并落盘
    ///
    /// 只有带显式文字频道绑定的建立才会持久化。
    /// 锁跨越落盘持有：并发变更的写盘严格按变更顺序串行，
    /// 旧快照不可能覆盖新快照。
    pub async fn bind(
        &self,
        community_id: CommunityId,
        channel_id: ChannelId,
        text_channel_id: Option<ChannelId>,
    ) {
        let mut current = self.current.lock().await;
        current.insert(
            community_id,
            DesiredBinding {
                channel_id,
                text_channel_id,
            },
        );
        self.persist(&current).await;
    }

    /// 删除一个社区的期望绑定并落盘
    pub async fn unbind(&self, community_id: CommunityId) {
        let mut current = self.current.lock().await;
        current.remove(&community_id);
        self.persist(&current).await;
    }

    /// 用对等节点推送的文档整体替换并落盘
    pub async fn replace(&self, state: DesiredState) {
        let mut current = self.current.lock().await;
        *current = state;
        self.persist(&current).await;
    }

    async fn persist(&self, state: &DesiredState) {
        if let Err(e) = self.store.save(state).await {
            // 内存状态保持权威，但不会在重启后幸存
            tracing::error!(error = %e, "Failed to persist desired session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::StateStoreError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录 save 次数的内存状态存储
    struct MemoryStore {
        saves: AtomicUsize,
        fail_save: bool,
        state: std::sync::Mutex<DesiredState>,
    }

    impl MemoryStore {
        fn new(fail_save: bool) -> Self {
            Self {
                saves: AtomicUsize::new(0),
                fail_save,
                state: std::sync::Mutex::new(DesiredState::new()),
            }
        }
    }

    #[async_trait]
    impl StateStorePort for MemoryStore {
        async fn load(&self) -> Result<DesiredState, StateStoreError> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn save(&self, state: &DesiredState) -> Result<(), StateStoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                return Err(StateStoreError::IoError("disk full".to_string()));
            }
            *self.state.lock().unwrap() = state.clone();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_bind_and_unbind_persist_each_change() {
        let store = Arc::new(MemoryStore::new(false));
        let desired = DesiredSessions::new(store.clone());

        desired.bind(1, 100, Some(200)).await;
        desired.bind(2, 300, None).await;
        desired.unbind(1).await;

        assert_eq!(store.saves.load(Ordering::SeqCst), 3);
        let persisted = store.state.lock().unwrap().clone();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted.get(&2).unwrap().channel_id, 300);
    }

    #[tokio::test]
    async fn test_memory_stays_authoritative_on_persist_failure() {
        let store = Arc::new(MemoryStore::new(true));
        let desired = DesiredSessions::new(store);

        desired.bind(1, 100, Some(200)).await;

        let snapshot = desired.snapshot().await;
        assert_eq!(snapshot.get(&1).unwrap().channel_id, 100);
    }

    #[tokio::test]
    async fn test_concurrent_binds_never_persist_stale_document() {
        /// save 耗时与条目数反相关：先到的写入更慢，
        /// 不串行化时旧文档会最后落盘
        struct SlowFirstStore {
            persisted: tokio::sync::Mutex<Vec<DesiredState>>,
        }

        #[async_trait]
        impl StateStorePort for SlowFirstStore {
            async fn load(&self) -> Result<DesiredState, StateStoreError> {
                Ok(DesiredState::new())
            }

            async fn save(&self, state: &DesiredState) -> Result<(), StateStoreError> {
                let delay = if state.len() <= 1 { 50 } else { 5 };
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                self.persisted.lock().await.push(state.clone());
                Ok(())
            }
        }

        let store = Arc::new(SlowFirstStore {
            persisted: tokio::sync::Mutex::new(Vec::new()),
        });
        let desired = DesiredSessions::new(store.clone()).arc();

        let first = {
            let desired = desired.clone();
            tokio::spawn(async move { desired.bind(1, 100, Some(200)).await })
        };
        let second = {
            let desired = desired.clone();
            tokio::spawn(async move { desired.bind(2, 300, Some(301)).await })
        };
        first.await.unwrap();
        second.await.unwrap();

        let persisted = store.persisted.lock().await;
        assert_eq!(persisted.len(), 2);
        // 最后落盘的文档必须等于最终内存状态
        assert_eq!(persisted.last().unwrap(), &desired.snapshot().await);
        assert_eq!(persisted.last().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_document() {
        let store = Arc::new(MemoryStore::new(false));
        let desired = DesiredSessions::new(store);
        desired.bind(1, 100, Some(200)).await;

        let mut pushed = DesiredState::new();
        pushed.insert(
            5,
            DesiredBinding {
                channel_id: 500,
                text_channel_id: Some(501),
            },
        );
        desired.replace(pushed).await;

        let snapshot = desired.snapshot().await;
        assert!(!snapshot.contains_key(&1));
        assert!(snapshot.contains_key(&5));
    }
}
