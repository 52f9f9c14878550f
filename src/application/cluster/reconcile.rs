//! Startup Reconciliation - 按持久化期望状态重建会话
//!
//! 逐条处理持久化的社区条目：
//! - 本进程不再是成员的社区跳过但不删除（其他进程可能仍持有）
//! - 缺少配套文字频道的条目跳过（目标不明确时绝不猜测）
//! - 目标语音频道不存在的条目跳过
//! - 其余条目委托编排器选择并下发指示，两次指示之间插入固定间隔，
//!   避免同时发起大量连接
//!
//! 单条失败只记录日志，绝不中止整个批次。

use std::sync::Arc;
use std::time::Duration;

use super::orchestrator::{JoinOutcome, Orchestrator};
use crate::application::ports::{DesiredState, VoiceGatewayPort};
use crate::domain::CommunityId;

/// 重建结果汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub instructed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 启动重建器
pub struct Reconciler {
    /// 本进程所属的社区列表
    membership: Vec<CommunityId>,
    gateway: Arc<dyn VoiceGatewayPort>,
    orchestrator: Arc<Orchestrator>,
    /// 两次指示之间的间隔
    delay: Duration,
}

impl Reconciler {
    pub fn new(
        membership: Vec<CommunityId>,
        gateway: Arc<dyn VoiceGatewayPort>,
        orchestrator: Arc<Orchestrator>,
        delay: Duration,
    ) -> Self {
        Self {
            membership,
            gateway,
            orchestrator,
            delay,
        }
    }

    /// 启动时重建所有持久化条目
    pub async fn reconcile_on_startup(&self, state: &DesiredState) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        tracing::info!(entries = state.len(), "Starting session reconciliation");

        for (&community_id, binding) in state {
            if !self.membership.contains(&community_id) {
                tracing::debug!(
                    community_id = community_id,
                    "Not a member of community, skipping entry"
                );
                report.skipped += 1;
                continue;
            }

            let text_channel_id = match binding.text_channel_id {
                Some(id) => id,
                None => {
                    tracing::warn!(
                        community_id = community_id,
                        "Entry has no text channel binding, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            if !self
                .gateway
                .channel_exists(community_id, binding.channel_id)
                .await
            {
                tracing::warn!(
                    community_id = community_id,
                    channel_id = binding.channel_id,
                    "Voice channel no longer exists, skipping"
                );
                report.skipped += 1;
                continue;
            }

            match self
                .orchestrator
                .select_and_instruct(community_id, binding.channel_id, Some(text_channel_id))
                .await
            {
                JoinOutcome::Instructed { worker } => {
                    tracing::info!(
                        community_id = community_id,
                        worker = %worker,
                        "Reconciled session"
                    );
                    report.instructed += 1;
                }
                JoinOutcome::Skipped => {
                    report.skipped += 1;
                }
                JoinOutcome::Failed { worker, reason } => {
                    tracing::warn!(
                        community_id = community_id,
                        worker = %worker,
                        reason = %reason,
                        "Reconciliation instruction failed"
                    );
                    report.failed += 1;
                }
            }

            // 指示之间插入间隔，避免连接风暴
            tokio::time::sleep(self.delay).await;
        }

        tracing::info!(
            instructed = report.instructed,
            skipped = report.skipped,
            failed = report.failed,
            "Session reconciliation finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cluster::discovery::{DiscoveryService, WorkerIdentity};
    use crate::application::cluster::orchestrator::OrchestratorConfig;
    use crate::application::ports::{DesiredBinding, GatewayError, VoiceSessionHandle};
    use crate::application::ports::{JoinInstruction, PeerClientPort, PeerError};
    use crate::domain::{ChannelId, WorkerDescriptor};
    use crate::infrastructure::memory::InMemorySessionRegistry;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Mutex;

    struct RecordingPeerClient {
        descriptors: HashMap<String, WorkerDescriptor>,
        joins: Mutex<Vec<JoinInstruction>>,
    }

    #[async_trait]
    impl PeerClientPort for RecordingPeerClient {
        async fn fetch_info(
            &self,
            base_url: &str,
            _timeout: Duration,
        ) -> Result<WorkerDescriptor, PeerError> {
            self.descriptors
                .get(base_url)
                .cloned()
                .ok_or_else(|| PeerError::Unreachable(base_url.to_string()))
        }

        async fn instruct_join(
            &self,
            _base_url: &str,
            instruction: &JoinInstruction,
            _timeout: Duration,
        ) -> Result<(), PeerError> {
            self.joins.lock().unwrap().push(instruction.clone());
            Ok(())
        }

        async fn instruct_leave(
            &self,
            _base_url: &str,
            _community_id: CommunityId,
            _timeout: Duration,
        ) -> Result<(), PeerError> {
            Ok(())
        }

        async fn push_state(
            &self,
            _base_url: &str,
            _state: &DesiredState,
            _timeout: Duration,
        ) -> Result<(), PeerError> {
            Ok(())
        }

        async fn pull_state(
            &self,
            _base_url: &str,
            _timeout: Duration,
        ) -> Result<DesiredState, PeerError> {
            Err(PeerError::Unreachable("no state".to_string()))
        }
    }

    /// 频道存在性可配置的假网关
    struct StubGateway {
        missing_channels: HashSet<ChannelId>,
    }

    #[async_trait]
    impl VoiceGatewayPort for StubGateway {
        async fn channel_exists(
            &self,
            _community_id: CommunityId,
            channel_id: ChannelId,
        ) -> bool {
            !self.missing_channels.contains(&channel_id)
        }

        async fn join(
            &self,
            _community_id: CommunityId,
            _voice_channel_id: ChannelId,
        ) -> Result<std::sync::Arc<dyn VoiceSessionHandle>, GatewayError> {
            Err(GatewayError::ConnectFailed("not used in tests".to_string()))
        }

        async fn leave(&self, _community_id: CommunityId) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn reconciler_fixture(
        membership: Vec<CommunityId>,
        missing_channels: HashSet<ChannelId>,
    ) -> (Reconciler, Arc<RecordingPeerClient>) {
        let descriptor = WorkerDescriptor {
            name: "w1".to_string(),
            base_url: "http://w1".to_string(),
            guild_ids: vec![1, 2, 3],
            connected_guild_ids: vec![],
            session_count: 0,
            guild_count: 3,
        };
        let client = Arc::new(RecordingPeerClient {
            descriptors: HashMap::from([(descriptor.base_url.clone(), descriptor)]),
            joins: Mutex::new(Vec::new()),
        });

        let discovery = DiscoveryService::new(
            WorkerIdentity {
                name: "primary".to_string(),
                base_url: "http://primary".to_string(),
                communities: membership.clone(),
            },
            vec!["http://w1".to_string()],
            client.clone(),
            Arc::new(InMemorySessionRegistry::new()),
            Duration::from_secs(2),
        )
        .arc();

        let orchestrator = Orchestrator::new(
            discovery,
            client.clone(),
            OrchestratorConfig {
                preferred_workers: Vec::new(),
                instruct_timeout: Duration::from_secs(5),
            },
        )
        .arc();

        let reconciler = Reconciler::new(
            membership,
            Arc::new(StubGateway { missing_channels }),
            orchestrator,
            Duration::from_millis(1),
        );
        (reconciler, client)
    }

    fn binding(channel_id: ChannelId, text_channel_id: Option<ChannelId>) -> DesiredBinding {
        DesiredBinding {
            channel_id,
            text_channel_id,
        }
    }

    #[tokio::test]
    async fn test_entry_without_text_channel_never_instructed() {
        let (reconciler, client) = reconciler_fixture(vec![1], HashSet::new());
        let state: DesiredState = BTreeMap::from([(1, binding(100, None))]);

        let report = reconciler.reconcile_on_startup(&state).await;

        assert_eq!(report.instructed, 0);
        assert_eq!(report.skipped, 1);
        assert!(client.joins.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_member_entry_skipped_not_deleted() {
        let (reconciler, client) = reconciler_fixture(vec![1], HashSet::new());
        let state: DesiredState = BTreeMap::from([
            (1, binding(100, Some(200))),
            (9, binding(900, Some(901))),
        ]);

        let report = reconciler.reconcile_on_startup(&state).await;

        assert_eq!(report.instructed, 1);
        assert_eq!(report.skipped, 1);
        let joins = client.joins.lock().unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].community_id, 1);
        // 状态本身不被修改
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_voice_channel_skipped() {
        let (reconciler, client) = reconciler_fixture(vec![1], HashSet::from([100]));
        let state: DesiredState = BTreeMap::from([(1, binding(100, Some(200)))]);

        let report = reconciler.reconcile_on_startup(&state).await;

        assert_eq!(report.instructed, 0);
        assert_eq!(report.skipped, 1);
        assert!(client.joins.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_processes_all_entries() {
        let (reconciler, client) = reconciler_fixture(vec![1, 2, 3], HashSet::new());
        let state: DesiredState = BTreeMap::from([
            (1, binding(100, Some(101))),
            (2, binding(200, None)),
            (3, binding(300, Some(301))),
        ]);

        let report = reconciler.reconcile_on_startup(&state).await;

        assert_eq!(report.instructed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(client.joins.lock().unwrap().len(), 2);
    }
}
