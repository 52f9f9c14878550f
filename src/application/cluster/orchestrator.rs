//! Session Orchestrator - 选择 worker 并下发会话指示
//!
//! 选择算法：探测所有 worker，过滤出目标社区的成员（合格节点）；
//! 配置了优先顺序时取顺序中第一个合格节点，否则取当前会话数最低者
//! （平局按所属社区总数）。这是贪心的尽力而为放置，不保证全局最优。
//!
//! 指示失败报告给调用方，不自动重试。所有权账本只在这里变更；
//! 网络分区下两个 worker 同时自认持有属于可接受的最终一致性取舍。

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use super::discovery::DiscoveryService;
use crate::application::ports::{JoinInstruction, PeerClientPort};
use crate::domain::{ChannelId, CommunityId, OwnershipState, WorkerDescriptor};

/// 编排配置
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// 优先 worker 名称列表（按顺序），为空则按负载最低选择
    pub preferred_workers: Vec<String>,
    /// join/leave 指示超时
    pub instruct_timeout: Duration,
}

/// join 指示的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// 已向该 worker 下发指示
    Instructed { worker: String },
    /// 没有合格的 worker，由调用方决定是否上报
    Skipped,
    /// 指示发送失败（不重试）
    Failed { worker: String, reason: String },
}

/// leave 指示的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    Instructed { worker: String },
    /// 没有 worker 持有该社区的会话
    Skipped,
    Failed { worker: String, reason: String },
}

/// 会话编排器
pub struct Orchestrator {
    discovery: Arc<DiscoveryService>,
    client: Arc<dyn PeerClientPort>,
    config: OrchestratorConfig,
    /// 每社区所有权账本，状态迁移只在本组件内发生
    ownership: DashMap<CommunityId, OwnershipState>,
}

impl Orchestrator {
    pub fn new(
        discovery: Arc<DiscoveryService>,
        client: Arc<dyn PeerClientPort>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            discovery,
            client,
            config,
            ownership: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 查询所有权账本（观测用）
    pub fn ownership_of(&self, community_id: CommunityId) -> OwnershipState {
        self.ownership
            .get(&community_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// 选择一个合格的 worker 并下发 join 指示
    pub async fn select_and_instruct(
        &self,
        community_id: CommunityId,
        voice_channel_id: ChannelId,
        text_channel_id: Option<ChannelId>,
    ) -> JoinOutcome {
        let peers = self.discovery.discover_all().await;
        let eligible: Vec<WorkerDescriptor> = peers
            .into_iter()
            .filter_map(|status| status.ok())
            .filter(|descriptor| descriptor.is_member_of(community_id))
            .collect();

        let chosen = match self.select_worker(&eligible) {
            Some(descriptor) => descriptor.clone(),
            None => {
                tracing::info!(
                    community_id = community_id,
                    "No eligible worker for community, skipping"
                );
                return JoinOutcome::Skipped;
            }
        };

        // 原持有者与被选者不同：进入迁移状态
        {
            let mut entry = self.ownership.entry(community_id).or_default();
            if entry.holder().is_some_and(|holder| holder != chosen.name) {
                entry.begin_migration();
            }
        }

        let instruction = JoinInstruction {
            community_id,
            voice_channel_id,
            text_channel_id,
        };

        match self
            .client
            .instruct_join(&chosen.base_url, &instruction, self.config.instruct_timeout)
            .await
        {
            Ok(()) => {
                self.ownership
                    .entry(community_id)
                    .or_default()
                    .assign(&chosen.name);
                tracing::info!(
                    community_id = community_id,
                    worker = %chosen.name,
                    voice_channel_id = voice_channel_id,
                    "Join instructed"
                );
                JoinOutcome::Instructed {
                    worker: chosen.name,
                }
            }
            Err(e) => {
                tracing::warn!(
                    community_id = community_id,
                    worker = %chosen.name,
                    error = %e,
                    "Join instruction failed"
                );
                JoinOutcome::Failed {
                    worker: chosen.name,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 向当前持有该社区会话的 worker 下发 leave 指示
    ///
    /// 按持有会话集合（connected_guild_ids）选择，而不是成员资格。
    pub async fn instruct_leave(&self, community_id: CommunityId) -> LeaveOutcome {
        let peers = self.discovery.discover_all().await;
        let holder = peers
            .into_iter()
            .filter_map(|status| status.ok())
            .find(|descriptor| descriptor.holds_session_for(community_id));

        let holder = match holder {
            Some(descriptor) => descriptor,
            None => {
                tracing::info!(
                    community_id = community_id,
                    "No worker holds a session for community, skipping leave"
                );
                return LeaveOutcome::Skipped;
            }
        };

        match self
            .client
            .instruct_leave(&holder.base_url, community_id, self.config.instruct_timeout)
            .await
        {
            Ok(()) => {
                self.ownership
                    .entry(community_id)
                    .or_default()
                    .release();
                tracing::info!(
                    community_id = community_id,
                    worker = %holder.name,
                    "Leave instructed"
                );
                LeaveOutcome::Instructed {
                    worker: holder.name,
                }
            }
            Err(e) => {
                tracing::warn!(
                    community_id = community_id,
                    worker = %holder.name,
                    error = %e,
                    "Leave instruction failed"
                );
                LeaveOutcome::Failed {
                    worker: holder.name,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 从合格节点中选择目标 worker
    fn select_worker<'a>(&self, eligible: &'a [WorkerDescriptor]) -> Option<&'a WorkerDescriptor> {
        if !self.config.preferred_workers.is_empty() {
            for preferred in &self.config.preferred_workers {
                if let Some(descriptor) = eligible.iter().find(|d| &d.name == preferred) {
                    return Some(descriptor);
                }
            }
        }

        eligible
            .iter()
            .min_by_key(|descriptor| (descriptor.session_count, descriptor.guild_count))
    }
}
