//! Worker Context - 描述符与探测结果

use serde::{Deserialize, Serialize};

use super::CommunityId;

/// Worker 描述符
///
/// 即对等节点 info 端点的线上格式。每次探测都重新计算，从不持久化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    /// Worker 名称（进程标识）
    pub name: String,
    /// 可达的基础地址
    pub base_url: String,
    /// 该 worker 所属的社区 ID 列表（成员资格）
    pub guild_ids: Vec<CommunityId>,
    /// 当前持有语音会话的社区 ID 列表
    pub connected_guild_ids: Vec<CommunityId>,
    /// 当前会话数（负载信号）
    pub session_count: usize,
    /// 所属社区总数（次级负载信号）
    pub guild_count: usize,
}

impl WorkerDescriptor {
    /// 是否是目标社区的成员（join 选择的资格条件）
    pub fn is_member_of(&self, community_id: CommunityId) -> bool {
        self.guild_ids.contains(&community_id)
    }

    /// 是否持有目标社区的会话（leave 选择的资格条件）
    pub fn holds_session_for(&self, community_id: CommunityId) -> bool {
        self.connected_guild_ids.contains(&community_id)
    }
}

/// 单个对等节点的探测结果
///
/// 一个节点不可达不影响其余节点的处理，部分结果是正常状态。
#[derive(Debug, Clone)]
pub enum PeerStatus {
    Ok(WorkerDescriptor),
    Unreachable { base_url: String, reason: String },
}

impl PeerStatus {
    pub fn ok(self) -> Option<WorkerDescriptor> {
        match self {
            PeerStatus::Ok(descriptor) => Some(descriptor),
            PeerStatus::Unreachable { .. } => None,
        }
    }
}
