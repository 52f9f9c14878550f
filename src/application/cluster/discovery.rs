//! Worker Discovery - 描述符计算与对等节点探测
//!
//! 每个 worker 在有界超时内回答自己的描述符；探测对所有已知节点
//! 并发扇出，单个节点无响应或出错只记为 Unreachable，
//! 不会使整次查询失败——部分结果是正常状态（节点可能正在重启）。

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{PeerClientPort, SessionRegistryPort};
use crate::domain::{CommunityId, PeerStatus, WorkerDescriptor};

/// 本 worker 的身份信息
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    pub name: String,
    pub base_url: String,
    /// 本进程账号所属的社区列表
    pub communities: Vec<CommunityId>,
}

/// 探测服务
pub struct DiscoveryService {
    identity: WorkerIdentity,
    /// 所有 worker 的基础地址（通常包含本进程自身）
    peers: Vec<String>,
    client: Arc<dyn PeerClientPort>,
    registry: Arc<dyn SessionRegistryPort>,
    info_timeout: Duration,
}

impl DiscoveryService {
    pub fn new(
        identity: WorkerIdentity,
        peers: Vec<String>,
        client: Arc<dyn PeerClientPort>,
        registry: Arc<dyn SessionRegistryPort>,
        info_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            peers,
            client,
            registry,
            info_timeout,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 计算本机描述符（info 端点的响应体，每次查询重新计算）
    pub fn describe_self(&self) -> WorkerDescriptor {
        let connected = self.registry.held_communities();
        WorkerDescriptor {
            name: self.identity.name.clone(),
            base_url: self.identity.base_url.clone(),
            guild_ids: self.identity.communities.clone(),
            session_count: connected.len(),
            connected_guild_ids: connected,
            guild_count: self.identity.communities.len(),
        }
    }

    /// 并发探测所有已知 worker
    pub async fn discover_all(&self) -> Vec<PeerStatus> {
        let probes = self.peers.iter().map(|base_url| {
            let client = Arc::clone(&self.client);
            let timeout = self.info_timeout;
            async move {
                match client.fetch_info(base_url, timeout).await {
                    Ok(descriptor) => PeerStatus::Ok(descriptor),
                    Err(e) => {
                        tracing::debug!(peer = %base_url, error = %e, "Peer probe failed");
                        PeerStatus::Unreachable {
                            base_url: base_url.clone(),
                            reason: e.to_string(),
                        }
                    }
                }
            }
        });

        join_all(probes).await
    }
}
