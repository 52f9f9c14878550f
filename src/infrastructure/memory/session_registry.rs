//! In-Memory Session Registry Implementation
//!
//! 进程本地的会话注册表。传输句柄是进程本地对象，从不跨进程共享。

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{ActiveSession, SessionRegistryPort};
use crate::domain::CommunityId;

/// 内存会话注册表
pub struct InMemorySessionRegistry {
    sessions: DashMap<CommunityId, ActiveSession>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemorySessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistryPort for InMemorySessionRegistry {
    fn insert(&self, session: ActiveSession) {
        let community_id = session.community_id;
        let replaced = self.sessions.insert(community_id, session).is_some();
        tracing::info!(
            community_id = community_id,
            replaced = replaced,
            "Voice session registered"
        );
    }

    fn get(&self, community_id: CommunityId) -> Option<ActiveSession> {
        self.sessions.get(&community_id).map(|s| s.clone())
    }

    fn remove(&self, community_id: CommunityId) -> Option<ActiveSession> {
        let removed = self.sessions.remove(&community_id).map(|(_, s)| s);
        if removed.is_some() {
            tracing::info!(community_id = community_id, "Voice session removed");
        }
        removed
    }

    fn is_ready(&self, community_id: CommunityId) -> bool {
        self.sessions
            .get(&community_id)
            .map(|s| s.ready)
            .unwrap_or(false)
    }

    fn touch(&self, community_id: CommunityId) {
        if let Some(mut session) = self.sessions.get_mut(&community_id) {
            session.last_activity = Utc::now();
        }
    }

    fn held_communities(&self) -> Vec<CommunityId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    fn count(&self) -> usize {
        self.sessions.len()
    }
}
