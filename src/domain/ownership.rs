//! Ownership State Machine - 社区会话所有权
//!
//! 每个社区的语音会话在约定上同一时刻只由一个 worker 持有。
//! 该约定没有锁保障：网络分区下可能出现两个 worker 同时自认持有，
//! 属于可接受的最终一致性取舍。状态迁移只允许由 Orchestrator 发起。

/// 社区会话所有权状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipState {
    /// 无人持有
    Unowned,
    /// 已由某 worker 持有
    Owned { worker: String },
    /// 正在迁移（原持有者已知，新持有者尚未确认）
    Migrating { from: String },
}

impl Default for OwnershipState {
    fn default() -> Self {
        OwnershipState::Unowned
    }
}

impl OwnershipState {
    /// 指示成功后记录新持有者
    pub fn assign(&mut self, worker: impl Into<String>) {
        *self = OwnershipState::Owned {
            worker: worker.into(),
        };
    }

    /// 开始迁移：仅在已持有状态下有意义，其余状态保持不变
    pub fn begin_migration(&mut self) {
        if let OwnershipState::Owned { worker } = self {
            let from = std::mem::take(worker);
            *self = OwnershipState::Migrating { from };
        }
    }

    /// 显式离开后回到无人持有
    pub fn release(&mut self) {
        *self = OwnershipState::Unowned;
    }

    pub fn holder(&self) -> Option<&str> {
        match self {
            OwnershipState::Owned { worker } => Some(worker),
            _ => None,
        }
    }
}
