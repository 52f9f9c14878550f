//! Cluster Coordination
//!
//! 跨进程会话所有权编排：
//! - discovery: 本机描述符与对等节点并发探测
//! - orchestrator: 选择合适的 worker 并下发 join/leave 指示
//! - reconcile: 启动时按持久化期望状态重建会话
//! - desired: 期望状态的内存视图与变更落盘

mod desired;
mod discovery;
mod orchestrator;
mod reconcile;

pub use desired::DesiredSessions;
pub use discovery::{DiscoveryService, WorkerIdentity};
pub use orchestrator::{JoinOutcome, LeaveOutcome, Orchestrator, OrchestratorConfig};
pub use reconcile::{ReconcileReport, Reconciler};
