//! Chorus - 社区语音播报 worker
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Speech: 播报条目与优先级
//! - Worker: worker 描述符与对等状态
//! - Ownership: 社区会话归属状态机
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SynthesisEngine, VoiceGateway, SessionRegistry, StateStore, PeerClient）
//! - Speech: 合成缓存、音频解析、播放控制、优先级队列
//! - Cluster: worker 发现、会话编排、期望状态与启动对账
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API（对外 + worker 对等）
//! - Memory: SessionRegistry 内存实现
//! - Persistence: 期望状态 JSON 文件存储
//! - Adapters: 合成引擎 HTTP 客户端、语音网关、对等 worker 客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
