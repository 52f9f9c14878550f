//! Synthesis Engine Port - 外部语音合成服务抽象
//!
//! 外部服务按两步工作：先提交文本获取结构化的合成 plan，
//! 再提交（可调整参数的）plan 渲染出音频字节流。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 合成 plan
///
/// 合成服务返回的中间请求对象。payload 原样回传给渲染端点，
/// 调用方可以在回传前调整其中的参数（如语速）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisPlan {
    /// 请求文本（回传时用于日志和追踪）
    pub text: String,
    /// 服务返回的结构化 plan 内容
    pub payload: serde_json::Value,
}

/// Synthesis Engine Port
///
/// 所有失败都向调用方传播，不产生部分缓存条目。
#[async_trait]
pub trait SynthesisEnginePort: Send + Sync {
    /// 第一步：提交文本与音色，获取合成 plan
    async fn plan(&self, text: &str, voice: &str) -> Result<SynthesisPlan, SynthesisError>;

    /// 第二步：提交 plan 与音色，渲染音频字节流
    async fn render(&self, plan: &SynthesisPlan, voice: &str) -> Result<Vec<u8>, SynthesisError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
