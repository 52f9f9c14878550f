//! Speech Context - 播报条目与优先级

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CommunityId;

/// 播报优先级
///
/// 排序语义：High > Normal > Low（`Ord` 按此定义）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

/// 播报条目
///
/// 一次出队后不再重新入队：合成或播放失败即丢弃，队列继续推进。
#[derive(Debug, Clone)]
pub struct Utterance {
    pub community_id: CommunityId,
    pub text: String,
    /// 音色/说话人参数
    pub voice: String,
    pub priority: Priority,
    /// 入队序号，由队列分配，用于同优先级的稳定排序
    pub seq: u64,
    pub enqueued_at: DateTime<Utc>,
    /// 来源引用（仅透传给下游历史记录，本核心不使用）
    pub provenance: Option<String>,
}
