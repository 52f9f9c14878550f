//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::domain::{ChannelId, CommunityId, Priority};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

// ============================================================================
// Worker DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub community_id: CommunityId,
    pub voice_channel_id: ChannelId,
    #[serde(default)]
    pub text_channel_id: Option<ChannelId>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub community_id: CommunityId,
}

#[derive(Debug, Serialize)]
pub struct JoinedDto {
    pub community_id: CommunityId,
    pub voice_channel_id: ChannelId,
    /// 本次建立的会话代次
    pub generation: u64,
}

// ============================================================================
// Speech DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub community_id: CommunityId,
    pub text: String,
    /// 音色 ID，缺省使用配置的默认音色
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// 来源引用（仅透传）
    #[serde(default)]
    pub provenance: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommunityRequest {
    pub community_id: CommunityId,
}

#[derive(Debug, Serialize)]
pub struct ClearedDto {
    pub removed: usize,
}
