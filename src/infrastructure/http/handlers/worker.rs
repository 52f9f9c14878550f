//! Worker Handlers - info / join / leave
//!
//! join/leave 是对等节点（或编排器）下发给本 worker 的指示：
//! join 建立底层传输连接、注册会话并持久化期望绑定；
//! leave 拆除会话并删除期望绑定。

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::ports::ActiveSession;
use crate::application::speech::PlaybackController;
use crate::domain::WorkerDescriptor;
use crate::infrastructure::http::dto::{ApiResponse, Empty, JoinRequest, JoinedDto, LeaveRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 本 worker 的描述符（每次查询重新计算）
pub async fn worker_info(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<WorkerDescriptor>> {
    Json(ApiResponse::success(state.discovery.describe_self()))
}

/// 建立语音会话
pub async fn join_channel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<ApiResponse<JoinedDto>>, ApiError> {
    let handle = state
        .gateway
        .join(req.community_id, req.voice_channel_id)
        .await?;

    let generation = handle.generation();
    let controller = Arc::new(PlaybackController::new(
        req.community_id,
        handle.clone(),
        state.registry.clone(),
        state.playback_settings.clone(),
    ));

    let now = chrono::Utc::now();
    state.registry.insert(ActiveSession {
        community_id: req.community_id,
        voice_channel_id: req.voice_channel_id,
        text_channel_id: req.text_channel_id,
        generation,
        ready: true,
        handle,
        controller,
        established_at: now,
        last_activity: now,
    });

    // 只有带显式文字频道绑定的建立才写入期望状态
    if req.text_channel_id.is_some() {
        state
            .desired
            .bind(req.community_id, req.voice_channel_id, req.text_channel_id)
            .await;
    }

    tracing::info!(
        community_id = req.community_id,
        voice_channel_id = req.voice_channel_id,
        generation = generation,
        "Join instruction handled"
    );

    Ok(Json(ApiResponse::success(JoinedDto {
        community_id: req.community_id,
        voice_channel_id: req.voice_channel_id,
        generation,
    })))
}

/// 拆除语音会话
pub async fn leave_channel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LeaveRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let had_session = state.registry.remove(req.community_id).is_some();

    if let Err(e) = state.gateway.leave(req.community_id).await {
        if !had_session {
            return Err(e.into());
        }
        // 注册表里有记录但网关已无会话：记录后照常清理
        tracing::warn!(
            community_id = req.community_id,
            error = %e,
            "Gateway leave failed for registered session"
        );
    }

    // 显式拆除删除期望绑定
    state.desired.unbind(req.community_id).await;

    tracing::info!(
        community_id = req.community_id,
        "Leave instruction handled"
    );
    Ok(Json(ApiResponse::ok()))
}
