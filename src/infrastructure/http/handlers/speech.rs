//! Speech Handlers - enqueue / status / clear

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::speech::QueueStatus;
use crate::infrastructure::http::dto::{ApiResponse, ClearedDto, CommunityRequest, EnqueueRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 入队一条播报
pub async fn enqueue_speech(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<ApiResponse<QueueStatus>>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text cannot be empty".to_string()));
    }

    let status = state.queues.enqueue(
        req.community_id,
        req.text,
        req.voice,
        req.priority,
        req.provenance,
    );

    Ok(Json(ApiResponse::success(status)))
}

/// 查询队列状态
pub async fn queue_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommunityRequest>,
) -> Json<ApiResponse<QueueStatus>> {
    Json(ApiResponse::success(state.queues.status(req.community_id)))
}

/// 清空待播条目
pub async fn clear_queue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommunityRequest>,
) -> Json<ApiResponse<ClearedDto>> {
    let removed = state.queues.clear(req.community_id);
    tracing::info!(
        community_id = req.community_id,
        removed = removed,
        "Queue cleared"
    );
    Json(ApiResponse::success(ClearedDto { removed }))
}
