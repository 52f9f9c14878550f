//! State Sync Handlers - 对等节点间的状态文档推送/拉取
//!
//! 两者都是尽力而为：推送由配置开关门禁，拉取只读当前快照。

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::ports::DesiredState;
use crate::infrastructure::http::dto::{ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 返回完整的期望状态文档（对等节点启动时拉取）
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<ApiResponse<DesiredState>> {
    Json(ApiResponse::success(state.desired.snapshot().await))
}

/// 接受对等节点推送的完整状态文档
pub async fn push_state(
    State(state): State<Arc<AppState>>,
    Json(pushed): Json<DesiredState>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    if !state.accept_push {
        return Err(ApiError::Forbidden(
            "State push is not accepted by this worker".to_string(),
        ));
    }

    tracing::info!(entries = pushed.len(), "Accepting pushed state document");
    state.desired.replace(pushed).await;
    Ok(Json(ApiResponse::ok()))
}
