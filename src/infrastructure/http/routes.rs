//! HTTP Routes
//!
//! API 路由定义
//!
//! API Endpoints:
//! - /api/ping            GET   存活检查
//! - /api/worker/info     GET   本 worker 描述符（成员/持有会话/负载）
//! - /api/worker/join     POST  建立语音会话指示
//! - /api/worker/leave    POST  拆除语音会话指示
//! - /api/speech/enqueue  POST  入队播报
//! - /api/speech/status   POST  查询队列状态
//! - /api/speech/clear    POST  清空待播条目
//! - /api/state           GET   期望状态文档（对等拉取）
//! - /api/state/push      POST  接受推送的状态文档

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/worker", worker_routes())
        .nest("/speech", speech_routes())
        .route("/state", get(handlers::get_state))
        .route("/state/push", post(handlers::push_state))
}

/// Worker 路由
fn worker_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/info", get(handlers::worker_info))
        .route("/join", post(handlers::join_channel))
        .route("/leave", post(handlers::leave_channel))
}

/// Speech 路由
fn speech_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/enqueue", post(handlers::enqueue_speech))
        .route("/status", post(handlers::queue_status))
        .route("/clear", post(handlers::clear_queue))
}
