//! Ping Handler

use axum::Json;
use serde::Serialize;

use crate::infrastructure::http::dto::ApiResponse;

#[derive(Debug, Serialize)]
pub struct PingDto {
    pub status: &'static str,
}

/// 存活检查
pub async fn ping() -> Json<ApiResponse<PingDto>> {
    Json(ApiResponse::success(PingDto { status: "ok" }))
}
