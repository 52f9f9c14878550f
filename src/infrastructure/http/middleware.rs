//! HTTP Middleware
//!
//! HTTP 状态码错误日志中间件

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};

/// HTTP 状态码错误日志中间件
///
/// 拦截 HTTP 响应，当状态码为 4xx 或 5xx 时记录日志
/// 注意：业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP client error"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    // 业务路由一律返回 200 + errno 信封（见 error.rs），
    // 这里用裸状态码路由验证中间件对传输层错误的观测
    async fn ping_handler() -> &'static str {
        "pong"
    }

    async fn unknown_worker_handler() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    async fn gateway_down_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn worker_test_router() -> Router {
        Router::new()
            .route("/ping", get(ping_handler))
            .route("/worker/unknown", get(unknown_worker_handler))
            .route("/gateway/down", get(gateway_down_handler))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    async fn status_of(uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        worker_test_router().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_ok_response_passes_through() {
        assert_eq!(status_of("/ping").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_client_error_logs_warning() {
        assert_eq!(status_of("/worker/unknown").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_server_error_logs_error() {
        assert_eq!(
            status_of("/gateway/down").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
