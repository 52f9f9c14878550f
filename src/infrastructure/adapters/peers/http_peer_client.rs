//! HTTP Peer Client - 对等 worker 的出站调用
//!
//! 实现 PeerClientPort trait。所有调用都带调用方给定的超时；
//! 对等端点返回统一的 {errno, error, data} 信封。

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{DesiredState, JoinInstruction, PeerClientPort, PeerError};
use crate::domain::{CommunityId, WorkerDescriptor};

/// 对等端点的响应信封
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    errno: i32,
    #[serde(default)]
    error: String,
    data: Option<T>,
}

/// leave 请求体
#[derive(Debug, Serialize)]
struct LeaveHttpRequest {
    community_id: CommunityId,
}

/// HTTP 对等客户端
pub struct HttpPeerClient {
    client: Client,
}

impl HttpPeerClient {
    pub fn new() -> Result<Self, PeerError> {
        let client = Client::builder()
            .build()
            .map_err(|e| PeerError::Unreachable(e.to_string()))?;
        Ok(Self { client })
    }

    fn map_request_error(e: reqwest::Error) -> PeerError {
        if e.is_timeout() {
            PeerError::Timeout
        } else {
            PeerError::Unreachable(e.to_string())
        }
    }

    /// 解包统一信封，errno != 0 视为对端错误
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PeerError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PeerError::PeerError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| PeerError::InvalidResponse(e.to_string()))?;

        if envelope.errno != 0 {
            return Err(PeerError::PeerError(envelope.error));
        }
        envelope
            .data
            .ok_or_else(|| PeerError::InvalidResponse("missing data field".to_string()))
    }

    /// 解包无关心数据的信封
    async fn decode_empty(response: reqwest::Response) -> Result<(), PeerError> {
        Self::decode::<serde_json::Value>(response).await.map(|_| ())
    }
}

#[async_trait]
impl PeerClientPort for HttpPeerClient {
    async fn fetch_info(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> Result<WorkerDescriptor, PeerError> {
        let response = self
            .client
            .get(format!("{}/api/worker/info", base_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        Self::decode(response).await
    }

    async fn instruct_join(
        &self,
        base_url: &str,
        instruction: &JoinInstruction,
        timeout: Duration,
    ) -> Result<(), PeerError> {
        let response = self
            .client
            .post(format!("{}/api/worker/join", base_url))
            .timeout(timeout)
            .json(instruction)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        Self::decode_empty(response).await
    }

    async fn instruct_leave(
        &self,
        base_url: &str,
        community_id: CommunityId,
        timeout: Duration,
    ) -> Result<(), PeerError> {
        let response = self
            .client
            .post(format!("{}/api/worker/leave", base_url))
            .timeout(timeout)
            .json(&LeaveHttpRequest { community_id })
            .send()
            .await
            .map_err(Self::map_request_error)?;

        Self::decode_empty(response).await
    }

    async fn push_state(
        &self,
        base_url: &str,
        state: &DesiredState,
        timeout: Duration,
    ) -> Result<(), PeerError> {
        let response = self
            .client
            .post(format!("{}/api/state/push", base_url))
            .timeout(timeout)
            .json(state)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        Self::decode_empty(response).await
    }

    async fn pull_state(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> Result<DesiredState, PeerError> {
        let response = self
            .client
            .get(format!("{}/api/state", base_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        Self::decode(response).await
    }
}
