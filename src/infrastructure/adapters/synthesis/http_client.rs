//! HTTP Synthesis Client - 调用外部语音合成服务
//!
//! 实现 SynthesisEnginePort trait，按两步调用外部服务：
//!
//! 外部合成 API:
//! POST {base}/api/synthesis/plan
//! Request: {"text": "...", "voice": "..."}  (JSON)
//! Response: 结构化 plan (JSON)
//!
//! POST {base}/api/synthesis/render
//! Request: {"plan": {...}, "voice": "..."}  (JSON)
//! Response: audio binary
//!
//! 非 2xx 响应一律按硬失败处理。

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{SynthesisEnginePort, SynthesisError, SynthesisPlan};

/// plan 请求体 (JSON)
#[derive(Debug, Serialize)]
struct PlanHttpRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

/// render 请求体 (JSON)
#[derive(Debug, Serialize)]
struct RenderHttpRequest<'a> {
    plan: &'a serde_json::Value,
    voice: &'a str,
}

/// HTTP 合成客户端配置
#[derive(Debug, Clone)]
pub struct HttpSynthesisClientConfig {
    /// 合成服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpSynthesisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl HttpSynthesisClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 合成客户端
pub struct HttpSynthesisClient {
    client: Client,
    config: HttpSynthesisClientConfig,
}

impl HttpSynthesisClient {
    /// 创建新的 HTTP 合成客户端
    pub fn new(config: HttpSynthesisClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn plan_url(&self) -> String {
        format!("{}/api/synthesis/plan", self.config.base_url)
    }

    fn render_url(&self) -> String {
        format!("{}/api/synthesis/render", self.config.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url)
    }

    fn map_request_error(e: reqwest::Error) -> SynthesisError {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else if e.is_connect() {
            SynthesisError::NetworkError(format!("Cannot connect to synthesis service: {}", e))
        } else {
            SynthesisError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl SynthesisEnginePort for HttpSynthesisClient {
    async fn plan(&self, text: &str, voice: &str) -> Result<SynthesisPlan, SynthesisError> {
        tracing::debug!(
            url = %self.plan_url(),
            text_len = text.len(),
            voice = %voice,
            "Requesting synthesis plan"
        );

        let response = self
            .client
            .post(self.plan_url())
            .json(&PlanHttpRequest { text, voice })
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to parse plan: {}", e)))?;

        Ok(SynthesisPlan {
            text: text.to_string(),
            payload,
        })
    }

    async fn render(&self, plan: &SynthesisPlan, voice: &str) -> Result<Vec<u8>, SynthesisError> {
        let response = self
            .client
            .post(self.render_url())
            .json(&RenderHttpRequest {
                plan: &plan.payload,
                voice,
            })
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        tracing::info!(
            voice = %voice,
            text_len = plan.text.len(),
            audio_size = audio.len(),
            "Synthesis render completed"
        );

        Ok(audio)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpSynthesisClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpSynthesisClientConfig::new("http://tts:9000").with_timeout(60);
        assert_eq!(config.base_url, "http://tts:9000");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_endpoint_urls() {
        let client = HttpSynthesisClient::new(HttpSynthesisClientConfig::default()).unwrap();
        assert_eq!(client.plan_url(), "http://localhost:8000/api/synthesis/plan");
        assert_eq!(
            client.render_url(),
            "http://localhost:8000/api/synthesis/render"
        );
    }
}
