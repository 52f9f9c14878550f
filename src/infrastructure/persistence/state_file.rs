//! JSON State File Store
//!
//! 期望会话状态的文件持久化：单个 JSON 文档，
//! 写入走「临时文件 + rename 覆盖」，读者永远不会观察到写了一半的文件。

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{DesiredState, StateStoreError, StateStorePort};

/// JSON 文件状态存储
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl StateStorePort for JsonStateStore {
    async fn load(&self) -> Result<DesiredState, StateStoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "State file not found, starting empty");
                return Ok(DesiredState::new());
            }
            Err(e) => return Err(StateStoreError::IoError(e.to_string())),
        };

        serde_json::from_str(&content)
            .map_err(|e| StateStoreError::SerializationError(e.to_string()))
    }

    async fn save(&self, state: &DesiredState) -> Result<(), StateStoreError> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StateStoreError::SerializationError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateStoreError::IoError(e.to_string()))?;
        }

        // 原子写入：先写临时文件，再 rename 覆盖目标
        let tmp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| StateStoreError::IoError(e.to_string()))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StateStoreError::IoError(e.to_string()));
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = state.len(),
            "Desired state saved"
        );
        Ok(())
    }
}
