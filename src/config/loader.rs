//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `CHORUS_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `CHORUS_SERVER__PORT=6061`
/// - `CHORUS_WORKER__NAME=worker-2`
/// - `CHORUS_SYNTHESIS__URL=http://tts-server:8000`
/// - `CHORUS_STATE__PATH=/data/sessions.json`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 6060)?
        .set_default("worker.name", "chorus-worker")?
        .set_default("synthesis.url", "http://localhost:8000")?
        .set_default("synthesis.timeout_secs", 30)?
        .set_default("synthesis.default_voice", "default")?
        .set_default("synthesis.max_text_len", 200)?
        .set_default("synthesis.cache_ttl_secs", 600)?
        .set_default("synthesis.sweep_interval_secs", 60)?
        .set_default("synthesis.artifact_dir", "data/artifacts")?
        .set_default("playback.busy_wait_secs", 10)?
        .set_default("playback.play_timeout_secs", 15)?
        .set_default("playback.poll_interval_ms", 100)?
        .set_default("cluster.info_timeout_secs", 2)?
        .set_default("cluster.instruct_timeout_secs", 5)?
        .set_default("state.path", "data/sessions.json")?
        .set_default("state.accept_push", false)?
        .set_default("state.reconcile_enabled", true)?
        .set_default("state.reconcile_delay_ms", 250)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: CHORUS_
    // 层级分隔符: __ (双下划线)
    builder = builder.add_source(
        Environment::with_prefix("CHORUS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.worker.name.is_empty() {
        return Err(ConfigError::ValidationError(
            "Worker name cannot be empty".to_string(),
        ));
    }

    if config.synthesis.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Synthesis URL cannot be empty".to_string(),
        ));
    }

    if config.synthesis.max_text_len == 0 {
        return Err(ConfigError::ValidationError(
            "Max text length cannot be 0".to_string(),
        ));
    }

    if config.synthesis.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Cache sweep interval cannot be 0".to_string(),
        ));
    }

    if config.playback.play_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Playback timeout cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Worker Configuration ===");
    tracing::info!("Worker: {}", config.worker.name);
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    tracing::info!("Member Communities: {}", config.worker.communities.len());
    tracing::info!("Synthesis URL: {}", config.synthesis.url);
    tracing::info!("Synthesis Timeout: {}s", config.synthesis.timeout_secs);
    tracing::info!("Cache TTL: {}s", config.synthesis.cache_ttl_secs);
    tracing::info!("Artifact Directory: {:?}", config.synthesis.artifact_dir);
    tracing::info!("Cluster Peers: {}", config.cluster.peers.len());
    tracing::info!("State File: {:?}", config.state.path);
    tracing::info!("Reconcile Enabled: {}", config.state.reconcile_enabled);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("============================");
}
