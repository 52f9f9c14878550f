//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::CommunityId;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 本 worker 身份配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 语音合成配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 集群（对等节点）配置
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// 持久化会话状态配置
    #[serde(default)]
    pub state: StateConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL（供对等节点回连使用）
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    6060
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

impl ServerConfig {
    /// 获取服务器监听地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "localhost"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 本 worker 身份配置
///
/// communities 即本进程账号所属的社区列表。成员资格本属于网关账号数据，
/// 网关协议不在本核心范围内，因此由配置提供并通过 info 端点对外公布。
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Worker 名称（进程标识，选择与指示都以此为键）
    #[serde(default = "default_worker_name")]
    pub name: String,

    /// 本 worker 所属的社区 ID 列表
    #[serde(default)]
    pub communities: Vec<CommunityId>,
}

fn default_worker_name() -> String {
    "chorus-worker".to_string()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: default_worker_name(),
            communities: Vec::new(),
        }
    }
}

/// 语音合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 合成服务基础 URL
    #[serde(default = "default_synthesis_url")]
    pub url: String,

    /// 单次合成请求超时时间（秒）
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,

    /// 默认音色 ID
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// 文本最大长度（字符数），入队文本在计算缓存 key 之前截断到此长度
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,

    /// 缓存条目 TTL（秒）
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// 缓存清扫间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// 临时音频产物目录
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

fn default_synthesis_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_synthesis_timeout() -> u64 {
    30
}

fn default_voice() -> String {
    "default".to_string()
}

fn default_max_text_len() -> usize {
    200
}

fn default_cache_ttl() -> u64 {
    600 // 10 分钟
}

fn default_sweep_interval() -> u64 {
    60 // 1 分钟
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("data/artifacts")
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: default_synthesis_url(),
            timeout_secs: default_synthesis_timeout(),
            default_voice: default_voice(),
            max_text_len: default_max_text_len(),
            cache_ttl_secs: default_cache_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 等待上一段播放结束的上限（秒），超过后强制停止
    #[serde(default = "default_busy_wait")]
    pub busy_wait_secs: u64,

    /// 单段播放的硬超时（秒）
    #[serde(default = "default_play_timeout")]
    pub play_timeout_secs: u64,

    /// 空闲轮询间隔（毫秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_busy_wait() -> u64 {
    10
}

fn default_play_timeout() -> u64 {
    15
}

fn default_poll_interval() -> u64 {
    100
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            busy_wait_secs: default_busy_wait(),
            play_timeout_secs: default_play_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// 集群配置
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// 所有 worker 的基础地址列表（包含本进程自身）
    #[serde(default)]
    pub peers: Vec<String>,

    /// info 探测超时（秒）
    #[serde(default = "default_info_timeout")]
    pub info_timeout_secs: u64,

    /// join/leave 指示超时（秒）
    #[serde(default = "default_instruct_timeout")]
    pub instruct_timeout_secs: u64,

    /// 选择时的优先 worker 名称列表（按顺序），为空则按负载最低选择
    #[serde(default)]
    pub preferred_workers: Vec<String>,
}

fn default_info_timeout() -> u64 {
    2
}

fn default_instruct_timeout() -> u64 {
    5
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            info_timeout_secs: default_info_timeout(),
            instruct_timeout_secs: default_instruct_timeout(),
            preferred_workers: Vec::new(),
        }
    }
}

/// 持久化会话状态配置
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// 状态文件路径（单个 JSON 文档）
    #[serde(default = "default_state_path")]
    pub path: PathBuf,

    /// 是否接受对等节点推送的状态文档
    #[serde(default)]
    pub accept_push: bool,

    /// 启动时从该对等节点拉取状态文档（可选，尽力而为）
    #[serde(default)]
    pub pull_from: Option<String>,

    /// 启动时是否执行会话重建
    #[serde(default = "default_reconcile_enabled")]
    pub reconcile_enabled: bool,

    /// 两次重建指示之间的间隔（毫秒）
    #[serde(default = "default_reconcile_delay")]
    pub reconcile_delay_ms: u64,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("data/sessions.json")
}

fn default_reconcile_enabled() -> bool {
    true
}

fn default_reconcile_delay() -> u64 {
    250
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
            accept_push: false,
            pull_from: None,
            reconcile_enabled: default_reconcile_enabled(),
            reconcile_delay_ms: default_reconcile_delay(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 6060);
        assert_eq!(config.synthesis.url, "http://localhost:8000");
        assert_eq!(config.synthesis.cache_ttl_secs, 600);
        assert_eq!(config.synthesis.sweep_interval_secs, 60);
        assert_eq!(config.playback.busy_wait_secs, 10);
        assert_eq!(config.playback.play_timeout_secs, 15);
        assert_eq!(config.state.reconcile_delay_ms, 250);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:6060");
    }

    #[test]
    fn test_public_base_url_falls_back_to_localhost() {
        let config = ServerConfig::default();
        assert_eq!(config.public_base_url(), "http://localhost:6060");
    }
}
