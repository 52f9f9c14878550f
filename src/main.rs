//! Chorus - 社区语音播报 worker
//!
//! 架构: DDD + Hexagonal Architecture
//! - Domain: speech/, worker/, ownership/
//! - Application: ports, speech（缓存/解析/播放/队列）, cluster（发现/编排/对账）
//! - Infrastructure: http, memory, persistence, adapters

use std::sync::Arc;
use std::time::Duration;

use chorus::application::cluster::{
    DesiredSessions, DiscoveryService, Orchestrator, OrchestratorConfig, Reconciler,
    WorkerIdentity,
};
use chorus::application::ports::PeerClientPort;
use chorus::application::speech::{
    PlaybackQueues, PlaybackSettings, QueueSettings, SpeechResolver, SynthesisCache,
    SynthesisCacheConfig,
};
use chorus::config::{load_config, print_config};
use chorus::infrastructure::adapters::{
    FakeVoiceGateway, HttpPeerClient, HttpSynthesisClient, HttpSynthesisClientConfig,
};
use chorus::infrastructure::http::{AppState, HttpServer, ServerConfig};
use chorus::infrastructure::memory::InMemorySessionRegistry;
use chorus::infrastructure::persistence::state_file::JsonStateStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},chorus={},tower_http=debug",
        config.log.level, config.log.level
    );
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));
    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    tracing::info!("Chorus - 社区语音播报 worker");
    print_config(&config);

    // 确保数据目录存在
    tokio::fs::create_dir_all(&config.synthesis.artifact_dir).await?;
    if let Some(parent) = config.state.path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    // 合成缓存 + 后台清扫
    let cache = SynthesisCache::new(SynthesisCacheConfig {
        ttl: Duration::from_secs(config.synthesis.cache_ttl_secs),
        sweep_interval: Duration::from_secs(config.synthesis.sweep_interval_secs),
    })
    .arc();
    cache.clone().start_sweeper();

    // HTTP 合成引擎
    let engine_config = HttpSynthesisClientConfig::new(config.synthesis.url.clone())
        .with_timeout(config.synthesis.timeout_secs);
    let engine = Arc::new(HttpSynthesisClient::new(engine_config)?);

    let resolver = SpeechResolver::new(
        engine,
        cache,
        config.synthesis.artifact_dir.clone(),
    )
    .arc();

    // 会话注册表 + 播报队列
    let registry = InMemorySessionRegistry::new().arc();
    let queues = PlaybackQueues::new(
        resolver,
        registry.clone(),
        QueueSettings {
            max_text_len: config.synthesis.max_text_len,
            default_voice: config.synthesis.default_voice.clone(),
        },
    )
    .arc();

    // 对等 worker 客户端 + 探测服务
    let peer_client = Arc::new(HttpPeerClient::new()?);
    let identity = WorkerIdentity {
        name: config.worker.name.clone(),
        base_url: config.server.public_base_url(),
        communities: config.worker.communities.clone(),
    };
    let discovery = DiscoveryService::new(
        identity,
        config.cluster.peers.clone(),
        peer_client.clone(),
        registry.clone(),
        Duration::from_secs(config.cluster.info_timeout_secs),
    )
    .arc();

    // 会话编排器
    let orchestrator = Orchestrator::new(
        discovery.clone(),
        peer_client.clone(),
        OrchestratorConfig {
            preferred_workers: config.cluster.preferred_workers.clone(),
            instruct_timeout: Duration::from_secs(config.cluster.instruct_timeout_secs),
        },
    )
    .arc();

    // 期望状态：先读本地文件，可选从对等节点拉取覆盖
    let store = JsonStateStore::new(config.state.path.clone()).arc();
    let desired = DesiredSessions::new(store).arc();
    desired.load().await;
    if let Some(ref peer) = config.state.pull_from {
        match peer_client
            .pull_state(peer, Duration::from_secs(config.cluster.info_timeout_secs))
            .await
        {
            Ok(state) => {
                tracing::info!(peer = %peer, entries = state.len(), "Pulled desired state from peer");
                desired.replace(state).await;
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Failed to pull desired state, using local file");
            }
        }
    }

    // 语音网关
    let gateway = FakeVoiceGateway::new().arc();

    // 启动对账：按期望状态重建会话
    if config.state.reconcile_enabled {
        let reconciler = Reconciler::new(
            config.worker.communities.clone(),
            gateway.clone(),
            orchestrator.clone(),
            Duration::from_millis(config.state.reconcile_delay_ms),
        );
        let snapshot = desired.snapshot().await;
        tokio::spawn(async move {
            let report = reconciler.reconcile_on_startup(&snapshot).await;
            tracing::info!(
                instructed = report.instructed,
                skipped = report.skipped,
                failed = report.failed,
                "Session reconciliation finished"
            );
        });
    }

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = AppState::new(
        discovery,
        registry,
        queues,
        gateway,
        desired,
        PlaybackSettings::from(&config.playback),
        config.state.accept_push,
    );

    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
