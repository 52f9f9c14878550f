//! Application State
//!
//! HTTP handler 共享的应用状态，持有所有端口与服务

use std::sync::Arc;

use crate::application::cluster::{DesiredSessions, DiscoveryService};
use crate::application::ports::{SessionRegistryPort, VoiceGatewayPort};
use crate::application::speech::{PlaybackQueues, PlaybackSettings};

/// 应用状态
pub struct AppState {
    pub discovery: Arc<DiscoveryService>,
    pub registry: Arc<dyn SessionRegistryPort>,
    pub queues: Arc<PlaybackQueues>,
    pub gateway: Arc<dyn VoiceGatewayPort>,
    pub desired: Arc<DesiredSessions>,
    /// join 时为新会话构造播放控制器的参数
    pub playback_settings: PlaybackSettings,
    /// 是否接受对等节点推送的状态文档
    pub accept_push: bool,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        discovery: Arc<DiscoveryService>,
        registry: Arc<dyn SessionRegistryPort>,
        queues: Arc<PlaybackQueues>,
        gateway: Arc<dyn VoiceGatewayPort>,
        desired: Arc<DesiredSessions>,
        playback_settings: PlaybackSettings,
        accept_push: bool,
    ) -> Self {
        Self {
            discovery,
            registry,
            queues,
            gateway,
            desired,
            playback_settings,
            accept_push,
        }
    }
}
