use livebridge_core::{IceServerConfig, TurnServerConfig, resolve_ice_servers};
use std::time::Duration;

pub const DEFAULT_PUBLISH_BASE_URL: &str = "rtmp://a.rtmp.youtube.com/live2";
pub const DEFAULT_ICE_GATHER_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_KILL_GRACE_PERIOD: Duration = Duration::from_millis(5000);
pub const DEFAULT_KEYFRAME_INTERVAL: Duration = Duration::from_secs(3);

/// Settings shared by every bridge session.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// RTMP ingest base; the stream key is appended as the last path segment.
    pub publish_base_url: String,
    /// Empty means the built-in STUN defaults.
    pub stun_servers: Vec<String>,
    pub turn_servers: Vec<TurnServerConfig>,
    /// Upper bound on waiting for ICE gathering before answering an offer.
    pub ice_gather_timeout: Duration,
    /// Time the transcoder gets to exit after SIGTERM before it is killed.
    pub kill_grace_period: Duration,
    /// How often a keyframe is requested from the browser while relaying video.
    pub keyframe_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            publish_base_url: DEFAULT_PUBLISH_BASE_URL.to_owned(),
            stun_servers: Vec::new(),
            turn_servers: Vec::new(),
            ice_gather_timeout: DEFAULT_ICE_GATHER_TIMEOUT,
            kill_grace_period: DEFAULT_KILL_GRACE_PERIOD,
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
        }
    }
}

impl BridgeConfig {
    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        resolve_ice_servers(&self.stun_servers, &self.turn_servers)
    }

    pub fn publish_url(&self, stream_key: &str) -> String {
        format!("{}/{}", self.publish_base_url.trim_end_matches('/'), stream_key)
    }
}
