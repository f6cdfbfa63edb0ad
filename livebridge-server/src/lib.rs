pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod room;
pub mod signaling;
pub mod transport;

pub use app::{AppState, app_router};
pub use bridge::BridgeManager;
pub use config::{BridgeConfig, ServerConfig};
pub use error::{BridgeError, BridgeResult, SignalingError};
pub use pipeline::{EncodingProfile, FfmpegLauncher, PipelineLauncher};
pub use transport::{RtcEngine, select_engine};
