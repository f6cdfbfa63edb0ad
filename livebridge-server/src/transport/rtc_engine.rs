use crate::error::BridgeResult;
use crate::transport::PeerEvent;
use async_trait::async_trait;
use bytes::Bytes;
use livebridge_core::{IceCandidate, IceServerConfig, IceState, PeerState, SessionDescription};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Negotiated codec of an incoming track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCodec {
    /// e.g. `video/VP8`, `audio/opus`.
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub payload_type: u8,
    pub fmtp: String,
}

impl TrackCodec {
    /// The part after the slash, as used in `a=rtpmap`.
    pub fn encoding_name(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.mime_type)
    }
}

/// A remote media track borrowed from the engine.
#[async_trait]
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> String;

    fn kind(&self) -> MediaKind;

    fn codec(&self) -> TrackCodec;

    fn ssrc(&self) -> u32;

    /// Next RTP packet in wire format, or `None` once the track has ended.
    async fn read_packet(&self) -> Option<Bytes>;

    /// Release the engine-side receiver.
    async fn stop(&self) -> BridgeResult<()>;
}

/// One server-side peer connection.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn set_remote_description(&self, offer: &SessionDescription) -> BridgeResult<()>;

    /// Creates the answer, applies it as the local description and starts
    /// gathering. `PeerEvent::IceGatheringComplete` follows once gathering ends.
    async fn create_answer(&self) -> BridgeResult<SessionDescription>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> BridgeResult<()>;

    /// Ask the sender of `media_ssrc` for a fresh keyframe.
    async fn request_keyframe(&self, media_ssrc: u32) -> BridgeResult<()>;

    fn connection_state(&self) -> PeerState;

    fn ice_connection_state(&self) -> IceState;

    async fn close(&self) -> BridgeResult<()>;
}

/// Capability to create peer connections. Chosen once at startup.
#[async_trait]
pub trait RtcEngine: Send + Sync {
    /// `DependencyUnavailable` when this engine cannot create peers.
    fn check_available(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn create_peer(
        &self,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<PeerEvent>,
    ) -> BridgeResult<Arc<dyn PeerLink>>;
}
