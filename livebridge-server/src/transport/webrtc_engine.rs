use crate::error::{BridgeError, BridgeResult};
use crate::transport::{MediaKind, MediaTrack, PeerEvent, PeerLink, RtcEngine, TrackCodec};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use livebridge_core::{IceCandidate, IceServerConfig, IceState, PeerState, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_remote::TrackRemote;
use webrtc::util::Marshal;

/// Engine backed by the `webrtc` crate. The API object (codecs and
/// interceptors) is built once and shared by every peer connection.
pub struct WebRtcEngine {
    api: API,
}

impl WebRtcEngine {
    pub fn new() -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .context("Failed to register default codecs")?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .context("Failed to register interceptors")?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api })
    }
}

#[async_trait]
impl RtcEngine for WebRtcEngine {
    async fn create_peer(
        &self,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<PeerEvent>,
    ) -> BridgeResult<Arc<dyn PeerLink>> {
        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            self.api
                .new_peer_connection(rtc_config)
                .await
                .map_err(|e| BridgeError::Internal(format!("failed to create peer connection: {e}")))?,
        );

        let peer = WebRtcPeer {
            peer_connection,
            events,
        };
        peer.wire_callbacks();

        Ok(Arc::new(peer))
    }
}

pub struct WebRtcPeer {
    peer_connection: Arc<RTCPeerConnection>,
    events: mpsc::Sender<PeerEvent>,
}

impl WebRtcPeer {
    fn wire_callbacks(&self) {
        let state_tx = self.events.clone();
        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("Peer connection state changed: {}", s);
                    let _ = tx.send(PeerEvent::ConnectionState(peer_state(s))).await;
                })
            }));

        let ice_tx = self.events.clone();
        self.peer_connection
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let tx = ice_tx.clone();
                Box::pin(async move {
                    let Some(candidate) = c else { return };
                    let Ok(init) = candidate.to_json() else {
                        return;
                    };
                    let candidate = IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                        username_fragment: init.username_fragment,
                    };
                    let _ = tx.send(PeerEvent::IceCandidate(candidate)).await;
                })
            }));

        let track_tx = self.events.clone();
        self.peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, receiver: Arc<RTCRtpReceiver>, _transceiver| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => MediaKind::Audio,
                        RTPCodecType::Video => MediaKind::Video,
                        other => {
                            warn!("Ignoring track {} of unsupported kind {}", track.id(), other);
                            return;
                        }
                    };
                    debug!("Remote {} track {} (ssrc {})", kind, track.id(), track.ssrc());
                    let remote = RemoteTrack {
                        kind,
                        track,
                        receiver,
                    };
                    let _ = tx.send(PeerEvent::Track(Arc::new(remote))).await;
                })
            },
        ));
    }

    async fn answer(&self) -> Result<RTCSessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;

        let mut gathering_complete = self.peer_connection.gathering_complete_promise().await;

        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;

        let tx = self.events.clone();
        tokio::spawn(async move {
            if gathering_complete.recv().await.is_some() {
                let _ = tx.send(PeerEvent::IceGatheringComplete).await;
            }
        });

        Ok(self
            .peer_connection
            .local_description()
            .await
            .unwrap_or(answer))
    }
}

#[async_trait]
impl PeerLink for WebRtcPeer {
    async fn set_remote_description(&self, offer: &SessionDescription) -> BridgeResult<()> {
        let desc = RTCSessionDescription::offer(offer.sdp.clone())
            .map_err(|e| BridgeError::Negotiation(format!("invalid offer: {e}")))?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(|e| BridgeError::Negotiation(format!("failed to apply offer: {e}")))
    }

    async fn create_answer(&self) -> BridgeResult<SessionDescription> {
        let answer = self
            .answer()
            .await
            .map_err(|e| BridgeError::Negotiation(format!("{e:#}")))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> BridgeResult<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| BridgeError::Validation(format!("invalid ICE candidate: {e}")))
    }

    async fn request_keyframe(&self, media_ssrc: u32) -> BridgeResult<()> {
        self.peer_connection
            .write_rtcp(&[Box::new(PictureLossIndication {
                sender_ssrc: 0,
                media_ssrc,
            })])
            .await
            .map(|_| ())
            .map_err(|e| BridgeError::Internal(format!("failed to send PLI: {e}")))
    }

    fn connection_state(&self) -> PeerState {
        peer_state(self.peer_connection.connection_state())
    }

    fn ice_connection_state(&self) -> IceState {
        match self.peer_connection.ice_connection_state() {
            RTCIceConnectionState::Checking => IceState::Checking,
            RTCIceConnectionState::Connected => IceState::Connected,
            RTCIceConnectionState::Completed => IceState::Completed,
            RTCIceConnectionState::Disconnected => IceState::Disconnected,
            RTCIceConnectionState::Failed => IceState::Failed,
            RTCIceConnectionState::Closed => IceState::Closed,
            _ => IceState::New,
        }
    }

    async fn close(&self) -> BridgeResult<()> {
        self.peer_connection
            .close()
            .await
            .map_err(|e| BridgeError::Internal(format!("failed to close peer connection: {e}")))
    }
}

fn peer_state(state: RTCPeerConnectionState) -> PeerState {
    match state {
        RTCPeerConnectionState::Connecting => PeerState::Connecting,
        RTCPeerConnectionState::Connected => PeerState::Connected,
        RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
        RTCPeerConnectionState::Failed => PeerState::Failed,
        RTCPeerConnectionState::Closed => PeerState::Closed,
        _ => PeerState::New,
    }
}

struct RemoteTrack {
    kind: MediaKind,
    track: Arc<TrackRemote>,
    receiver: Arc<RTCRtpReceiver>,
}

#[async_trait]
impl MediaTrack for RemoteTrack {
    fn id(&self) -> String {
        self.track.id()
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn codec(&self) -> TrackCodec {
        let params = self.track.codec();
        TrackCodec {
            mime_type: params.capability.mime_type,
            clock_rate: params.capability.clock_rate,
            channels: params.capability.channels,
            payload_type: params.payload_type,
            fmtp: params.capability.sdp_fmtp_line,
        }
    }

    fn ssrc(&self) -> u32 {
        self.track.ssrc()
    }

    async fn read_packet(&self) -> Option<Bytes> {
        loop {
            match self.track.read_rtp().await {
                Ok((packet, _)) => match packet.marshal() {
                    Ok(bytes) => return Some(bytes),
                    Err(e) => warn!("Dropping unmarshalable RTP packet: {}", e),
                },
                Err(e) => {
                    debug!("Track {} ended: {}", self.track.id(), e);
                    return None;
                }
            }
        }
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.receiver
            .stop()
            .await
            .map_err(|e| BridgeError::Internal(format!("failed to stop receiver: {e}")))
    }
}
