use async_trait::async_trait;
use bytes::Bytes;
use livebridge_core::{IceCandidate, IceServerConfig, IceState, PeerState, SessionDescription};
use livebridge_server::error::{BridgeError, BridgeResult};
use livebridge_server::transport::{
    MediaKind, MediaTrack, PeerEvent, PeerLink, RtcEngine, TrackCodec,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const FAKE_ANSWER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=fake\r\nt=0 0\r\n";

/// How fake peers behave during negotiation.
#[derive(Clone, Debug)]
pub struct PeerScript {
    /// Local candidates emitted right after the answer is created.
    pub local_candidates: Vec<IceCandidate>,
    /// Whether gathering ever reports completion.
    pub complete_gathering: bool,
    /// Delay before candidates (and completion) are emitted.
    pub gather_delay: Duration,
    pub reject_offer: bool,
}

impl Default for PeerScript {
    fn default() -> Self {
        Self {
            local_candidates: vec![candidate("candidate:1 1 udp 2130706431 10.0.0.1 50000 typ host")],
            complete_gathering: true,
            gather_delay: Duration::from_millis(10),
            reject_offer: false,
        }
    }
}

pub fn candidate(line: &str) -> IceCandidate {
    IceCandidate {
        candidate: line.to_owned(),
        sdp_mid: Some("0".to_owned()),
        sdp_mline_index: Some(0),
        username_fragment: None,
    }
}

/// Engine handing out scriptable in-memory peers.
pub struct FakeEngine {
    script: PeerScript,
    peers: Mutex<Vec<Arc<FakePeer>>>,
}

impl FakeEngine {
    pub fn new(script: PeerScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            peers: Mutex::new(Vec::new()),
        })
    }

    pub fn peers(&self) -> Vec<Arc<FakePeer>> {
        self.peers.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn peer(&self, index: usize) -> Arc<FakePeer> {
        self.peers()[index].clone()
    }
}

#[async_trait]
impl RtcEngine for FakeEngine {
    async fn create_peer(
        &self,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<PeerEvent>,
    ) -> BridgeResult<Arc<dyn PeerLink>> {
        let peer = Arc::new(FakePeer {
            script: self.script.clone(),
            ice_servers: ice_servers.to_vec(),
            events,
            state: Mutex::new(PeerState::New),
            remote_candidates: Mutex::new(Vec::new()),
            remote_offer: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
            keyframe_requests: AtomicUsize::new(0),
            tracks: Mutex::new(Vec::new()),
        });
        self.peers.lock().unwrap().push(peer.clone());
        Ok(peer)
    }
}

pub struct FakePeer {
    script: PeerScript,
    pub ice_servers: Vec<IceServerConfig>,
    events: mpsc::Sender<PeerEvent>,
    state: Mutex<PeerState>,
    remote_candidates: Mutex<Vec<IceCandidate>>,
    remote_offer: Mutex<Option<SessionDescription>>,
    close_calls: AtomicUsize,
    keyframe_requests: AtomicUsize,
    tracks: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakePeer {
    pub async fn emit(&self, event: PeerEvent) {
        let _ = self.events.send(event).await;
    }

    /// Changes the connection state and reports it like a real engine would.
    pub async fn set_state(&self, state: PeerState) {
        *self.state.lock().unwrap() = state;
        self.emit(PeerEvent::ConnectionState(state)).await;
    }

    /// Starts a remote track of `kind` and returns it.
    pub async fn add_track(&self, kind: MediaKind) -> Arc<FakeTrack> {
        let track = Arc::new(FakeTrack::new(kind));
        self.tracks.lock().unwrap().push(track.clone());
        self.emit(PeerEvent::Track(track.clone())).await;
        track
    }

    pub fn remote_candidates(&self) -> Vec<IceCandidate> {
        self.remote_candidates.lock().unwrap().clone()
    }

    pub fn remote_offer(&self) -> Option<SessionDescription> {
        self.remote_offer.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn keyframe_requests(&self) -> usize {
        self.keyframe_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerLink for FakePeer {
    async fn set_remote_description(&self, offer: &SessionDescription) -> BridgeResult<()> {
        if self.script.reject_offer {
            return Err(BridgeError::Negotiation("fake peer rejects offers".into()));
        }
        *self.remote_offer.lock().unwrap() = Some(offer.clone());
        Ok(())
    }

    async fn create_answer(&self) -> BridgeResult<SessionDescription> {
        let events = self.events.clone();
        let script = self.script.clone();
        tokio::spawn(async move {
            tokio::time::sleep(script.gather_delay).await;
            for candidate in script.local_candidates {
                let _ = events.send(PeerEvent::IceCandidate(candidate)).await;
            }
            if script.complete_gathering {
                let _ = events.send(PeerEvent::IceGatheringComplete).await;
            }
        });
        Ok(SessionDescription::answer(FAKE_ANSWER_SDP))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> BridgeResult<()> {
        if !candidate.candidate.starts_with("candidate:") {
            return Err(BridgeError::Validation(format!(
                "invalid ICE candidate: {}",
                candidate.candidate
            )));
        }
        self.remote_candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn request_keyframe(&self, _media_ssrc: u32) -> BridgeResult<()> {
        self.keyframe_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn connection_state(&self) -> PeerState {
        *self.state.lock().unwrap()
    }

    fn ice_connection_state(&self) -> IceState {
        match self.connection_state() {
            PeerState::Connected => IceState::Connected,
            PeerState::Failed => IceState::Failed,
            PeerState::Closed => IceState::Closed,
            _ => IceState::New,
        }
    }

    async fn close(&self) -> BridgeResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = PeerState::Closed;
        Ok(())
    }
}

/// A track that never produces packets.
pub struct FakeTrack {
    kind: MediaKind,
    stop_calls: AtomicUsize,
}

impl FakeTrack {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTrack for FakeTrack {
    fn id(&self) -> String {
        format!("fake-{}", self.kind)
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn codec(&self) -> TrackCodec {
        match self.kind {
            MediaKind::Audio => TrackCodec {
                mime_type: "audio/opus".into(),
                clock_rate: 48000,
                channels: 2,
                payload_type: 111,
                fmtp: "minptime=10;useinbandfec=1".into(),
            },
            MediaKind::Video => TrackCodec {
                mime_type: "video/VP8".into(),
                clock_rate: 90000,
                channels: 0,
                payload_type: 96,
                fmtp: String::new(),
            },
        }
    }

    fn ssrc(&self) -> u32 {
        match self.kind {
            MediaKind::Audio => 1111,
            MediaKind::Video => 2222,
        }
    }

    async fn read_packet(&self) -> Option<Bytes> {
        std::future::pending().await
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
