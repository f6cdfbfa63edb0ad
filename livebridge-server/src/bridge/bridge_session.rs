use crate::bridge::{
    BridgeNotifier, SessionCommand, SessionEvent, SessionHandle, SessionMap, ShutdownReason,
    transition,
};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::pipeline::{
    FrameRelay, InputStream, KeyframeRequests, PipelineExit, PipelineInput, PipelineLauncher,
    TranscodePipeline, allocate_port_pair, input_sdp,
};
use crate::transport::{MediaKind, MediaTrack, PeerEvent, PeerLink};
use livebridge_core::{
    BridgeEvent, IceCandidate, IceState, OfferResponse, PeerState, SessionDescription,
    SessionState, StreamStatus,
};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 32;
const EXIT_BUFFER: usize = 4;
const PORT_PAIR_ATTEMPTS: usize = 8;

/// Everything a new session needs from its manager.
pub struct SessionParams {
    pub stream_id: String,
    pub stream_key: String,
    pub session_id: u64,
    pub link: Arc<dyn PeerLink>,
    pub events: mpsc::Receiver<PeerEvent>,
    pub config: Arc<BridgeConfig>,
    pub launcher: Arc<dyn PipelineLauncher>,
    pub sessions: SessionMap,
    pub notifier: BridgeNotifier,
}

/// Actor owning one bridged peer connection, its tracks, relays and
/// transcoder. All mutation happens on the actor task.
pub struct BridgeSession {
    stream_id: String,
    stream_key: String,
    session_id: u64,
    link: Arc<dyn PeerLink>,
    config: Arc<BridgeConfig>,
    launcher: Arc<dyn PipelineLauncher>,
    sessions: SessionMap,
    notifier: BridgeNotifier,

    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::Receiver<PeerEvent>,
    exits_tx: mpsc::Sender<PipelineExit>,
    exits: mpsc::Receiver<PipelineExit>,
    status_tx: watch::Sender<StreamStatus>,

    state: SessionState,
    remote_applied: bool,
    answered: bool,
    pending_remote: Vec<IceCandidate>,
    gathered: Vec<IceCandidate>,
    audio: Option<Arc<dyn MediaTrack>>,
    video: Option<Arc<dyn MediaTrack>>,
    pipeline_started: bool,
    pipeline: Option<TranscodePipeline>,
    relays: Vec<FrameRelay>,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl BridgeSession {
    /// Spawns the actor and returns its handle. The caller registers the
    /// handle before sending `Negotiate`.
    pub fn spawn(params: SessionParams) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (exits_tx, exits) = mpsc::channel(EXIT_BUFFER);
        let (status_tx, status_rx) = watch::channel(StreamStatus {
            stream_id: params.stream_id.clone(),
            stream_key: params.stream_key.clone(),
            state: SessionState::Init,
            connection_state: PeerState::New,
            ice_connection_state: IceState::New,
            has_audio: false,
            has_video: false,
            pipeline_running: false,
        });

        let handle = SessionHandle::new(params.session_id, command_tx, status_rx, params.link.clone());

        let session = BridgeSession {
            stream_id: params.stream_id,
            stream_key: params.stream_key,
            session_id: params.session_id,
            link: params.link,
            config: params.config,
            launcher: params.launcher,
            sessions: params.sessions,
            notifier: params.notifier,
            commands: command_rx,
            events: params.events,
            exits_tx,
            exits,
            status_tx,
            state: SessionState::Init,
            remote_applied: false,
            answered: false,
            pending_remote: Vec::new(),
            gathered: Vec::new(),
            audio: None,
            video: None,
            pipeline_started: false,
            pipeline: None,
            relays: Vec::new(),
            shutdown_waiters: Vec::new(),
        };
        tokio::spawn(session.run());

        handle
    }

    async fn run(mut self) {
        debug!("[{}] Session {} started", self.stream_id, self.session_id);

        while !self.state.is_terminal() {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => self.apply(SessionEvent::CleanupRequested),
                },
                Some(event) = self.events.recv() => self.handle_peer_event(event).await,
                Some(exit) = self.exits.recv() => self.handle_pipeline_exit(exit),
            }
        }

        self.teardown().await;
    }

    fn apply(&mut self, event: SessionEvent) {
        let next = transition(self.state, event);
        if next != self.state {
            info!("[{}] {} -> {} ({:?})", self.stream_id, self.state, next, event);
            self.state = next;
            self.publish_status();
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(StreamStatus {
            stream_id: self.stream_id.clone(),
            stream_key: self.stream_key.clone(),
            state: self.state,
            connection_state: self.link.connection_state(),
            ice_connection_state: self.link.ice_connection_state(),
            has_audio: self.audio.is_some(),
            has_video: self.video.is_some(),
            pipeline_running: self.pipeline.as_ref().is_some_and(TranscodePipeline::is_running),
        });
    }

    fn notify(&self, event: BridgeEvent) {
        self.notifier.publish(&self.stream_id, event);
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Negotiate { offer, reply } if !self.remote_applied => {
                let result = self.negotiate(offer).await;
                if let Err(e) = &result {
                    warn!("[{}] Negotiation failed: {}", self.stream_id, e);
                    self.apply(SessionEvent::NegotiationFailed);
                }
                let _ = reply.send(result);
            }
            other => self.handle_side_command(other).await,
        }
    }

    /// Everything but a first offer. Also served while negotiating.
    async fn handle_side_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Negotiate { reply, .. } => {
                let _ = reply.send(Err(BridgeError::Validation(
                    "stream already has a negotiation in progress or done".to_owned(),
                )));
            }
            SessionCommand::AddIceCandidate { candidate, reply } => {
                let _ = reply.send(self.add_remote_candidate(candidate).await);
            }
            SessionCommand::Shutdown { reason, reply } => {
                self.shutdown_waiters.push(reply);
                self.apply(match reason {
                    ShutdownReason::Requested => SessionEvent::CleanupRequested,
                    ShutdownReason::Replaced => SessionEvent::Replaced,
                });
            }
        }
    }

    async fn negotiate(&mut self, offer: SessionDescription) -> BridgeResult<OfferResponse> {
        self.apply(SessionEvent::OfferReceived);

        self.link.set_remote_description(&offer).await?;
        self.remote_applied = true;

        for candidate in std::mem::take(&mut self.pending_remote) {
            if let Err(e) = self.link.add_ice_candidate(candidate).await {
                warn!("[{}] Dropping buffered candidate: {}", self.stream_id, e);
            }
        }

        let answer = self.link.create_answer().await?;
        self.await_gathering().await;
        self.answered = true;

        if self.state.is_terminal() {
            return Err(BridgeError::Negotiation(format!(
                "session {} while negotiating",
                self.state
            )));
        }
        self.apply(SessionEvent::NegotiationDone);

        let ice_candidates = std::mem::take(&mut self.gathered);
        info!(
            "[{}] Answer ready with {} candidates",
            self.stream_id,
            ice_candidates.len()
        );
        Ok(OfferResponse {
            answer,
            ice_candidates,
        })
    }

    /// Waits for local ICE gathering to finish, bounded by the configured
    /// timeout. Peer events and side commands keep flowing meanwhile.
    async fn await_gathering(&mut self) {
        let deadline = tokio::time::sleep(self.config.ice_gather_timeout);
        tokio::pin!(deadline);

        while !self.state.is_terminal() {
            tokio::select! {
                _ = &mut deadline => {
                    debug!(
                        "[{}] ICE gathering not done after {:?}, answering with {} candidates",
                        self.stream_id,
                        self.config.ice_gather_timeout,
                        self.gathered.len()
                    );
                    break;
                }
                event = self.events.recv() => match event {
                    Some(PeerEvent::IceGatheringComplete) | None => {
                        debug!("[{}] ICE gathering complete", self.stream_id);
                        break;
                    }
                    Some(event) => self.handle_peer_event(event).await,
                },
                Some(command) = self.commands.recv() => self.handle_side_command(command).await,
                Some(exit) = self.exits.recv() => self.handle_pipeline_exit(exit),
            }
        }
    }

    async fn add_remote_candidate(&mut self, candidate: IceCandidate) -> BridgeResult<()> {
        if !self.remote_applied {
            debug!("[{}] Buffering early remote candidate", self.stream_id);
            self.pending_remote.push(candidate);
            return Ok(());
        }
        self.link.add_ice_candidate(candidate).await
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::IceCandidate(candidate) => {
                if self.answered {
                    self.notify(BridgeEvent::IceCandidate { candidate });
                } else {
                    self.gathered.push(candidate);
                }
            }
            PeerEvent::IceGatheringComplete => {}
            PeerEvent::ConnectionState(state) => {
                info!("[{}] Peer connection {:?}", self.stream_id, state);
                self.publish_status();
                if state == PeerState::Connected {
                    self.notify(BridgeEvent::Connected);
                }
                if state.is_terminal() {
                    self.apply(SessionEvent::PeerTerminal(state));
                }
            }
            PeerEvent::Track(track) => self.handle_track(track).await,
        }
    }

    async fn handle_track(&mut self, track: Arc<dyn MediaTrack>) {
        let kind = track.kind();
        let slot = match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        };
        if slot.is_some() {
            warn!("[{}] Ignoring extra {} track {}", self.stream_id, kind, track.id());
            return;
        }
        info!("[{}] Received {} track {} ({})", self.stream_id, kind, track.id(), track.codec().mime_type);
        *slot = Some(track);
        self.publish_status();

        self.maybe_start_pipeline().await;
    }

    async fn maybe_start_pipeline(&mut self) {
        if self.pipeline_started {
            return;
        }
        let (Some(audio), Some(video)) = (self.audio.clone(), self.video.clone()) else {
            return;
        };
        self.pipeline_started = true;

        match self.launch(audio, video).await {
            Ok(()) => {
                self.apply(SessionEvent::PipelineStarted);
                self.notify(BridgeEvent::PipelineStarted);
            }
            Err(e) => {
                error!("[{}] Could not start pipeline: {}", self.stream_id, e);
                self.apply(SessionEvent::PipelineFailed);
            }
        }
        self.publish_status();
    }

    async fn launch(
        &mut self,
        audio: Arc<dyn MediaTrack>,
        video: Arc<dyn MediaTrack>,
    ) -> BridgeResult<()> {
        let (audio_port, video_port) = allocate_input_ports()?;
        let sdp = input_sdp(&[
            InputStream {
                kind: MediaKind::Audio,
                codec: audio.codec(),
                port: audio_port,
            },
            InputStream {
                kind: MediaKind::Video,
                codec: video.codec(),
                port: video_port,
            },
        ]);

        let command = self.launcher.command(&PipelineInput {
            sdp,
            target_url: self.config.publish_url(&self.stream_key),
        });
        let pipeline =
            TranscodePipeline::start(command, self.stream_id.clone(), self.exits_tx.clone()).await?;
        self.pipeline = Some(pipeline);

        self.relays.push(
            FrameRelay::start(
                format!("{}/audio", self.stream_id),
                audio,
                SocketAddr::from((Ipv4Addr::LOCALHOST, audio_port)),
                None,
            )
            .await?,
        );
        self.relays.push(
            FrameRelay::start(
                format!("{}/video", self.stream_id),
                video,
                SocketAddr::from((Ipv4Addr::LOCALHOST, video_port)),
                Some(KeyframeRequests {
                    link: self.link.clone(),
                    interval: self.config.keyframe_interval,
                }),
            )
            .await?,
        );

        Ok(())
    }

    fn handle_pipeline_exit(&mut self, exit: PipelineExit) {
        self.notify(BridgeEvent::PipelineExited { code: exit.code });
        if exit.is_failure() {
            self.apply(SessionEvent::PipelineFailed);
        } else {
            info!("[{}] Pipeline ended without error, session stays up", self.stream_id);
        }
        self.publish_status();
    }

    /// Runs once, when the actor leaves its loop.
    async fn teardown(&mut self) {
        let session_id = self.session_id;
        self.sessions
            .remove_if(&self.stream_id, |_, handle| handle.session_id() == session_id);

        info!("[{}] Tearing down session {} ({})", self.stream_id, session_id, self.state);

        if let Err(e) = self.link.close().await {
            warn!("[{}] Error closing peer connection: {}", self.stream_id, e);
        }

        for relay in &mut self.relays {
            relay.stop();
        }

        if let Some(mut pipeline) = self.pipeline.take() {
            match pipeline.terminate(self.config.kill_grace_period).await {
                Some(exit) => debug!("[{}] Pipeline stopped ({:?})", self.stream_id, exit.code),
                None => warn!("[{}] Pipeline exit status unknown", self.stream_id),
            }
        }

        for track in [self.audio.take(), self.video.take()].into_iter().flatten() {
            if let Err(e) = track.stop().await {
                warn!("[{}] Error stopping {} track: {}", self.stream_id, track.kind(), e);
            }
        }

        self.publish_status();
        self.notify(BridgeEvent::Cleaned);
        info!("[{}] Session {} cleaned up", self.stream_id, session_id);

        for waiter in self.shutdown_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}

/// Two non-overlapping RTP/RTCP port pairs for audio and video.
fn allocate_input_ports() -> io::Result<(u16, u16)> {
    let audio = allocate_port_pair()?;
    for _ in 0..PORT_PAIR_ATTEMPTS {
        let video = allocate_port_pair()?;
        if video.abs_diff(audio) > 1 {
            return Ok((audio, video));
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AddrInUse,
        "could not find separate ports for audio and video",
    ))
}
