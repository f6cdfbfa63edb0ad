use livebridge_core::{PeerState, SessionState};

/// Inputs that move a bridge session through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    OfferReceived,
    /// Answer created and the bounded ICE wait is over.
    NegotiationDone,
    NegotiationFailed,
    /// Both tracks arrived and the transcoder is running.
    PipelineStarted,
    /// Spawn failure or a non-zero exit code.
    PipelineFailed,
    PeerTerminal(PeerState),
    CleanupRequested,
    /// A newer offer for the same stream took over.
    Replaced,
}

/// Pure lifecycle transition. Terminal states absorb every event.
pub fn transition(state: SessionState, event: SessionEvent) -> SessionState {
    use SessionState::*;

    if state.is_terminal() {
        return state;
    }

    match event {
        SessionEvent::OfferReceived => match state {
            Init => Negotiating,
            other => other,
        },
        SessionEvent::NegotiationDone => match state {
            Negotiating => WaitingTracks,
            other => other,
        },
        SessionEvent::PipelineStarted => Streaming,
        SessionEvent::NegotiationFailed | SessionEvent::PipelineFailed => Failed,
        SessionEvent::PeerTerminal(PeerState::Closed) => Closed,
        SessionEvent::PeerTerminal(PeerState::Failed | PeerState::Disconnected) => Failed,
        SessionEvent::PeerTerminal(_) => state,
        SessionEvent::CleanupRequested | SessionEvent::Replaced => Closed,
    }
}
