mod bridge;
mod connection;
mod room;
mod signaling;

pub use bridge::{
    BridgeEvent, BridgeNotification, BridgeStats, IceCandidate, IceCandidateRequest, IceState,
    OfferRequest, OfferResponse, PeerState, SessionDescription, SessionState, StreamStatus,
    SuccessResponse,
};
pub use connection::ConnectionId;
pub use room::{Participant, Role, RoomUser};
pub use signaling::{
    ClientSignal, Envelope, Forwarded, IceServerConfig, JoinAck, JoinRoom, LeaveRoom,
    PeerConnectionReport, ServerSignal, SignalError, StreamTypeNotice, UserLeft,
};
