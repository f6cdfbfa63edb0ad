use crate::model::room::RoomUser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinRoom {
    pub room_id: String,
    pub user_id: String,
    pub user_type: String,
}

/// Point-to-point negotiation message (offer, answer, ice-candidate).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    pub payload: Value,
    pub target_user_id: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamTypeNotice {
    pub stream_type: Value,
    pub room_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerConnectionReport {
    pub user_id: String,
    pub target_user_id: String,
    pub room_id: String,
    pub connection_state: Value,
    pub ice_connection_state: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaveRoom {
    pub room_id: String,
}

/// Frames a client sends over the signaling socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientSignal {
    JoinRoom(JoinRoom),
    Offer(Envelope),
    Answer(Envelope),
    IceCandidate(Envelope),
    StreamType(StreamTypeNotice),
    PeerConnectionState(PeerConnectionReport),
    LeaveRoom(LeaveRoom),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JoinAck {
    pub fn joined(room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            success: true,
            room_id: Some(room_id.into()),
            user_id: Some(user_id.into()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            room_id: None,
            user_id: None,
            error: Some(error.into()),
        }
    }
}

/// A relayed payload, annotated with the sender's user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forwarded {
    pub payload: Value,
    pub sender_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeft {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalError {
    pub message: String,
}

/// Frames the server sends over the signaling socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerSignal {
    JoinRoomAck(JoinAck),
    RoomUsers(Vec<RoomUser>),
    UserJoined(RoomUser),
    UserLeft(UserLeft),
    Offer(Forwarded),
    Answer(Forwarded),
    IceCandidate(Forwarded),
    StreamType(Forwarded),
    PeerConnectionState(Forwarded),
    Error(SignalError),
}
