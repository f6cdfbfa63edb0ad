use crate::model::connection::ConnectionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a participant announced when joining a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Broadcaster,
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Broadcaster => write!(f, "broadcaster"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "broadcaster" => Ok(Role::Broadcaster),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}

/// A registered signaling participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub room_id: String,
    pub user_id: String,
    pub role: Role,
}

impl Participant {
    /// Public view of the participant, as sent to other room members.
    pub fn as_room_user(&self) -> RoomUser {
        RoomUser {
            user_id: self.user_id.clone(),
            user_type: self.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub user_id: String,
    pub user_type: Role,
}
