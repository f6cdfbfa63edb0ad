use crate::error::SignalingError;
use crate::room::{Departure, RoomRegistry};
use crate::signaling::SignalingOutput;
use livebridge_core::{
    ConnectionId, Forwarded, Participant, Role, RoomUser, ServerSignal, UserLeft,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Kinds of negotiation payload the relay forwards without interpreting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    IceCandidate,
    StreamType,
    PeerConnectionState,
}

impl RelayKind {
    fn wrap(self, forwarded: Forwarded) -> ServerSignal {
        match self {
            RelayKind::Offer => ServerSignal::Offer(forwarded),
            RelayKind::Answer => ServerSignal::Answer(forwarded),
            RelayKind::IceCandidate => ServerSignal::IceCandidate(forwarded),
            RelayKind::StreamType => ServerSignal::StreamType(forwarded),
            RelayKind::PeerConnectionState => ServerSignal::PeerConnectionState(forwarded),
        }
    }
}

/// Room membership plus point-to-point forwarding of negotiation messages.
#[derive(Clone)]
pub struct SignalingRelay {
    registry: RoomRegistry,
    output: Arc<dyn SignalingOutput>,
}

impl SignalingRelay {
    pub fn new(output: Arc<dyn SignalingOutput>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            output,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Registers the connection in `room_id` and returns who was already there.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        room_id: &str,
        user_id: &str,
        user_type: &str,
    ) -> Result<Vec<RoomUser>, SignalingError> {
        let room_id = required("roomId", room_id)?;
        let user_id = required("userId", user_id)?;
        let role: Role = required("userType", user_type)?
            .parse()
            .map_err(SignalingError::Validation)?;

        let participant = Participant {
            connection_id,
            room_id: room_id.to_owned(),
            user_id: user_id.to_owned(),
            role,
        };

        let outcome = self.registry.join(participant.clone());

        if let Some(departure) = outcome.moved_from {
            self.announce_departure(departure).await;
        }

        if outcome.newly_joined {
            info!("User '{}' joined room '{}' as {}", user_id, room_id, role);
            let joined = ServerSignal::UserJoined(participant.as_room_user());
            for other in &outcome.others {
                self.output.deliver(other.connection_id, joined.clone()).await;
            }
        }

        Ok(outcome.others.iter().map(Participant::as_room_user).collect())
    }

    /// Forwards `payload` to `target_user_id` in `room_id`. Returns whether a
    /// target was found; nothing is reported back to the sender either way.
    pub async fn relay(
        &self,
        kind: RelayKind,
        sender: ConnectionId,
        target_user_id: &str,
        room_id: &str,
        payload: Value,
    ) -> bool {
        let Some(sender) = self.registry.participant(&sender) else {
            warn!("Dropping {:?} from unregistered connection {}", kind, sender);
            return false;
        };

        let Some(target) = self.registry.find_user(room_id, target_user_id) else {
            debug!(
                "Dropping {:?} from '{}': '{}' is not in room '{}'",
                kind, sender.user_id, target_user_id, room_id
            );
            return false;
        };

        let signal = kind.wrap(Forwarded {
            payload,
            sender_id: sender.user_id,
        });
        self.output.deliver(target.connection_id, signal).await;
        true
    }

    /// Sends the sender's stream type to every other member of the room.
    pub async fn broadcast_stream_type(
        &self,
        sender: ConnectionId,
        room_id: &str,
        stream_type: Value,
    ) -> usize {
        let Some(participant) = self.registry.participant(&sender) else {
            warn!("Dropping stream-type from unregistered connection {}", sender);
            return 0;
        };

        let signal = ServerSignal::StreamType(Forwarded {
            payload: stream_type,
            sender_id: participant.user_id,
        });

        let recipients: Vec<_> = self
            .registry
            .members(room_id)
            .into_iter()
            .filter(|p| p.connection_id != sender)
            .collect();

        for recipient in &recipients {
            self.output
                .deliver(recipient.connection_id, signal.clone())
                .await;
        }
        recipients.len()
    }

    pub async fn leave(&self, connection_id: ConnectionId, room_id: &str) {
        if let Some(departure) = self.registry.remove(&connection_id, Some(room_id)) {
            self.announce_departure(departure).await;
        }
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) {
        if let Some(departure) = self.registry.remove(&connection_id, None) {
            self.announce_departure(departure).await;
        }
    }

    async fn announce_departure(&self, departure: Departure) {
        let Departure {
            participant,
            remaining,
        } = departure;

        info!(
            "User '{}' left room '{}' ({} remaining)",
            participant.user_id,
            participant.room_id,
            remaining.len()
        );

        let left = ServerSignal::UserLeft(UserLeft {
            user_id: participant.user_id,
        });
        for member in remaining {
            self.output.deliver(member.connection_id, left.clone()).await;
        }
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, SignalingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SignalingError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}
