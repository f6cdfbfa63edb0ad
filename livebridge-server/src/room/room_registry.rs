use crate::room::Room;
use dashmap::DashMap;
use livebridge_core::{ConnectionId, Participant};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A participant that just left, plus who is still in its room.
#[derive(Debug, Clone)]
pub struct Departure {
    pub participant: Participant,
    pub remaining: Vec<Participant>,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Members that were already in the room, in join order.
    pub others: Vec<Participant>,
    /// `false` when the connection was already a member of this room.
    pub newly_joined: bool,
    /// Set when the connection moved here from another room.
    pub moved_from: Option<Departure>,
}

/// Rooms and participants, keyed by room id and connection id.
///
/// Every method is synchronous: no registry update ever spans an `.await`.
/// Rooms are created on first join and dropped once the last member leaves.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<String, Room>>,
    participants: Arc<DashMap<ConnectionId, Participant>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, participant: Participant) -> JoinOutcome {
        let connection_id = participant.connection_id;

        let moved_from = match self.participant(&connection_id) {
            Some(existing) if existing.room_id == participant.room_id => {
                let others = self
                    .rooms
                    .get(&participant.room_id)
                    .map(|room| room.others(&connection_id))
                    .unwrap_or_default();
                return JoinOutcome {
                    others,
                    newly_joined: false,
                    moved_from: None,
                };
            }
            Some(existing) => self.remove(&connection_id, Some(&existing.room_id)),
            None => None,
        };

        self.participants.insert(connection_id, participant.clone());

        let others = {
            let mut room = self
                .rooms
                .entry(participant.room_id.clone())
                .or_insert_with(|| {
                    info!("Creating new room: {}", participant.room_id);
                    Room::new(participant.room_id.clone())
                });

            if room.find_user(&participant.user_id).is_some() {
                warn!(
                    "User '{}' joined room '{}' from a second connection; relay keeps the first",
                    participant.user_id, participant.room_id
                );
            }

            let others = room.others(&connection_id);
            room.add(participant.clone());
            others
        };

        debug!(
            "{:?} joined room '{}' as '{}' ({} already present)",
            connection_id,
            participant.room_id,
            participant.user_id,
            others.len()
        );

        JoinOutcome {
            others,
            newly_joined: true,
            moved_from,
        }
    }

    /// Removes the participant record and its room membership.
    ///
    /// With `room_id` set, nothing happens unless the participant is in that room.
    /// Only one of several concurrent callers gets `Some`.
    pub fn remove(&self, connection_id: &ConnectionId, room_id: Option<&str>) -> Option<Departure> {
        let (_, participant) = self
            .participants
            .remove_if(connection_id, |_, p| room_id.is_none_or(|r| p.room_id == r))?;

        let remaining = match self.rooms.get_mut(&participant.room_id) {
            Some(mut room) => {
                room.remove(connection_id);
                room.participants().to_vec()
            }
            None => Vec::new(),
        };

        if let Some((_, room)) = self
            .rooms
            .remove_if(&participant.room_id, |_, room| room.is_empty())
        {
            info!("Room '{}' is empty, removing it", room.id());
        }

        Some(Departure {
            participant,
            remaining,
        })
    }

    pub fn participant(&self, connection_id: &ConnectionId) -> Option<Participant> {
        self.participants.get(connection_id).map(|p| p.clone())
    }

    /// First participant in `room_id` registered as `user_id`.
    pub fn find_user(&self, room_id: &str, user_id: &str) -> Option<Participant> {
        let room = self.rooms.get(room_id)?;
        room.find_user(user_id).cloned()
    }

    pub fn members(&self, room_id: &str) -> Vec<Participant> {
        self.rooms
            .get(room_id)
            .map(|room| room.participants().to_vec())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
