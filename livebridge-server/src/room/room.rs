use livebridge_core::{ConnectionId, Participant};

/// Ordered membership of one signaling room.
#[derive(Debug, Clone)]
pub struct Room {
    id: String,
    participants: Vec<Participant>,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            participants: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Appends the participant unless its connection is already a member.
    /// Returns `false` for the duplicate case.
    pub fn add(&mut self, participant: Participant) -> bool {
        if self.contains(&participant.connection_id) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.connection_id == connection_id)?;
        Some(self.participants.remove(index))
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| &p.connection_id == connection_id)
    }

    /// First member registered under `user_id`, in join order.
    pub fn find_user(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Every member except the given connection.
    pub fn others(&self, connection_id: &ConnectionId) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| &p.connection_id != connection_id)
            .cloned()
            .collect()
    }
}
