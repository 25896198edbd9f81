//! Player directory interface
//!
//! Resolves whether a queued identity is still online, and the player-side
//! queue slot echoed back through status notifications.

use crate::types::ParticipantId;
use std::collections::HashMap;
use std::sync::RwLock;

/// An online participant as seen by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnlineParticipant {
    pub id: ParticipantId,
    /// Player-side queue index, echoed in status notifications
    pub queue_slot: u32,
}

/// Presence lookup consumed by the engine
pub trait PlayerDirectory: Send + Sync {
    /// Find a participant if they are currently online
    fn find_online(&self, id: ParticipantId) -> Option<OnlineParticipant>;
}

/// In-memory player directory for the simulator and tests
#[derive(Debug, Default)]
pub struct StaticPlayerDirectory {
    online: RwLock<HashMap<ParticipantId, u32>>,
}

impl StaticPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, id: ParticipantId, queue_slot: u32) {
        self.online
            .write()
            .expect("presence lock poisoned")
            .insert(id, queue_slot);
    }

    pub fn set_offline(&self, id: ParticipantId) {
        self.online
            .write()
            .expect("presence lock poisoned")
            .remove(&id);
    }
}

impl PlayerDirectory for StaticPlayerDirectory {
    fn find_online(&self, id: ParticipantId) -> Option<OnlineParticipant> {
        self.online
            .read()
            .expect("presence lock poisoned")
            .get(&id)
            .map(|&queue_slot| OnlineParticipant { id, queue_slot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_lookup_round_trip() {
        let directory = StaticPlayerDirectory::new();
        assert!(directory.find_online(7).is_none());

        directory.set_online(7, 2);
        let online = directory.find_online(7).unwrap();
        assert_eq!(online.id, 7);
        assert_eq!(online.queue_slot, 2);

        directory.set_offline(7);
        assert!(directory.find_online(7).is_none());
    }
}
