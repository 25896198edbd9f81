//! Queued participant and group records
//!
//! A `GroupEntry` is the unit the matching algorithms operate on: one queued
//! party of one or more participants. The entry exclusively owns its member
//! records; the engine's player index holds a non-owning (group id, team)
//! locator per participant.

use crate::types::{GroupId, InstanceId, MatchVariant, ParticipantId, PartyId, SessionTypeId, Team};
use std::collections::HashMap;

/// One participant's queue membership record, owned by its group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedParticipant {
    /// Monotonic timestamp of the participant's last observed activity
    pub last_seen_ms: u64,
    /// Back-reference to the owning group
    pub group: GroupId,
}

/// An active invitation; the deadline doubles as the timer cancellation token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invitation {
    pub instance: InstanceId,
    pub deadline_ms: u64,
}

/// A queued party and the unit of match assembly
#[derive(Debug, Clone)]
pub struct GroupEntry {
    pub id: GroupId,
    pub session_type: SessionTypeId,
    pub variant: MatchVariant,
    /// Current team affiliation; flips during same-faction skirmish
    /// synthesis and rated relocation
    pub team: Team,
    pub joined_at_ms: u64,
    pub invite: Option<Invitation>,
    pub rating: u32,
    pub matchmaking_rating: u32,
    /// Rating of the most recently matched opponent
    pub opponents_rating: u32,
    pub opponents_matchmaking_rating: u32,
    /// Identity of the pre-formed party, if any
    pub party: Option<PartyId>,
    /// Member records, exclusively owned by this entry
    pub members: HashMap<ParticipantId, QueuedParticipant>,
}

impl GroupEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: GroupId,
        session_type: SessionTypeId,
        variant: MatchVariant,
        team: Team,
        joined_at_ms: u64,
        rating: u32,
        matchmaking_rating: u32,
        party: Option<PartyId>,
    ) -> Self {
        Self {
            id,
            session_type,
            variant,
            team,
            joined_at_ms,
            invite: None,
            rating,
            matchmaking_rating,
            opponents_rating: 0,
            opponents_matchmaking_rating: 0,
            party,
            members: HashMap::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn is_invited(&self) -> bool {
        self.invite.is_some()
    }
}

/// Whether two entries belong to the same underlying party.
/// Solo (party-less) entries are never the same party.
pub fn same_party(a: Option<PartyId>, b: Option<PartyId>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn solo_entries_are_distinct_parties() {
        let party = Uuid::new_v4();
        assert!(!same_party(None, None));
        assert!(!same_party(Some(party), None));
        assert!(!same_party(Some(party), Some(Uuid::new_v4())));
        assert!(same_party(Some(party), Some(party)));
    }

    #[test]
    fn new_entry_starts_uninvited_and_empty() {
        let entry = GroupEntry::new(1, 7, MatchVariant::standard(), Team::A, 0, 0, 0, None);
        assert!(!entry.is_invited());
        assert_eq!(entry.size(), 0);
        assert_eq!(entry.opponents_rating, 0);
    }
}
