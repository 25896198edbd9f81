//! Common types used throughout the queue engine

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for participants (real players)
pub type ParticipantId = u64;

/// Unique identifier for a queued group, assigned by the engine
pub type GroupId = u64;

/// Unique identifier for a pre-formed party, supplied by the caller
pub type PartyId = Uuid;

/// Handle to a session instance, minted by the instance directory
pub type InstanceId = Uuid;

/// Identifier of a session template
pub type SessionTypeId = u32;

/// Skill/level bracket index; brackets never cross-match
pub type BracketId = usize;

/// Number of brackets tracked per queue
pub const BRACKET_COUNT: usize = 16;

/// One of the two sides of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

/// Iteration order for per-team loops; team A is always first
pub const TEAMS: [Team; 2] = [Team::A, Team::B];

impl Team {
    pub const COUNT: usize = 2;

    pub fn index(self) -> usize {
        match self {
            Team::A => 0,
            Team::B => 1,
        }
    }

    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    pub fn from_index(index: usize) -> Team {
        if index == 0 {
            Team::A
        } else {
            Team::B
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

/// Category of a bracket sub-queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueCategory {
    /// Pre-formed parties and rated entries
    Premade,
    /// Solo entrants and demoted premades
    Normal,
}

/// Address of one of the four ordered sub-queues of a bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubQueueId {
    pub category: QueueCategory,
    pub team: Team,
}

impl SubQueueId {
    pub fn premade(team: Team) -> Self {
        Self {
            category: QueueCategory::Premade,
            team,
        }
    }

    pub fn normal(team: Team) -> Self {
        Self {
            category: QueueCategory::Normal,
            team,
        }
    }

    /// Flat storage index within a bracket
    pub fn index(self) -> usize {
        let category = match self.category {
            QueueCategory::Premade => 0,
            QueueCategory::Normal => 1,
        };
        category * Team::COUNT + self.team.index()
    }
}

/// Variant of the session a group queued for
///
/// `arena_size == 0` means a standard (non-arena) session; for arenas it is
/// the required participants per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchVariant {
    pub arena_size: u8,
    pub rated: bool,
    pub skirmish: bool,
}

impl MatchVariant {
    pub fn standard() -> Self {
        Self {
            arena_size: 0,
            rated: false,
            skirmish: false,
        }
    }

    pub fn arena(size: u8, rated: bool) -> Self {
        Self {
            arena_size: size,
            rated,
            skirmish: !rated,
        }
    }

    pub fn is_arena(&self) -> bool {
        self.arena_size > 0
    }

    /// Rating slot derived from the arena size, used by the rating service
    pub fn bracket_slot(&self) -> u8 {
        match self.arena_size {
            2 => 0,
            3 => 1,
            5 => 2,
            _ => 0,
        }
    }
}

/// Kind of session a template describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    /// Objective session with min/max team sizes and backfill
    Standard,
    /// Fixed-size arena session
    Arena,
}

/// Queue status reported through the notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    /// Participant left or was removed from the queue
    Removed,
    /// Participant holds an invitation and must join before the deadline
    AwaitingJoin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_queue_indices_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for team in TEAMS {
            assert!(seen.insert(SubQueueId::premade(team).index()));
            assert!(seen.insert(SubQueueId::normal(team).index()));
        }
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|&i| i < 4));
    }

    #[test]
    fn team_round_trips_through_index() {
        for team in TEAMS {
            assert_eq!(Team::from_index(team.index()), team);
            assert_eq!(team.other().other(), team);
        }
    }

    #[test]
    fn arena_variant_flags() {
        let skirmish = MatchVariant::arena(3, false);
        assert!(skirmish.is_arena());
        assert!(skirmish.skirmish);
        assert!(!skirmish.rated);
        assert_eq!(skirmish.bracket_slot(), 1);

        let standard = MatchVariant::standard();
        assert!(!standard.is_arena());
    }
}
