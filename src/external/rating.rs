//! Rating service interface
//!
//! Persistent rating storage and adjustment formulas live outside the
//! engine; the queue only reports forfeits of active skirmish invitations.

use crate::types::ParticipantId;

/// Rating adjustments consumed by the engine
#[cfg_attr(test, mockall::automock)]
pub trait RatingService: Send + Sync {
    /// A participant abandoned an active skirmish invitation and loses
    /// rating against the recorded opponent matchmaking rating
    fn adjust_for_forfeit(
        &self,
        id: ParticipantId,
        bracket_slot: u8,
        opponents_matchmaking_rating: u32,
    );
}

/// Rating service that ignores all adjustments
#[derive(Debug, Default)]
pub struct NullRatingService;

impl NullRatingService {
    pub fn new() -> Self {
        Self
    }
}

impl RatingService for NullRatingService {
    fn adjust_for_forfeit(
        &self,
        _id: ParticipantId,
        _bracket_slot: u8,
        _opponents_matchmaking_rating: u32,
    ) {
    }
}
