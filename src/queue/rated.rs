//! Rated and arena opponent matching
//!
//! Scans the premade sub-queues for two compatible teams inside a rating
//! window centred on a reference rating. For arenas the window widens per
//! full minute the reference entry has been waiting; a separate absolute
//! age threshold lets long-waiting entries bypass the window entirely.

use crate::queue::entry::same_party;
use crate::queue::store::SessionQueue;
use crate::types::{BracketId, GroupId, MatchVariant, SubQueueId, Team, TEAMS};
use tracing::{debug, error};

/// Window growth per full minute of reference wait, in rating points
pub const ARENA_RATING_WIDEN_PER_MINUTE: u32 = 150;

impl SessionQueue {
    /// Try to pair two rated teams and start a fresh instance for them.
    ///
    /// `reference` is the matchmaking rating of the triggering team; when
    /// absent, the rating of whichever team's oldest premade entry has
    /// waited longest is used, and for `widen` (arena) matches the window
    /// additionally grows with that entry's elapsed wait.
    pub(super) fn check_rated_match(
        &mut self,
        bracket: BracketId,
        arena_size: u8,
        reference: Option<u32>,
        widen: bool,
    ) {
        let now = self.clock.now_ms();
        let (reference_rating, widen_by) = match reference {
            Some(rating) => (rating, 0),
            None => {
                let front_a = self.brackets[bracket]
                    .queue(SubQueueId::premade(Team::A))
                    .front();
                let front_b = self.brackets[bracket]
                    .queue(SubQueueId::premade(Team::B))
                    .front();
                let oldest = match (front_a, front_b) {
                    (None, None) => return, // queues are empty
                    (Some(a), None) => a,
                    (None, Some(b)) => b,
                    (Some(a), Some(b)) => {
                        if a.joined_at_ms < b.joined_at_ms {
                            a
                        } else {
                            b
                        }
                    }
                };
                let widen_by = if widen {
                    let minutes = (now.saturating_sub(oldest.joined_at_ms) / 60_000) as u32;
                    minutes * ARENA_RATING_WIDEN_PER_MINUTE
                } else {
                    0
                };
                (oldest.matchmaking_rating, widen_by)
            }
        };

        let mut min_rating = reference_rating.saturating_sub(self.settings.max_rating_difference);
        let mut max_rating = reference_rating + self.settings.max_rating_difference;
        if widen_by > 0 {
            min_rating = min_rating.saturating_sub(widen_by);
            max_rating += widen_by;
        }
        // entries older than the discard threshold match regardless of
        // rating, so nobody starves forever
        let discard_before = now.saturating_sub(self.settings.rating_discard_timer_ms());
        let eligible = |entry: &crate::queue::entry::GroupEntry| {
            !entry.is_invited()
                && ((entry.matchmaking_rating >= min_rating
                    && entry.matchmaking_rating <= max_rating)
                    || entry.joined_at_ms < discard_before)
        };

        // first eligible entry per premade sub-queue, in queue order
        let mut found: Vec<(SubQueueId, GroupId)> = Vec::new();
        for team in TEAMS {
            let sub = SubQueueId::premade(team);
            if let Some(entry) = self.brackets[bracket].queue(sub).iter().find(|e| eligible(e)) {
                found.push((sub, entry.id));
            }
        }
        if found.is_empty() {
            return;
        }
        if found.len() == 1 {
            // look for a second team behind the first, in the same
            // sub-queue; it must be a different underlying party
            let (sub, first_id) = found[0];
            let queue = self.brackets[bracket].queue(sub);
            let first_party = queue
                .iter()
                .find(|e| e.id == first_id)
                .and_then(|e| e.party);
            let start = queue
                .iter()
                .position(|e| e.id == first_id)
                .unwrap_or(queue.len());
            if let Some(second) = queue.iter().skip(start).find(|e| {
                e.id != first_id && eligible(e) && !same_party(first_party, e.party)
            }) {
                found.push((sub, second.id));
            }
        }
        if found.len() < 2 {
            return; // one candidate is not a match
        }

        let variant = MatchVariant {
            arena_size,
            rated: true,
            skirmish: false,
        };
        let instance = match self
            .instances
            .create_instance(self.session_type, bracket, variant)
        {
            Ok(instance) => instance,
            Err(err) => {
                error!(%err, session_type = self.session_type, "could not create instance for rated match");
                return;
            }
        };

        // record each side's opponent ratings reciprocally
        let slot_a = found[0];
        let slot_b = found[1];
        let Some(first) = self.group_in(bracket, slot_a.0, slot_a.1) else {
            return;
        };
        let (first_rating, first_mmr) = (first.rating, first.matchmaking_rating);
        let Some(second) = self.group_in(bracket, slot_b.0, slot_b.1) else {
            return;
        };
        let (second_rating, second_mmr) = (second.rating, second.matchmaking_rating);
        if let Some(entry) = self.group_in_bracket_mut(bracket, slot_a.1) {
            entry.opponents_rating = second_rating;
            entry.opponents_matchmaking_rating = second_mmr;
        }
        if let Some(entry) = self.group_in_bracket_mut(bracket, slot_b.1) {
            entry.opponents_rating = first_rating;
            entry.opponents_matchmaking_rating = first_mmr;
        }

        // relocate each side to the sub-queue of its assigned slot, so a
        // later removal scan finds it where the index says it is
        for (required_team, (sub, group)) in [(Team::A, slot_a), (Team::B, slot_b)] {
            let current_team = self
                .group_in(bracket, sub, group)
                .map(|e| e.team);
            if current_team.is_some() && current_team != Some(required_team) {
                if let Some(mut entry) = self.remove_group_from(bracket, sub, group) {
                    entry.team = required_team;
                    self.retag_members(&entry, required_team);
                    self.brackets[bracket]
                        .queue_mut(SubQueueId::premade(required_team))
                        .push_front(entry);
                }
            }
        }

        self.invite_group(bracket, slot_a.1, instance, Some(Team::A));
        self.invite_group(bracket, slot_b.1, instance, Some(Team::B));
        debug!(%instance, bracket, "starting rated match");
        self.instances.start_instance(instance);
    }
}
