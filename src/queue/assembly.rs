//! Match assembly
//!
//! Greedy fill and balance heuristics deciding which queued groups enter a
//! new or backfilling instance. Group sizes make this an instance of the
//! subset-sum problem; the balancing loop is a bounded "evict one, backfill
//! one" approximation, not an optimal packing.

use crate::external::SessionTemplate;
use crate::queue::pool::SelectionPool;
use crate::queue::store::SessionQueue;
use crate::types::{BracketId, GroupId, InstanceId, SubQueueId, Team, TEAMS};
use tracing::debug;

/// One selection pool per team, created fresh for every assembly attempt
pub(super) type TeamPools = [SelectionPool; Team::COUNT];

impl SessionQueue {
    /// Fill the pools with normal-category groups for an instance that
    /// still has free slots, optionally rebalancing the two teams'
    /// shortfalls to within 1.
    pub(super) fn fill_for_instance(
        &mut self,
        pools: &mut TeamPools,
        instance: InstanceId,
        bracket: BracketId,
    ) {
        let free: [i64; Team::COUNT] = [
            self.instances.free_slots(instance, Team::A) as i64,
            self.instances.free_slots(instance, Team::B) as i64,
        ];

        // greedy FIFO fill up to each team's free-slot count; large groups
        // that do not fit are skipped, the scan stops once the pool is full
        let mut next_index = [0usize; Team::COUNT];
        for team in TEAMS {
            let t = team.index();
            let queue = self.brackets[bracket].queue(SubQueueId::normal(team));
            while next_index[t] < queue.len() {
                if !pools[t].try_add(&queue[next_index[t]], free[t].max(0) as u32) {
                    break;
                }
                next_index[t] += 1;
            }
        }

        if !self.settings.invitation_balancing {
            return;
        }

        // reduce the difference between the two teams' shortfalls
        // (free - selected) by evicting from the fuller side and
        // backfilling; each pass evicts at least one group, so the loop
        // terminates
        let mut shortfall = [
            free[0] - pools[0].player_count() as i64,
            free[1] - pools[1].player_count() as i64,
        ];
        while (shortfall[0] - shortfall[1]).abs() > 1
            && (pools[0].player_count() > 0 || pools[1].player_count() > 0)
        {
            let (fuller, emptier) = if shortfall[0] < shortfall[1] {
                (0, 1)
            } else {
                (1, 0)
            };
            let kick_target = (shortfall[emptier] - shortfall[fuller]) as u32;
            if pools[fuller].kick_group(kick_target) {
                let desired = if free[fuller] >= shortfall[emptier] {
                    (free[fuller] - shortfall[emptier]) as u32
                } else {
                    0
                };
                let team = Team::from_index(fuller);
                let queue = self.brackets[bracket].queue(SubQueueId::normal(team));
                while next_index[fuller] < queue.len() {
                    if !pools[fuller].try_add(&queue[next_index[fuller]], desired) {
                        break;
                    }
                    next_index[fuller] += 1;
                }
            }
            if pools[fuller].player_count() == 0 {
                // nothing left on the fuller side; give up unless the other
                // side can still shrink meaningfully
                if free[fuller] <= shortfall[emptier] + 1 {
                    break;
                }
                pools[emptier].kick_group(kick_target);
            }
            shortfall = [
                free[0] - pools[0].player_count() as i64,
                free[1] - pools[1].player_count() as i64,
            ];
        }
    }

    /// Seed the pools with one uninvited premade group per team, topped up
    /// from the normal queues to the smaller premade size. When no pairing
    /// exists, demote expired or undersized premade front entries to their
    /// team's normal queue and report no match.
    pub(super) fn check_premade_match(
        &mut self,
        pools: &mut TeamPools,
        bracket: BracketId,
        min_per_team: u32,
        max_per_team: u32,
    ) -> bool {
        let premade_a = self.brackets[bracket].queue(SubQueueId::premade(Team::A));
        let premade_b = self.brackets[bracket].queue(SubQueueId::premade(Team::B));
        if !premade_a.is_empty() && !premade_b.is_empty() {
            let seed_a = premade_a.iter().find(|g| !g.is_invited());
            let seed_b = premade_b.iter().find(|g| !g.is_invited());
            if let (Some(seed_a), Some(seed_b)) = (seed_a, seed_b) {
                pools[0].try_add(seed_a, max_per_team);
                pools[1].try_add(seed_b, max_per_team);

                // both teams fill to the smaller of the two premade sizes
                let cap = pools[0].player_count().min(pools[1].player_count());
                for team in TEAMS {
                    let queue = self.brackets[bracket].queue(SubQueueId::normal(team));
                    for entry in queue {
                        if !entry.is_invited() && !pools[team.index()].try_add(entry, cap) {
                            break;
                        }
                    }
                }
                return true;
            }
        }

        // no pairing: check only the front entries for demotion, later ones
        // get their turn once the front clears
        let now = self.clock.now_ms();
        let expiry = self.settings.premade_wait_expiry_ms();
        for team in TEAMS {
            let premade = self.brackets[bracket].queue_mut(SubQueueId::premade(team));
            let demote = premade.front().map_or(false, |front| {
                !front.is_invited()
                    && (front.joined_at_ms + expiry < now || front.size() < min_per_team)
            });
            if demote {
                let entry = premade.pop_front().expect("checked front entry vanished");
                debug!(group = entry.id, team = %team, "demoting premade group to normal queue");
                self.brackets[bracket]
                    .queue_mut(SubQueueId::normal(team))
                    .push_front(entry);
            }
        }
        false
    }

    /// Fill both pools independently from the normal queues; with balanced
    /// invitations, top up the smaller team and reject rosters that differ
    /// by more than 2.
    pub(super) fn check_normal_match(
        &self,
        pools: &mut TeamPools,
        bracket: BracketId,
        template: &SessionTemplate,
        min_per_team: u32,
        max_per_team: u32,
    ) -> bool {
        let mut next_index = [0usize; Team::COUNT];
        for team in TEAMS {
            let t = team.index();
            let queue = self.brackets[bracket].queue(SubQueueId::normal(team));
            let mut index = 0;
            while index < queue.len() {
                let entry = &queue[index];
                if !entry.is_invited() {
                    pools[t].try_add(entry, max_per_team);
                    if pools[t].player_count() >= min_per_team {
                        index += 1;
                        break;
                    }
                }
                index += 1;
            }
            next_index[t] = index;
        }

        // inviting the same number per side may delay the match even when
        // the queue holds enough participants
        let smaller = if pools[1].player_count() < pools[0].player_count() {
            1
        } else {
            0
        };
        if self.settings.invitation_balancing
            && pools[0].player_count() >= min_per_team
            && pools[1].player_count() >= min_per_team
        {
            let other_count = pools[1 - smaller].player_count();
            let team = Team::from_index(smaller);
            let queue = self.brackets[bracket].queue(SubQueueId::normal(team));
            let mut index = next_index[smaller];
            while index < queue.len() {
                let entry = &queue[index];
                if !entry.is_invited() && !pools[smaller].try_add(entry, other_count) {
                    break;
                }
                index += 1;
            }
            if (pools[0].player_count() as i64 - pools[1].player_count() as i64).abs() > 2 {
                return false;
            }
        }

        // diagnostics: a standard session may start with one side empty
        if self.settings.testing_mode
            && template.kind == crate::types::SessionKind::Standard
            && (pools[0].player_count() > 0 || pools[1].player_count() > 0)
        {
            return true;
        }
        pools[0].player_count() >= min_per_team && pools[1].player_count() >= min_per_team
    }

    /// Manufacture a cross-team skirmish from same-team volunteers: when one
    /// pool sits exactly at the minimum and the other side cannot supply
    /// opponents, refill the opposing pool from the same team's queue and
    /// flip the affiliation of everything moved.
    pub(super) fn check_skirmish_same_faction(
        &mut self,
        pools: &mut TeamPools,
        bracket: BracketId,
        min_per_team: u32,
    ) -> bool {
        if pools[0].player_count() < min_per_team && pools[1].player_count() < min_per_team {
            return false;
        }
        let donor = if pools[1].player_count() == min_per_team {
            1
        } else {
            0
        };
        let taker = 1 - donor;
        pools[taker].reset();

        // resume the donor team's queue immediately after its last selected
        // group
        let Some(anchor) = pools[donor].last_selected() else {
            return false;
        };
        let donor_team = Team::from_index(donor);
        let donor_sub = SubQueueId::normal(donor_team);
        let queue = self.brackets[bracket].queue(donor_sub);
        let Some(anchor_pos) = queue.iter().position(|g| g.id == anchor) else {
            return false;
        };
        let mut index = anchor_pos + 1;
        while index < queue.len() {
            let entry = &queue[index];
            if !entry.is_invited() && !pools[taker].try_add(entry, min_per_team) {
                break;
            }
            index += 1;
        }
        if pools[taker].player_count() != min_per_team {
            return false;
        }

        // flip everything moved into the taker pool and relocate it to the
        // opposite team's normal queue
        let flipped_team = donor_team.other();
        let moved: Vec<GroupId> = pools[taker].selected().iter().map(|s| s.group).collect();
        for group in moved {
            if let Some(mut entry) = self.remove_group_from(bracket, donor_sub, group) {
                entry.team = flipped_team;
                self.retag_members(&entry, flipped_team);
                debug!(group = entry.id, team = %flipped_team, "flipped group for same-team skirmish");
                self.brackets[bracket]
                    .queue_mut(SubQueueId::normal(flipped_team))
                    .push_front(entry);
            }
        }
        true
    }
}
