//! Invitation lifecycle and update orchestration
//!
//! `update` is the engine's single entry point for matchmaking work: it
//! backfills instances with free capacity, then evaluates whether a new
//! instance should be created along the premade, normal, skirmish or rated
//! paths. Inviting a group arms a reminder and a timeout callback per
//! member; both re-validate their captured (instance, deadline) token
//! against live state before acting, so stale firings are harmless.

use crate::external::StatusNotification;
use crate::queue::entry::Invitation;
use crate::queue::pool::SelectionPool;
use crate::queue::store::SessionQueue;
use crate::timer::{InviteTimer, InviteToken};
use crate::types::{
    BracketId, GroupId, InstanceId, MatchVariant, QueueStatus, SessionKind, SubQueueId, Team,
    BRACKET_COUNT,
};
use crate::wait_time::WaitTimeTracker;
use tracing::{debug, error, warn};

impl SessionQueue {
    /// Invite a group to an instance, arming reminder and timeout callbacks
    /// for each online member. Returns false when the group already holds
    /// an invitation.
    pub(super) fn invite_group(
        &mut self,
        bracket: BracketId,
        group: GroupId,
        instance: InstanceId,
        side: Option<Team>,
    ) -> bool {
        let now = self.clock.now_ms();
        let window = self.settings.invite_window_ms();
        let deadline = now + window;

        let (member_ids, team, wait_bucket, wait_ms, arena_size) = {
            let Some(entry) = self.group_in_bracket_mut(bracket, group) else {
                warn!(group, bracket, "cannot invite: group not found in bracket");
                return false;
            };
            if entry.is_invited() {
                return false;
            }
            if let Some(team) = side {
                entry.team = team;
            }
            entry.invite = Some(Invitation {
                instance,
                deadline_ms: deadline,
            });
            (
                entry.members.keys().copied().collect::<Vec<_>>(),
                entry.team,
                WaitTimeTracker::bucket_of(entry.variant, entry.team),
                now.saturating_sub(entry.joined_at_ms),
                entry.variant.arena_size,
            )
        };
        if side.is_some() {
            for &member in &member_ids {
                if let Some(slot) = self.players.get_mut(&member) {
                    slot.team = team;
                }
            }
        }

        for &member in &member_ids {
            // offline members are skipped; logout removes them from the
            // queue through another path
            let Some(online) = self.directory.find_online(member) else {
                continue;
            };

            self.wait_times.record(wait_bucket, bracket, wait_ms);
            self.instances.increase_invited(instance, team);

            let token = InviteToken {
                participant: member,
                instance,
                deadline_ms: deadline,
            };
            self.timers
                .schedule(now + self.settings.invite_reminder_after_ms(), InviteTimer::Reminder(token));
            self.timers.schedule(deadline, InviteTimer::Timeout(token));

            debug!(
                participant = member,
                %instance,
                group,
                deadline_ms = deadline,
                "invited participant to instance"
            );
            self.notifier.notify_status(StatusNotification {
                participant: member,
                instance: Some(instance),
                queue_slot: online.queue_slot,
                status: QueueStatus::AwaitingJoin,
                remaining_ms: window,
                arena_size,
            });
        }
        true
    }

    /// Run one matchmaking pass for a bracket: backfill instances with free
    /// capacity, then try to assemble a new instance.
    ///
    /// Invoked by the external scheduler whenever queue membership changes
    /// and periodically. `reference_rating` carries the triggering team's
    /// matchmaking rating for rated paths; `skirmish` marks unrated arena
    /// passes.
    pub fn update(
        &mut self,
        bracket: BracketId,
        arena_size: u8,
        reference_rating: Option<u32>,
        skirmish: bool,
    ) {
        if bracket >= BRACKET_COUNT {
            warn!(bracket, "update for out-of-range bracket");
            return;
        }
        if self.bracket_is_empty(bracket) {
            return;
        }

        // instances with free capacity come first
        for instance in self
            .instances
            .find_free_instances(self.session_type, bracket)
        {
            let mut pools = [SelectionPool::new(), SelectionPool::new()];
            self.fill_for_instance(&mut pools, instance, bracket);
            self.invite_pools(&pools, bracket, instance);
            if !self.instances.has_free_slots(instance) {
                self.instances.remove_from_free_list(instance);
            }
        }

        let Some(template) = self.instances.template(self.session_type) else {
            error!(session_type = self.session_type, "session template not found");
            return;
        };

        let mut min_per_team = template.min_per_team;
        let mut max_per_team = template.max_per_team;
        if self.settings.testing_mode {
            min_per_team = 1;
        }
        let is_arena = template.kind == SessionKind::Arena;
        if is_arena {
            if self.settings.arena_testing_mode {
                min_per_team = 1;
                max_per_team = 1;
            } else {
                min_per_team = arena_size as u32;
                max_per_team = arena_size as u32;
            }
        }

        let mut pools = [SelectionPool::new(), SelectionPool::new()];

        if template.kind == SessionKind::Standard && !template.rated {
            if self.check_premade_match(&mut pools, bracket, min_per_team, max_per_team) {
                if self.launch_instance(&pools, bracket, arena_size, skirmish) {
                    pools[0].reset();
                    pools[1].reset();
                } else {
                    return;
                }
            }
        }

        if !template.rated && !(is_arena && !skirmish) {
            // the skirmish check deliberately consumes the pools exactly as
            // a failed normal check left them
            if self.check_normal_match(&mut pools, bracket, &template, min_per_team, max_per_team)
                || (is_arena && self.check_skirmish_same_faction(&mut pools, bracket, min_per_team))
                || (is_arena
                    && self.check_premade_match(&mut pools, bracket, min_per_team, min_per_team))
            {
                self.launch_instance(&pools, bracket, arena_size, skirmish);
            }
        } else if is_arena {
            self.check_rated_match(bracket, arena_size, reference_rating, true);
        } else if template.rated {
            self.check_rated_match(bracket, arena_size, reference_rating, false);
        }
    }

    /// Drain due reminder and timeout callbacks. Runs on the same
    /// single-threaded driver as every mutation, so a timer never fires
    /// mid-update.
    pub fn pump_timers(&mut self) {
        let now = self.clock.now_ms();
        for timer in self.timers.pop_due(now) {
            match timer {
                InviteTimer::Reminder(token) => self.on_reminder(token),
                InviteTimer::Timeout(token) => self.on_timeout(token),
            }
        }
    }

    fn on_reminder(&mut self, token: InviteToken) {
        let Some(online) = self.directory.find_online(token.participant) else {
            return;
        };
        // a stale token means the player left, rejoined, or already
        // progressed; drop the event without logging
        if !self.is_invited(token.participant, token.instance, token.deadline_ms) {
            return;
        }
        let arena_size = self
            .group_of(token.participant)
            .map(|g| g.variant.arena_size)
            .unwrap_or(0);
        let remaining =
            self.settings.invite_window_ms() - self.settings.invite_reminder_after_ms();
        self.notifier.notify_status(StatusNotification {
            participant: token.participant,
            instance: Some(token.instance),
            queue_slot: online.queue_slot,
            status: QueueStatus::AwaitingJoin,
            remaining_ms: remaining,
            arena_size,
        });
    }

    fn on_timeout(&mut self, token: InviteToken) {
        let Some(online) = self.directory.find_online(token.participant) else {
            return;
        };
        if !self.is_invited(token.participant, token.instance, token.deadline_ms) {
            return;
        }
        debug!(
            participant = token.participant,
            instance = %token.instance,
            "invitation expired, removing participant from queue"
        );
        let arena_size = self
            .group_of(token.participant)
            .map(|g| g.variant.arena_size)
            .unwrap_or(0);
        self.notifier.notify_status(StatusNotification {
            participant: token.participant,
            instance: None,
            queue_slot: online.queue_slot,
            status: QueueStatus::Removed,
            remaining_ms: 0,
            arena_size,
        });
        self.remove_player(token.participant, true);
    }

    /// Invite both pools' groups, keeping each group's current team
    fn invite_pools(
        &mut self,
        pools: &[SelectionPool; Team::COUNT],
        bracket: BracketId,
        instance: InstanceId,
    ) {
        for pool in pools {
            let selected: Vec<GroupId> = pool.selected().iter().map(|s| s.group).collect();
            for group in selected {
                self.invite_group(bracket, group, instance, None);
            }
        }
    }

    /// Create, populate and start a fresh instance from assembled pools.
    /// Returns false when the directory could not create one.
    fn launch_instance(
        &mut self,
        pools: &[SelectionPool; Team::COUNT],
        bracket: BracketId,
        arena_size: u8,
        skirmish: bool,
    ) -> bool {
        let variant = MatchVariant {
            arena_size,
            rated: false,
            skirmish,
        };
        let instance = match self
            .instances
            .create_instance(self.session_type, bracket, variant)
        {
            Ok(instance) => instance,
            Err(err) => {
                error!(%err, session_type = self.session_type, "cannot create instance");
                return false;
            }
        };
        self.invite_pools(pools, bracket, instance);
        self.instances.start_instance(instance);
        true
    }

    /// Count of groups queued in one sub-queue, for diagnostics
    pub fn queued_groups(&self, bracket: BracketId, sub: SubQueueId) -> usize {
        self.brackets[bracket].queue(sub).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueSettings;
    use crate::external::{
        InMemoryInstanceDirectory, ManualClock, RecordingNotifier, SessionTemplate,
        StaticPlayerDirectory,
    };
    use crate::external::rating::MockRatingService;
    use crate::external::InstanceDirectory;
    use crate::queue::store::testing::*;
    use crate::queue::store::EnqueueRequest;
    use std::sync::Arc;

    #[test]
    fn update_assembles_and_starts_a_normal_match() {
        let mut h = harness(standard_template(1, 1, 1), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 1);
        h.enqueue_solos(0, Team::B, 2, 1);

        h.queue.update(0, 0, None, false);

        assert_eq!(h.instances.started_instances().len(), 1);
        let instance = h.instances.started_instances()[0];
        assert!(h.queue.group_of(1).unwrap().is_invited());
        assert!(h.queue.group_of(2).unwrap().is_invited());
        assert_eq!(h.instances.invited_count(instance, Team::A), 1);
        assert_eq!(h.instances.invited_count(instance, Team::B), 1);

        // both members were told to join
        for id in [1u64, 2] {
            let sent = h.notifier.sent_to(id);
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].status, QueueStatus::AwaitingJoin);
            assert_eq!(sent[0].instance, Some(instance));
            assert_eq!(sent[0].remaining_ms, 80_000);
        }
    }

    #[test]
    fn update_without_enough_players_is_a_no_op() {
        let mut h = harness(standard_template(1, 2, 5), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 2);

        h.queue.update(0, 0, None, false);
        assert!(h.instances.started_instances().is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[test]
    fn update_starts_premade_against_premade() {
        let mut h = harness(standard_template(1, 2, 10), QueueSettings::default());
        h.enqueue_party(0, Team::A, &[1, 2, 3], premade_request(Team::A));
        h.enqueue_party(0, Team::B, &[4, 5, 6], premade_request(Team::B));

        h.queue.update(0, 0, None, false);

        assert_eq!(h.instances.started_instances().len(), 1);
        for id in 1..=6u64 {
            assert!(h.queue.group_of(id).unwrap().is_invited());
        }
    }

    #[test]
    fn update_backfills_started_instance_before_creating_new() {
        let mut h = harness(standard_template(1, 1, 5), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 1);
        h.enqueue_solos(0, Team::B, 2, 1);
        h.queue.update(0, 0, None, false);
        let first = h.instances.started_instances()[0];

        // two more arrivals are pulled into the running instance
        h.enqueue_solos(0, Team::A, 10, 1);
        h.enqueue_solos(0, Team::B, 11, 1);
        h.queue.update(0, 0, None, false);

        assert_eq!(h.instances.started_instances().len(), 1);
        assert_eq!(h.instances.invited_count(first, Team::A), 2);
        assert_eq!(h.instances.invited_count(first, Team::B), 2);
        assert_eq!(h.queue.group_of(10).unwrap().invite.unwrap().instance, first);
    }

    #[test]
    fn full_instance_leaves_the_free_list() {
        let mut h = harness(standard_template(1, 1, 1), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 1);
        h.enqueue_solos(0, Team::B, 2, 1);
        h.queue.update(0, 0, None, false);
        let instance = h.instances.started_instances()[0];

        // capacity 1v1 is full, so the next pass must not offer it
        h.enqueue_solos(0, Team::A, 3, 1);
        h.queue.update(0, 0, None, false);
        assert!(h
            .instances
            .find_free_instances(1, 0)
            .iter()
            .all(|&i| i != instance));
        assert!(!h.queue.group_of(3).unwrap().is_invited());
    }

    #[test]
    fn timeout_removes_participant_and_notifies() {
        let mut h = harness(standard_template(1, 1, 1), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 1);
        h.enqueue_solos(0, Team::B, 2, 1);
        h.queue.update(0, 0, None, false);
        let instance = h.instances.started_instances()[0];
        h.notifier.clear();

        h.clock.advance(80_000);
        h.queue.pump_timers();

        assert!(h.queue.group_of(1).is_none());
        assert!(h.queue.group_of(2).is_none());
        assert_eq!(h.queue.queued_participants(), 0);
        // invited counters were released
        assert_eq!(h.instances.invited_count(instance, Team::A), 0);
        assert_eq!(h.instances.invited_count(instance, Team::B), 0);

        let sent = h.notifier.sent_to(1);
        // reminder first, then the removal
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].status, QueueStatus::AwaitingJoin);
        assert_eq!(sent[0].remaining_ms, 60_000);
        assert_eq!(sent[1].status, QueueStatus::Removed);
    }

    #[test]
    fn stale_timeout_is_a_no_op_after_rejoin() {
        let mut h = harness(standard_template(1, 1, 1), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 1);
        h.enqueue_solos(0, Team::B, 2, 1);
        h.queue.update(0, 0, None, false);

        // participant 1 leaves and rejoins; a fresh match hands out a new
        // deadline while the original timeout is still armed
        h.queue.remove_player(1, true);
        h.clock.advance(10_000);
        h.enqueue_solos(0, Team::A, 1, 1);
        h.enqueue_solos(0, Team::B, 3, 1);
        h.queue.update(0, 0, None, false);
        let new_deadline = h.queue.group_of(1).unwrap().invite.unwrap().deadline_ms;

        // the first timeout fires at its original deadline and must not
        // touch the re-queued participant
        h.clock.advance(70_000);
        h.queue.pump_timers();
        let entry = h.queue.group_of(1).expect("participant wrongly removed");
        assert_eq!(entry.invite.unwrap().deadline_ms, new_deadline);
    }

    #[test]
    fn reminder_restates_remaining_time() {
        let mut h = harness(standard_template(1, 1, 1), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 1);
        h.enqueue_solos(0, Team::B, 2, 1);
        h.queue.update(0, 0, None, false);
        h.notifier.clear();

        h.clock.advance(20_000);
        h.queue.pump_timers();

        let sent = h.notifier.sent_to(1);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status, QueueStatus::AwaitingJoin);
        assert_eq!(sent[0].remaining_ms, 60_000);
        // the reminder does not remove anybody
        assert!(h.queue.group_of(1).is_some());
    }

    #[test]
    fn offline_member_is_skipped_at_invite_time() {
        let mut h = harness(standard_template(1, 1, 5), QueueSettings::default());
        h.enqueue_party(0, Team::A, &[1, 2], solo_request(Team::A));
        h.enqueue_solos(0, Team::B, 3, 2);
        h.directory.set_offline(2);

        h.queue.update(0, 0, None, false);

        let instance = h.instances.started_instances()[0];
        // only the online member counts toward the invited total
        assert_eq!(h.instances.invited_count(instance, Team::A), 1);
        assert!(h.notifier.sent_to(2).is_empty());
        assert_eq!(h.notifier.sent_to(1).len(), 1);
    }

    #[test]
    fn skirmish_forfeit_reaches_the_rating_service() {
        let instances = Arc::new(InMemoryInstanceDirectory::new());
        instances.register_template(SessionTemplate {
            session_type: 3,
            kind: crate::types::SessionKind::Arena,
            rated: false,
            min_per_team: 1,
            max_per_team: 1,
        });
        let directory = Arc::new(StaticPlayerDirectory::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(ManualClock::new(1_000));

        let mut ratings = MockRatingService::new();
        ratings
            .expect_adjust_for_forfeit()
            .withf(|&id, &slot, &opp_mmr| id == 1 && slot == 1 && opp_mmr == 0)
            .times(1)
            .return_const(());

        let mut queue = crate::queue::SessionQueue::new(
            3,
            QueueSettings::default(),
            instances.clone(),
            directory.clone(),
            Arc::new(ratings),
            notifier,
            clock,
        );

        for (members, team) in [([1u64, 2, 3], Team::A), ([4u64, 5, 6], Team::B)] {
            for &member in &members {
                directory.set_online(member, 0);
            }
            queue
                .enqueue(
                    0,
                    members[0],
                    Some(&members),
                    EnqueueRequest {
                        team,
                        premade: false,
                        variant: crate::types::MatchVariant::arena(3, false),
                        rating: 1500,
                        matchmaking_rating: 1500,
                        party: None,
                    },
                )
                .unwrap();
        }
        queue.update(0, 3, None, true);
        assert!(queue.group_of(1).unwrap().is_invited());

        // abandoning the active skirmish invitation forfeits rating
        queue.remove_player(1, true);
    }

    #[test]
    fn update_with_unknown_template_is_a_logged_no_op() {
        let mut h = harness(standard_template(1, 1, 1), QueueSettings::default());
        h.enqueue_solos(0, Team::A, 1, 1);
        h.queue.session_type = 42;

        h.queue.update(0, 0, None, false);
        assert!(h.instances.started_instances().is_empty());
    }

    #[test]
    fn wait_average_becomes_available_after_enough_invites() {
        let mut h = harness(standard_template(1, 1, 1), QueueSettings::default());

        // ten 1v1 rounds, each waiting 1s before the match forms
        for round in 0u64..10 {
            let a = 100 + round * 2;
            let b = 101 + round * 2;
            h.enqueue_solos(0, Team::A, a, 1);
            h.enqueue_solos(0, Team::B, b, 1);
            h.clock.advance(1_000);
            h.queue.update(0, 0, None, false);
            h.queue.remove_player(a, true);
            h.queue.remove_player(b, true);
        }

        h.enqueue_solos(0, Team::A, 500, 1);
        let entry = h.queue.group_of(500).unwrap();
        assert_eq!(h.queue.average_wait_time(entry, 0), 1_000);
        // no samples in other brackets
        assert_eq!(h.queue.wait_times.average(0, 1), 0);
    }
}
