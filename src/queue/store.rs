//! Queue storage and membership operations
//!
//! A `SessionQueue` keeps, per bracket, four ordered sub-queues of group
//! entries ({premade, normal} x {team A, team B}) plus a player index
//! mapping each queued identity to its owning group. All matching and
//! lifecycle logic in the sibling modules operates on this storage.

use crate::config::QueueSettings;
use crate::error::{QueueError, Result};
use crate::external::{Clock, InstanceDirectory, Notifier, PlayerDirectory, RatingService};
use crate::queue::entry::{GroupEntry, Invitation, QueuedParticipant};
use crate::timer::TimerWheel;
use crate::types::{
    BracketId, GroupId, InstanceId, MatchVariant, ParticipantId, PartyId, QueueCategory,
    QueueStatus, SessionTypeId, SubQueueId, Team, BRACKET_COUNT, TEAMS,
};
use crate::wait_time::{WaitTimeTracker, DEFAULT_SAMPLE_COUNT};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Parameters of one enqueue call
#[derive(Debug, Clone, Copy)]
pub struct EnqueueRequest {
    pub team: Team,
    /// Queue as a pre-formed group (rated entries are premade regardless)
    pub premade: bool,
    pub variant: MatchVariant,
    pub rating: u32,
    pub matchmaking_rating: u32,
    pub party: Option<PartyId>,
}

/// Non-owning locator from a participant to its group
#[derive(Debug, Clone, Copy)]
pub(super) struct IndexEntry {
    pub group: GroupId,
    pub team: Team,
}

/// The four ordered sub-queues of one bracket
#[derive(Debug, Default)]
pub(super) struct BracketQueues {
    queues: [VecDeque<GroupEntry>; 4],
}

impl BracketQueues {
    pub fn queue(&self, sub: SubQueueId) -> &VecDeque<GroupEntry> {
        &self.queues[sub.index()]
    }

    pub fn queue_mut(&mut self, sub: SubQueueId) -> &mut VecDeque<GroupEntry> {
        &mut self.queues[sub.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }
}

/// Matchmaking and queue-admission engine for one session type
pub struct SessionQueue {
    pub(super) session_type: SessionTypeId,
    pub(super) settings: QueueSettings,
    pub(super) brackets: Vec<BracketQueues>,
    pub(super) players: HashMap<ParticipantId, IndexEntry>,
    pub(super) wait_times: WaitTimeTracker,
    pub(super) timers: TimerWheel,
    pub(super) next_group_id: GroupId,
    pub(super) instances: Arc<dyn InstanceDirectory>,
    pub(super) directory: Arc<dyn PlayerDirectory>,
    pub(super) ratings: Arc<dyn RatingService>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) clock: Arc<dyn Clock>,
}

impl SessionQueue {
    pub fn new(
        session_type: SessionTypeId,
        settings: QueueSettings,
        instances: Arc<dyn InstanceDirectory>,
        directory: Arc<dyn PlayerDirectory>,
        ratings: Arc<dyn RatingService>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session_type,
            settings,
            brackets: (0..BRACKET_COUNT).map(|_| BracketQueues::default()).collect(),
            players: HashMap::new(),
            wait_times: WaitTimeTracker::new(BRACKET_COUNT, DEFAULT_SAMPLE_COUNT),
            timers: TimerWheel::new(),
            next_group_id: 1,
            instances,
            directory,
            ratings,
            notifier,
            clock,
        }
    }

    pub fn session_type(&self) -> SessionTypeId {
        self.session_type
    }

    /// Number of queued participants across all brackets
    pub fn queued_participants(&self) -> usize {
        self.players.len()
    }

    /// Queue a solo participant or a pre-formed party.
    ///
    /// `members: None` queues the leader alone; an explicit empty member
    /// list is rejected.
    pub fn enqueue(
        &mut self,
        bracket: BracketId,
        leader: ParticipantId,
        members: Option<&[ParticipantId]>,
        request: EnqueueRequest,
    ) -> Result<GroupId> {
        if bracket >= BRACKET_COUNT {
            return Err(QueueError::InvalidQueueRequest {
                reason: format!("bracket {} out of range", bracket),
            }
            .into());
        }
        let member_ids: Vec<ParticipantId> = match members {
            Some([]) => {
                return Err(QueueError::InvalidQueueRequest {
                    reason: "group has no resolvable members".to_string(),
                }
                .into())
            }
            Some(list) => list.to_vec(),
            None => vec![leader],
        };

        // an identity can hold at most one queue membership at a time
        for &member in &member_ids {
            if self.players.contains_key(&member) {
                warn!(participant = member, "participant re-queued while still queued, removing stale membership");
                self.remove_player(member, false);
            }
        }

        let now = self.clock.now_ms();
        let id = self.next_group_id;
        self.next_group_id += 1;

        let mut entry = GroupEntry::new(
            id,
            self.session_type,
            request.variant,
            request.team,
            now,
            request.rating,
            request.matchmaking_rating,
            request.party,
        );
        for &member in &member_ids {
            entry.members.insert(
                member,
                QueuedParticipant {
                    last_seen_ms: now,
                    group: id,
                },
            );
            self.players.insert(
                member,
                IndexEntry {
                    group: id,
                    team: request.team,
                },
            );
        }

        let category = if request.variant.rated || request.premade {
            QueueCategory::Premade
        } else {
            QueueCategory::Normal
        };
        let sub = SubQueueId {
            category,
            team: request.team,
        };
        debug!(
            group = id,
            leader,
            members = member_ids.len(),
            bracket,
            team = %request.team,
            ?category,
            "queued group"
        );
        self.brackets[bracket].queue_mut(sub).push_back(entry);
        Ok(id)
    }

    /// Remove one participant from the queue.
    ///
    /// Destroys the owning group when it empties; cascades over the
    /// remaining members of an uninvited rated group; reports a forfeit for
    /// a skirmish participant abandoning an active invitation. A no-op for
    /// identities that are not queued.
    pub fn remove_player(&mut self, id: ParticipantId, decrease_invited: bool) {
        let Some(index_entry) = self.players.get(&id).copied() else {
            return;
        };

        // mostly high brackets are populated, so scan from the top; both
        // categories of the indexed team must be checked because entries
        // move between them
        let mut location: Option<(BracketId, SubQueueId, usize)> = None;
        'search: for bracket in (0..BRACKET_COUNT).rev() {
            for category in [QueueCategory::Premade, QueueCategory::Normal] {
                let sub = SubQueueId {
                    category,
                    team: index_entry.team,
                };
                if let Some(pos) = self.brackets[bracket]
                    .queue(sub)
                    .iter()
                    .position(|g| g.id == index_entry.group)
                {
                    location = Some((bracket, sub, pos));
                    break 'search;
                }
            }
        }
        let Some((bracket, sub, pos)) = location else {
            error!(
                participant = id,
                group = index_entry.group,
                "queue index references a missing group"
            );
            return;
        };
        debug!(participant = id, bracket, "removing participant from queue");

        let (invite, team, variant, opponents_mmr, now_empty, next_member) = {
            let group = &mut self.brackets[bracket].queue_mut(sub)[pos];
            group.members.remove(&id);
            (
                group.invite,
                group.team,
                group.variant,
                group.opponents_matchmaking_rating,
                group.members.is_empty(),
                group.members.keys().next().copied(),
            )
        };

        if decrease_invited {
            if let Some(invitation) = invite {
                self.instances.decrease_invited(invitation.instance, team);
            }
        }

        self.players.remove(&id);

        // abandoning an active skirmish invitation forfeits rating
        if invite.is_some() && variant.skirmish && decrease_invited {
            if self.directory.find_online(id).is_some() {
                self.ratings
                    .adjust_for_forfeit(id, variant.bracket_slot(), opponents_mmr);
            }
        }

        if now_empty {
            self.brackets[bracket].queue_mut(sub).remove(pos);
        } else if invite.is_none() && variant.rated {
            // one member leaving an uninvited rated party takes the whole
            // party out of the queue
            if let Some(next) = next_member {
                if let Some(online) = self.directory.find_online(next) {
                    self.notifier.notify_status(crate::external::StatusNotification {
                        participant: next,
                        instance: None,
                        queue_slot: online.queue_slot,
                        status: QueueStatus::Removed,
                        remaining_ms: 0,
                        arena_size: variant.arena_size,
                    });
                }
                self.remove_player(next, decrease_invited);
            }
        }
    }

    /// Whether the participant currently holds an invitation to exactly
    /// this instance with exactly this deadline. This is the staleness
    /// guard consulted by timer callbacks.
    pub fn is_invited(&self, id: ParticipantId, instance: InstanceId, deadline_ms: u64) -> bool {
        self.group_of(id)
            .map(|group| {
                group.invite
                    == Some(Invitation {
                        instance,
                        deadline_ms,
                    })
            })
            .unwrap_or(false)
    }

    /// Read-only lookup of the group a participant is queued under
    pub fn group_of(&self, id: ParticipantId) -> Option<&GroupEntry> {
        let index_entry = self.players.get(&id)?;
        for bracket in (0..BRACKET_COUNT).rev() {
            for category in [QueueCategory::Premade, QueueCategory::Normal] {
                let sub = SubQueueId {
                    category,
                    team: index_entry.team,
                };
                if let Some(group) = self.brackets[bracket]
                    .queue(sub)
                    .iter()
                    .find(|g| g.id == index_entry.group)
                {
                    return Some(group);
                }
            }
        }
        None
    }

    /// Average enqueue-to-invite latency for entries like this one, in
    /// milliseconds; 0 while unavailable
    pub fn average_wait_time(&self, entry: &GroupEntry, bracket: BracketId) -> u64 {
        let bucket = WaitTimeTracker::bucket_of(entry.variant, entry.team);
        self.wait_times.average(bucket, bracket)
    }

    pub(super) fn bracket_is_empty(&self, bracket: BracketId) -> bool {
        self.brackets[bracket].is_empty()
    }

    /// Find a group anywhere within one bracket
    pub(super) fn group_in_bracket_mut(
        &mut self,
        bracket: BracketId,
        group: GroupId,
    ) -> Option<&mut GroupEntry> {
        let queues = &mut self.brackets[bracket];
        for team in TEAMS {
            for category in [QueueCategory::Premade, QueueCategory::Normal] {
                let sub = SubQueueId { category, team };
                let index = queues.queue(sub).iter().position(|g| g.id == group);
                if let Some(index) = index {
                    return queues.queue_mut(sub).get_mut(index);
                }
            }
        }
        None
    }

    pub(super) fn group_in(
        &self,
        bracket: BracketId,
        sub: SubQueueId,
        group: GroupId,
    ) -> Option<&GroupEntry> {
        self.brackets[bracket]
            .queue(sub)
            .iter()
            .find(|g| g.id == group)
    }

    /// Detach a group from a sub-queue, returning it by value
    pub(super) fn remove_group_from(
        &mut self,
        bracket: BracketId,
        sub: SubQueueId,
        group: GroupId,
    ) -> Option<GroupEntry> {
        let queue = self.brackets[bracket].queue_mut(sub);
        let pos = queue.iter().position(|g| g.id == group)?;
        queue.remove(pos)
    }

    /// Re-tag the index entries of a flipped group's members
    pub(super) fn retag_members(&mut self, entry: &GroupEntry, team: Team) {
        for member in entry.members.keys() {
            if let Some(slot) = self.players.get_mut(member) {
                slot.team = team;
            }
        }
    }
}
