//! Scheduled invitation callbacks
//!
//! Reminder and timeout events carry an immutable snapshot of the
//! invitation they were armed for. The deadline doubles as the cancellation
//! token: a fired event whose (instance, deadline) pair no longer matches
//! live queue state is silently discarded by the handler.

use crate::types::{InstanceId, ParticipantId};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Immutable snapshot of one invitation, captured at arming time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteToken {
    pub participant: ParticipantId,
    pub instance: InstanceId,
    /// The exact deadline the invitation was armed with
    pub deadline_ms: u64,
}

/// The two callbacks armed per invited participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteTimer {
    /// Restates the remaining acceptance time partway through the window
    Reminder(InviteToken),
    /// Forces removal at the deadline unless the token went stale
    Timeout(InviteToken),
}

#[derive(Debug, PartialEq, Eq)]
struct Scheduled {
    fire_at_ms: u64,
    seq: u64,
    timer: InviteTimer,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.fire_at_ms, self.seq).cmp(&(other.fire_at_ms, other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending invitation callbacks, drained by the driver
#[derive(Debug, Default)]
pub struct TimerWheel {
    pending: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at_ms: u64, timer: InviteTimer) {
        self.pending.push(Reverse(Scheduled {
            fire_at_ms,
            seq: self.seq,
            timer,
        }));
        self.seq += 1;
    }

    /// Remove and return every timer due at or before `now_ms`, in
    /// (fire time, insertion) order
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<InviteTimer> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.pending.peek() {
            if next.fire_at_ms > now_ms {
                break;
            }
            let Reverse(scheduled) = self.pending.pop().expect("peeked entry vanished");
            due.push(scheduled.timer);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn token(participant: ParticipantId, deadline_ms: u64) -> InviteToken {
        InviteToken {
            participant,
            instance: Uuid::nil(),
            deadline_ms,
        }
    }

    #[test]
    fn pops_only_due_timers_in_order() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(300, InviteTimer::Timeout(token(1, 300)));
        wheel.schedule(100, InviteTimer::Reminder(token(1, 300)));
        wheel.schedule(200, InviteTimer::Reminder(token(2, 400)));

        assert!(wheel.pop_due(50).is_empty());

        let due = wheel.pop_due(250);
        assert_eq!(
            due,
            vec![
                InviteTimer::Reminder(token(1, 300)),
                InviteTimer::Reminder(token(2, 400)),
            ]
        );
        assert_eq!(wheel.len(), 1);

        let rest = wheel.pop_due(1_000);
        assert_eq!(rest, vec![InviteTimer::Timeout(token(1, 300))]);
        assert!(wheel.is_empty());
    }

    #[test]
    fn equal_fire_times_keep_insertion_order() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(100, InviteTimer::Reminder(token(1, 500)));
        wheel.schedule(100, InviteTimer::Reminder(token(2, 500)));
        wheel.schedule(100, InviteTimer::Reminder(token(3, 500)));

        let due = wheel.pop_due(100);
        let order: Vec<_> = due
            .iter()
            .map(|t| match t {
                InviteTimer::Reminder(tok) | InviteTimer::Timeout(tok) => tok.participant,
            })
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
