//! Status notification interface
//!
//! The engine reports queue status changes (invitation, reminder, removal)
//! through this boundary; transport and message formatting are not its
//! concern.

use crate::types::{InstanceId, ParticipantId, QueueStatus};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::info;

/// One status change reported to a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotification {
    pub participant: ParticipantId,
    pub instance: Option<InstanceId>,
    pub queue_slot: u32,
    pub status: QueueStatus,
    /// Time left on the invitation, 0 when not applicable
    pub remaining_ms: u64,
    /// Arena size of the queued variant, 0 for standard sessions
    pub arena_size: u8,
}

/// Status delivery consumed by the engine
pub trait Notifier: Send + Sync {
    fn notify_status(&self, notification: StatusNotification);
}

/// Notifier that logs every status change
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn notify_status(&self, notification: StatusNotification) {
        info!(
            participant = notification.participant,
            instance = ?notification.instance,
            status = ?notification.status,
            remaining_ms = notification.remaining_ms,
            "queue status changed"
        );
    }
}

/// Notifier that records every status change, for tests and the simulator
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<StatusNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<StatusNotification> {
        self.sent.read().expect("notifier lock poisoned").clone()
    }

    pub fn sent_to(&self, participant: ParticipantId) -> Vec<StatusNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.participant == participant)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.write().expect("notifier lock poisoned").clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify_status(&self, notification: StatusNotification) {
        self.sent
            .write()
            .expect("notifier lock poisoned")
            .push(notification);
    }
}
