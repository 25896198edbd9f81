//! Instance directory interface and in-memory implementation
//!
//! The directory owns session templates and live instances; the engine only
//! ever sees opaque handles, free-slot counts, and per-team invited
//! counters.

use crate::error::{QueueError, Result};
use crate::types::{BracketId, InstanceId, MatchVariant, SessionKind, SessionTypeId, Team};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Static description of a session type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTemplate {
    pub session_type: SessionTypeId,
    pub kind: SessionKind,
    pub rated: bool,
    pub min_per_team: u32,
    pub max_per_team: u32,
}

/// Session instance bookkeeping consumed by the engine
pub trait InstanceDirectory: Send + Sync {
    /// Look up the template for a session type
    fn template(&self, session_type: SessionTypeId) -> Option<SessionTemplate>;

    /// Instances of this type and bracket that can still admit participants,
    /// in admission-priority order
    fn find_free_instances(&self, session_type: SessionTypeId, bracket: BracketId)
        -> Vec<InstanceId>;

    /// Create a fresh instance for a new match
    fn create_instance(
        &self,
        session_type: SessionTypeId,
        bracket: BracketId,
        variant: MatchVariant,
    ) -> Result<InstanceId>;

    /// Start an instance once its selection pools were invited
    fn start_instance(&self, instance: InstanceId);

    /// Free participant slots remaining on one team of an instance
    fn free_slots(&self, instance: InstanceId, team: Team) -> u32;

    /// Whether any team of the instance still has free slots
    fn has_free_slots(&self, instance: InstanceId) -> bool;

    /// Account for one more invited participant on a team
    fn increase_invited(&self, instance: InstanceId, team: Team);

    /// Account for one fewer invited participant on a team
    fn decrease_invited(&self, instance: InstanceId, team: Team);

    /// Stop offering the instance for backfill
    fn remove_from_free_list(&self, instance: InstanceId);
}

#[derive(Debug, Clone)]
struct InstanceState {
    session_type: SessionTypeId,
    bracket: BracketId,
    max_per_team: u32,
    invited: [u32; Team::COUNT],
    started: bool,
    in_free_list: bool,
}

/// In-memory instance directory for the simulator and tests
#[derive(Debug, Default)]
pub struct InMemoryInstanceDirectory {
    templates: RwLock<HashMap<SessionTypeId, SessionTemplate>>,
    instances: RwLock<HashMap<InstanceId, InstanceState>>,
    creation_order: RwLock<Vec<InstanceId>>,
}

impl InMemoryInstanceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session template; replaces any previous registration
    pub fn register_template(&self, template: SessionTemplate) {
        self.templates
            .write()
            .expect("template lock poisoned")
            .insert(template.session_type, template);
    }

    /// Number of live instances
    pub fn instance_count(&self) -> usize {
        self.instances.read().expect("instance lock poisoned").len()
    }

    /// Instances that have been started
    pub fn started_instances(&self) -> Vec<InstanceId> {
        let instances = self.instances.read().expect("instance lock poisoned");
        let order = self.creation_order.read().expect("order lock poisoned");
        order
            .iter()
            .filter(|id| instances.get(id).map(|s| s.started).unwrap_or(false))
            .copied()
            .collect()
    }

    /// Invited counter for one team of an instance
    pub fn invited_count(&self, instance: InstanceId, team: Team) -> u32 {
        self.instances
            .read()
            .expect("instance lock poisoned")
            .get(&instance)
            .map(|s| s.invited[team.index()])
            .unwrap_or(0)
    }
}

impl InstanceDirectory for InMemoryInstanceDirectory {
    fn template(&self, session_type: SessionTypeId) -> Option<SessionTemplate> {
        self.templates
            .read()
            .expect("template lock poisoned")
            .get(&session_type)
            .copied()
    }

    fn find_free_instances(
        &self,
        session_type: SessionTypeId,
        bracket: BracketId,
    ) -> Vec<InstanceId> {
        let instances = self.instances.read().expect("instance lock poisoned");
        let order = self.creation_order.read().expect("order lock poisoned");
        order
            .iter()
            .filter(|id| {
                instances
                    .get(id)
                    .map(|s| {
                        s.in_free_list
                            && s.started
                            && s.session_type == session_type
                            && s.bracket == bracket
                    })
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    fn create_instance(
        &self,
        session_type: SessionTypeId,
        bracket: BracketId,
        variant: MatchVariant,
    ) -> Result<InstanceId> {
        let template = self.template(session_type).ok_or_else(|| {
            QueueError::InstanceCreationFailed {
                session_type,
                reason: "unknown template".to_string(),
            }
        })?;
        let max_per_team = if variant.is_arena() {
            variant.arena_size as u32
        } else {
            template.max_per_team
        };
        let id = Uuid::new_v4();
        self.instances
            .write()
            .expect("instance lock poisoned")
            .insert(
                id,
                InstanceState {
                    session_type,
                    bracket,
                    max_per_team,
                    invited: [0; Team::COUNT],
                    started: false,
                    in_free_list: true,
                },
            );
        self.creation_order
            .write()
            .expect("order lock poisoned")
            .push(id);
        debug!(%id, session_type, bracket, "created instance");
        Ok(id)
    }

    fn start_instance(&self, instance: InstanceId) {
        if let Some(state) = self
            .instances
            .write()
            .expect("instance lock poisoned")
            .get_mut(&instance)
        {
            state.started = true;
        }
    }

    fn free_slots(&self, instance: InstanceId, team: Team) -> u32 {
        self.instances
            .read()
            .expect("instance lock poisoned")
            .get(&instance)
            .map(|s| s.max_per_team.saturating_sub(s.invited[team.index()]))
            .unwrap_or(0)
    }

    fn has_free_slots(&self, instance: InstanceId) -> bool {
        self.instances
            .read()
            .expect("instance lock poisoned")
            .get(&instance)
            .map(|s| s.invited.iter().any(|&count| count < s.max_per_team))
            .unwrap_or(false)
    }

    fn increase_invited(&self, instance: InstanceId, team: Team) {
        if let Some(state) = self
            .instances
            .write()
            .expect("instance lock poisoned")
            .get_mut(&instance)
        {
            state.invited[team.index()] += 1;
        }
    }

    fn decrease_invited(&self, instance: InstanceId, team: Team) {
        if let Some(state) = self
            .instances
            .write()
            .expect("instance lock poisoned")
            .get_mut(&instance)
        {
            state.invited[team.index()] = state.invited[team.index()].saturating_sub(1);
        }
    }

    fn remove_from_free_list(&self, instance: InstanceId) {
        if let Some(state) = self
            .instances
            .write()
            .expect("instance lock poisoned")
            .get_mut(&instance)
        {
            state.in_free_list = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_template() -> SessionTemplate {
        SessionTemplate {
            session_type: 1,
            kind: SessionKind::Standard,
            rated: false,
            min_per_team: 2,
            max_per_team: 5,
        }
    }

    #[test]
    fn create_requires_registered_template() {
        let directory = InMemoryInstanceDirectory::new();
        assert!(directory
            .create_instance(99, 0, MatchVariant::standard())
            .is_err());

        directory.register_template(standard_template());
        assert!(directory
            .create_instance(1, 0, MatchVariant::standard())
            .is_ok());
    }

    #[test]
    fn invited_counters_track_free_slots() {
        let directory = InMemoryInstanceDirectory::new();
        directory.register_template(standard_template());
        let id = directory
            .create_instance(1, 0, MatchVariant::standard())
            .unwrap();

        assert_eq!(directory.free_slots(id, Team::A), 5);
        directory.increase_invited(id, Team::A);
        directory.increase_invited(id, Team::A);
        assert_eq!(directory.free_slots(id, Team::A), 3);
        directory.decrease_invited(id, Team::A);
        assert_eq!(directory.free_slots(id, Team::A), 4);
        assert!(directory.has_free_slots(id));
    }

    #[test]
    fn free_list_only_offers_started_matching_instances() {
        let directory = InMemoryInstanceDirectory::new();
        directory.register_template(standard_template());
        let id = directory
            .create_instance(1, 3, MatchVariant::standard())
            .unwrap();

        // not yet started: no backfill
        assert!(directory.find_free_instances(1, 3).is_empty());

        directory.start_instance(id);
        assert_eq!(directory.find_free_instances(1, 3), vec![id]);
        assert!(directory.find_free_instances(1, 2).is_empty());
        assert!(directory.find_free_instances(2, 3).is_empty());

        directory.remove_from_free_list(id);
        assert!(directory.find_free_instances(1, 3).is_empty());
    }

    #[test]
    fn arena_variant_overrides_capacity() {
        let directory = InMemoryInstanceDirectory::new();
        directory.register_template(SessionTemplate {
            session_type: 2,
            kind: SessionKind::Arena,
            rated: true,
            min_per_team: 5,
            max_per_team: 5,
        });
        let id = directory
            .create_instance(2, 0, MatchVariant::arena(3, true))
            .unwrap();
        assert_eq!(directory.free_slots(id, Team::B), 3);
    }
}
