//! Selection pools
//!
//! A selection pool is the transient per-team scratch set used while
//! assembling one match's roster. `try_add` and `kick_group` are the two
//! primitives every assembly algorithm is built on; their return values
//! drive the callers' fill loops, so their contracts are load-bearing.

use crate::queue::entry::GroupEntry;
use crate::types::GroupId;

/// Lightweight reference to a selected group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedGroup {
    pub group: GroupId,
    pub size: u32,
}

/// Per-team scratch accumulator for one assembly attempt
#[derive(Debug, Clone, Default)]
pub struct SelectionPool {
    selected: Vec<SelectedGroup>,
    player_count: u32,
}

impl SelectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the pool for a fresh selection
    pub fn reset(&mut self) {
        self.selected.clear();
        self.player_count = 0;
    }

    pub fn player_count(&self) -> u32 {
        self.player_count
    }

    pub fn selected(&self) -> &[SelectedGroup] {
        &self.selected
    }

    /// The group added most recently, if any
    pub fn last_selected(&self) -> Option<GroupId> {
        self.selected.last().map(|s| s.group)
    }

    /// Admit `entry` if it is uninvited and fits within `desired_count`.
    ///
    /// Returns true when the group was admitted, or when the pool is still
    /// below `desired_count` and a smaller candidate might fit later;
    /// returns false once the pool is at capacity and the candidate did not
    /// fit.
    pub fn try_add(&mut self, entry: &GroupEntry, desired_count: u32) -> bool {
        if !entry.is_invited() && desired_count >= self.player_count + entry.size() {
            self.selected.push(SelectedGroup {
                group: entry.id,
                size: entry.size(),
            });
            self.player_count += entry.size();
            return true;
        }
        self.player_count < desired_count
    }

    /// Evict one group chosen to bring the pool closest to `target_size`:
    /// the last group whose size is within 1 of the target, otherwise the
    /// last largest group.
    ///
    /// Returns true when the caller should try to backfill the freed
    /// capacity with another candidate (the evicted group was larger than
    /// `target_size + 1`, or the pool was already empty); returns false when
    /// the eviction already satisfies the target.
    pub fn kick_group(&mut self, target_size: u32) -> bool {
        let mut kick = 0usize;
        let mut found = false;
        for (index, candidate) in self.selected.iter().enumerate() {
            if (candidate.size as i64 - target_size as i64).abs() <= 1 {
                kick = index;
                found = true;
            } else if !found && candidate.size >= self.selected[kick].size {
                kick = index;
            }
        }
        if self.player_count > 0 {
            let evicted = self.selected.remove(kick);
            self.player_count -= evicted.size;
            if evicted.size <= target_size + 1 {
                return false;
            }
        }
        true
    }
}
