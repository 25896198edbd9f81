//! Queue storage, match assembly and invitation lifecycle
//!
//! `SessionQueue` holds the per-bracket waiting pools and drives every
//! matchmaking decision. The sibling modules split the engine by concern:
//! storage and membership (`store`), roster assembly (`assembly`, `pool`),
//! rated opponent search (`rated`) and the invitation state machine
//! (`lifecycle`).

pub mod assembly;
pub mod entry;
pub mod lifecycle;
pub mod pool;
pub mod rated;
pub mod store;

// Re-export commonly used types
pub use entry::{GroupEntry, Invitation, QueuedParticipant};
pub use pool::{SelectedGroup, SelectionPool};
pub use rated::ARENA_RATING_WIDEN_PER_MINUTE;
pub use store::{EnqueueRequest, SessionQueue};
