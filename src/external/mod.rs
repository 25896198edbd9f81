//! Collaborator interfaces at the engine boundary
//!
//! The engine never reaches into global managers; every external concern
//! (instance bookkeeping, presence lookup, rating adjustment, status
//! delivery, time) is injected as a trait object at construction. In-memory
//! implementations are provided for the simulator and for tests.

pub mod clock;
pub mod instances;
pub mod notify;
pub mod presence;
pub mod rating;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use instances::{InMemoryInstanceDirectory, InstanceDirectory, SessionTemplate};
pub use notify::{LogNotifier, Notifier, RecordingNotifier, StatusNotification};
pub use presence::{OnlineParticipant, PlayerDirectory, StaticPlayerDirectory};
pub use rating::{NullRatingService, RatingService};
