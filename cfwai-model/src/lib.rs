//! Shared data model for the acquisition pipeline: the `Item` that flows
//! through every stage, the matcher's scored outputs, and the small
//! enumerations stages use to name queues, archives, and themselves.

pub mod item;
pub mod outcome;
pub mod stage;

pub use item::{EpisodeMatch, EpisodeRecord, Item, ShowMatch};
pub use outcome::Outcome;
pub use stage::Stage;
