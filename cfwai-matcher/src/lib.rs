//! Weighted fuzzy matching of ingested titles against a library service's
//! show and episode catalogs.
//!
//! Both entry points are pure functions of their inputs: given the same
//! title/candidates they always produce the same score and rationale, so
//! they're trivial to unit test without any network or filesystem access.

mod date;
mod episode;
mod normalize;
mod show;
mod token_ratio;

pub use date::date_distance_days;
pub use episode::episode_match;
pub use normalize::normalize;
pub use show::{ShowCandidate, show_match};
