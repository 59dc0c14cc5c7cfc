//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ProgressState` / `ProgressEntry`: the resumable per-unit pagination state
//! - `DedupIndex`: record keys already emitted, shared by all workers
//! - `UnitState`: the per-page steps of a unit

mod dedup;
mod progress;
mod unit_state;

// Re-export main types
pub use dedup::DedupIndex;
pub use progress::{Checkpoint, ProgressEntry, ProgressState, PROGRESS_VERSION};
pub use unit_state::UnitState;
