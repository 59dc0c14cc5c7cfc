//! Per-page steps of a work unit

use std::fmt;

/// Steps a unit goes through for each page
///
/// A unit loops `Fetching` through `Checkpointing` once per page and ends in
/// `Done`. The transitions are logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Requesting the given page from the source
    Fetching(u32),

    /// Turning page content into raw records
    Parsing,

    /// Claiming record keys against the dedup index
    Deduping,

    /// Appending surviving records to the sink
    Persisting,

    /// Writing the page to the progress document
    Checkpointing,

    /// No more pages will be processed in this run
    Done,
}

impl UnitState {
    /// Returns true once the unit loop has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true while a lock-holding step is running
    pub fn holds_lock(&self) -> bool {
        matches!(self, Self::Deduping | Self::Persisting | Self::Checkpointing)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching(page) => write!(f, "fetching page {}", page),
            Self::Parsing => write!(f, "parsing"),
            Self::Deduping => write!(f, "deduping"),
            Self::Persisting => write!(f, "persisting"),
            Self::Checkpointing => write!(f, "checkpointing"),
            Self::Done => write!(f, "done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(UnitState::Done.is_terminal());
        assert!(!UnitState::Fetching(1).is_terminal());
        assert!(!UnitState::Checkpointing.is_terminal());
    }

    #[test]
    fn test_fetch_and_parse_hold_no_lock() {
        assert!(!UnitState::Fetching(3).holds_lock());
        assert!(!UnitState::Parsing.holds_lock());
        assert!(UnitState::Persisting.holds_lock());
    }

    #[test]
    fn test_display() {
        assert_eq!(UnitState::Fetching(2).to_string(), "fetching page 2");
        assert_eq!(UnitState::Done.to_string(), "done");
    }
}
