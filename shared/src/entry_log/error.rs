use thiserror::Error;

use crate::types::TimeTick;

/// Errors that can occur when appending to an entry log. Every one of them
/// leaves the log unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryLogError {
    /// Event written with a time stamp before the latest event
    #[error("Event time {requested} precedes the latest event time {latest}. Write ignored")]
    TimeNotMonotonic { latest: TimeTick, requested: TimeTick },

    /// Stream interval starts before the previous interval ends
    #[error("Stream interval [{start}, {end}) overlaps data valid until {latest_end}. Write ignored")]
    OverlappingInterval {
        latest_end: TimeTick,
        start: TimeTick,
        end: TimeTick,
    },

    /// Stream interval without duration
    #[error("Stream interval [{start}, {end}) is empty. Write ignored")]
    EmptyInterval { start: TimeTick, end: TimeTick },

    /// Every node slot is in use by unreleased data
    #[error("Node pool exhausted at {capacity} nodes. Readers are holding on to too much data")]
    PoolExhausted { capacity: usize },
}
