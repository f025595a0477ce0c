use thiserror::Error;
use tandem_serde::SerdeErr;

use crate::{entry_log::EntryLogError, types::EntryId};

/// Errors that can occur when accessing a single entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// Entry has been retracted, it accepts and serves no more data
    #[error("Entry {entry} is no longer valid")]
    Invalid { entry: EntryId },

    /// Record written to an entry of another class
    #[error("Entry {entry} carries {expected:?} records, got a {found:?} record")]
    ClassMismatch {
        entry: EntryId,
        expected: String,
        found: String,
    },

    /// Pack requested for a transport the entry is not registered with
    #[error("Entry {entry} has no packing state for transport {transport}")]
    UnknownTransport { entry: EntryId, transport: usize },

    #[error(transparent)]
    Log(#[from] EntryLogError),

    #[error(transparent)]
    Serde(#[from] SerdeErr),
}
