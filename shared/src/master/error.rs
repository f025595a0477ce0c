use thiserror::Error;

use crate::{
    messages::ChannelCommandType,
    types::{EndId, EntryId},
};

/// Configuration requests the master refuses. Each one is logged and
/// dropped, the channel keeps its previous configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Channel only allows one entry and one is already live
    #[error("Channel allows a single entry and entry {existing} already exists")]
    ArityExceeded { existing: EntryId },

    /// Both ends know the class but disagree on its layout
    #[error("Record class {class_name:?} has magic {found:#010x} on the requesting end, {expected:#010x} on the master")]
    MagicMismatch {
        class_name: String,
        expected: u32,
        found: u32,
    },

    /// Class not registered with the master's record registry
    #[error("Record class {class_name:?} is unknown to the master. It must be registered via RecordKinds::add_record()")]
    UnknownClass { class_name: String },

    #[error("Entry {entry} not found")]
    UnknownEntry { entry: EntryId },

    /// Delete requested twice for the same entry
    #[error("Entry {entry} is already being deleted")]
    AlreadyInvalidated { entry: EntryId },

    /// Cleanup confirmation for an entry not waiting for cleanup
    #[error("No cleanup pending for entry {entry}")]
    UnknownCleanup { entry: EntryId },

    /// Same end confirmed the cleanup of an entry twice
    #[error("End {end} already confirmed cleanup of entry {entry}")]
    DuplicateConfirmation { entry: EntryId, end: EndId },

    /// Every entry id is in use
    #[error("All {count} entry ids are in use")]
    IdsExhausted { count: usize },

    /// Master received something that is not a request
    #[error("{kind:?} is not a request and cannot be applied by the master")]
    UnexpectedCommand { kind: ChannelCommandType },
}
