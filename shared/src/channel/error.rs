use thiserror::Error;
use tandem_serde::SerdeErr;

use crate::{
    entry::EntryError,
    master::ConfigurationError,
    records::error::RecordKindsError,
    types::{CreationId, EntryId},
};

/// Errors that can occur when using a channel or its tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Write attempted before the master confirmed the writer's entry
    #[error("Writer {creation} has no confirmed entry yet. Wait until WriteToken::is_valid() returns true")]
    WriterNotValid { creation: CreationId },

    /// The master refused the writer's entry, for example because the
    /// channel allows only one entry
    #[error("Writer {creation} was refused an entry by the channel master")]
    WriterRefused { creation: CreationId },

    #[error("Entry {entry} not found in channel")]
    UnknownEntry { entry: EntryId },

    /// Transport index not handed out by Channel::add_transport()
    #[error("Transport {transport} not found. Transports must be registered via Channel::add_transport()")]
    UnknownTransport { transport: usize },

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error(transparent)]
    Serde(#[from] SerdeErr),

    #[error(transparent)]
    RecordKinds(#[from] RecordKindsError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
