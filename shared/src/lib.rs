//! # Tandem Shared
//! The publish/subscribe channel engine every tandem channel end runs:
//! lock-free entry logs, async queues, channels with their read and write
//! tokens, and the channel master protocol keeping configuration
//! consistent across ends.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use tandem_serde::{
    BigMark, ConstByteLength, Mark, Serde, SerdeErr, WireReader, WireStore,
    DEFAULT_STORE_CAPACITY,
};

mod async_queue;
mod channel;
mod entry;
mod entry_log;
mod master;
mod messages;
mod records;
mod service;
mod types;

pub use async_queue::AsyncQueue;
pub use channel::{
    Channel, ChannelArity, ChannelConfig, ChannelError, ChannelEvent, ChannelWatcher, EndRole,
    EntrySelector, ReadMode, ReadOptions, ReadOutcome, ReadToken, RecordAccess, WriteToken,
};
pub use entry::{
    Entry, EntryDescription, EntryError, EntryOptions, EntryTrigger, PackReport, PackingMode,
    RemoteUpdate, TransportClass, TransportNotifier,
};
pub use entry_log::{
    DataAccess, EntryLog, EntryLogError, Retention, SaveupMode, SequentialCursor, SequentialRead,
    GAP_SEQUENCE, MAX_NODES,
};
pub use master::{ChannelMaster, ConfigurationError, EntryIdGenerator};
pub use messages::{ChannelCommand, ChannelCommandType, DataHeader, DataMessageKind};
pub use records::{
    error::RecordKindsError,
    record::{Record, RecordClass},
    record_kinds::{RecordKind, RecordKinds},
};
pub use service::{PeriodicService, ServiceRegistry};
pub use types::{
    ClientId, CreationId, EndId, EntryId, SequenceId, TimeAspect, TimeSpec, TimeTick,
    MAX_TIMETICK,
};
