use crate::{entry_log::SequentialCursor, records::record::Record, types::SequenceId};

/// Progress of one transport through the records of a locally written entry
pub(crate) struct PackState {
    pub(crate) cursor: SequentialCursor,
    /// Last record sent, base of the next difference
    pub(crate) reference: Option<(SequenceId, Box<dyn Record>)>,
    pub(crate) full_requested: bool,
    /// Differences sent since the last full record
    pub(crate) since_full: u32,
}

impl PackState {
    pub(crate) fn new(cursor: SequentialCursor) -> Self {
        Self {
            cursor,
            reference: None,
            full_requested: false,
            since_full: 0,
        }
    }
}

/// Diff base kept for an entry fed by a remote end
#[derive(Default)]
pub(crate) struct RemoteFeed {
    pub(crate) last: Option<(SequenceId, Box<dyn Record>)>,
    pub(crate) awaiting_full: bool,
}

/// What became of a data message for a remote-fed entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteUpdate {
    Applied,
    /// Difference dropped, a full record has already been asked for
    Skipped,
    /// Difference dropped, the sender must be asked for a full record
    NeedsFull,
}

/// Outcome of packing data for one transport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackReport {
    /// Messages completely written
    pub messages: u32,
    /// Records dropped because they can never be packed
    pub skipped: u32,
    /// Length of the store up to the end of the last complete message,
    /// only these bytes may be sent
    pub complete_len: usize,
    /// The store ran out of space, the rest waits for the next call
    pub store_full: bool,
}
