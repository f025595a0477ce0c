use std::ops::Deref;

use crate::{
    entry_log::data_node::DataNode,
    types::{SequenceId, TimeSpec},
};

/// Claimed read access to one record of an entry log.
///
/// The record cannot be recycled while this guard exists; dropping it
/// releases the claim.
pub struct DataAccess<'a, T> {
    node: &'a DataNode<T>,
    data: &'a T,
    sequence: SequenceId,
    time: TimeSpec,
}

impl<'a, T> DataAccess<'a, T> {
    /// Wraps a node the caller has already claimed; gives the claim back
    /// when the node turns out to hold no data.
    pub(crate) fn from_claimed(node: &'a DataNode<T>) -> Option<Self> {
        // SAFETY: the caller holds a claim on a published node
        match unsafe { node.data() } {
            Some(data) => Some(Self {
                node,
                data,
                sequence: node.sequence(),
                time: node.time(),
            }),
            None => {
                node.release();
                None
            }
        }
    }

    pub fn data(&self) -> &T {
        self.data
    }

    pub fn sequence(&self) -> SequenceId {
        self.sequence
    }

    pub fn time(&self) -> TimeSpec {
        self.time
    }
}

impl<T> Deref for DataAccess<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> Drop for DataAccess<'_, T> {
    fn drop(&mut self) {
        self.node.release();
    }
}

/// Outcome of one sequential read step
pub enum SequentialRead<'a, T> {
    /// Next record in write order
    Data(DataAccess<'a, T>),
    /// Explicit discontinuity in stream data
    Gap(TimeSpec),
    /// Nothing new up to the requested time
    Nothing,
}

impl<T> SequentialRead<'_, T> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, SequentialRead::Nothing)
    }
}

/// Position of a sequential reader in an entry log.
///
/// The reader holds a claim on every node from its position up to the write
/// sentinel, so nothing it has not seen yet can be pruned. Cursors are only
/// handed out by [`EntryLog::attach_sequential`](crate::EntryLog::attach_sequential)
/// and must be given back to
/// [`EntryLog::detach_sequential`](crate::EntryLog::detach_sequential).
#[derive(Debug)]
#[must_use = "a sequential cursor holds claims until it is detached"]
pub struct SequentialCursor {
    pub(crate) index: u32,
    pub(crate) consumed: bool,
}
