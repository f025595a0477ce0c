use std::{
    cell::UnsafeCell,
    sync::atomic::{AtomicU32, Ordering},
};

use crate::types::{SequenceId, TimeSpec};

/// Link value meaning "no node"
pub(crate) const NIL: u32 = u32::MAX;

/// Sequence number carried by gap markers (and by the not-yet-written sentinel)
pub const GAP_SEQUENCE: SequenceId = 0;

/// One slot of an entry log.
///
/// `refs` counts the log's own claim (1 while the node is live), one claim
/// per promised sequential reader, and one per transient reader. A node can
/// only be recycled by the writer swapping `refs` from exactly 1 to 0.
///
/// `generation` is bumped whenever the slot is recycled, which lets a
/// reader that raced with recycling detect it after acquiring.
///
/// `data`, `sequence` and the time fields are written by the writer before
/// `newer` is published and stay untouched until the slot is recycled.
pub(crate) struct DataNode<T> {
    refs: AtomicU32,
    generation: AtomicU32,
    sequence: AtomicU32,
    start: AtomicU32,
    end: AtomicU32,
    older: AtomicU32,
    newer: AtomicU32,
    data: UnsafeCell<Option<T>>,
}

impl<T> DataNode<T> {
    pub(crate) fn vacant() -> Self {
        Self {
            refs: AtomicU32::new(0),
            generation: AtomicU32::new(0),
            sequence: AtomicU32::new(GAP_SEQUENCE),
            start: AtomicU32::new(0),
            end: AtomicU32::new(0),
            older: AtomicU32::new(NIL),
            newer: AtomicU32::new(NIL),
            data: UnsafeCell::new(None),
        }
    }

    // Reader side

    /// Increments `refs` only while it is non-zero
    pub(crate) fn try_acquire(&self) -> bool {
        let mut current = self.refs.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }
            match self.refs.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn release(&self) {
        let previous = self.refs.fetch_sub(1, Ordering::Release);
        debug_assert!(previous > 0, "released a data node that was not held");
    }

    pub(crate) fn refs(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// A node is published once its successor is linked; before that it is
    /// the write sentinel and carries nothing readable.
    pub(crate) fn newer(&self) -> u32 {
        self.newer.load(Ordering::Acquire)
    }

    pub(crate) fn older(&self) -> u32 {
        self.older.load(Ordering::Acquire)
    }

    pub(crate) fn is_published(&self) -> bool {
        self.newer() != NIL
    }

    pub(crate) fn sequence(&self) -> SequenceId {
        self.sequence.load(Ordering::Relaxed)
    }

    pub(crate) fn is_gap(&self) -> bool {
        self.sequence() == GAP_SEQUENCE
    }

    pub(crate) fn time(&self) -> TimeSpec {
        TimeSpec::span(
            self.start.load(Ordering::Relaxed),
            self.end.load(Ordering::Relaxed),
        )
    }

    /// # Safety
    /// The caller must hold a claim on a published node.
    pub(crate) unsafe fn data(&self) -> Option<&T> {
        (*self.data.get()).as_ref()
    }

    /// Adds a claim to a node the caller already holds, or that the writer
    /// knows to be live
    pub(crate) fn claim(&self) {
        self.refs.fetch_add(1, Ordering::AcqRel);
    }

    // Writer side, always called with the log's writer lock held

    /// Swaps `refs` from 1 to 0, succeeding only when nobody else holds it
    pub(crate) fn try_retire(&self) -> bool {
        self.refs
            .compare_exchange(1, 0, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Turns a vacant slot into a live, unpublished node
    pub(crate) fn prepare(&self, refs: u32, older: u32) {
        debug_assert_eq!(self.refs.load(Ordering::Relaxed), 0);
        self.sequence.store(GAP_SEQUENCE, Ordering::Relaxed);
        self.start.store(0, Ordering::Relaxed);
        self.end.store(0, Ordering::Relaxed);
        self.older.store(older, Ordering::Relaxed);
        self.newer.store(NIL, Ordering::Relaxed);
        self.refs.store(refs, Ordering::Release);
    }

    /// Writes content into an unpublished node
    ///
    /// # Safety
    /// The node must not be published yet, so no reader looks at `data`.
    pub(crate) unsafe fn fill(&self, sequence: SequenceId, time: TimeSpec, data: Option<T>) {
        self.sequence.store(sequence, Ordering::Relaxed);
        self.start.store(time.start, Ordering::Relaxed);
        self.end.store(time.end, Ordering::Relaxed);
        *self.data.get() = data;
    }

    pub(crate) fn publish(&self, newer: u32) {
        self.newer.store(newer, Ordering::Release);
    }

    pub(crate) fn unlink_older(&self) {
        self.older.store(NIL, Ordering::Release);
    }

    /// Drops the content of a retired node and invalidates old references
    ///
    /// # Safety
    /// `try_retire` must have succeeded on this node.
    pub(crate) unsafe fn vacate(&self) {
        *self.data.get() = None;
        self.older.store(NIL, Ordering::Relaxed);
        self.newer.store(NIL, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
    }
}
