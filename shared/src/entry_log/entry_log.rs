//! # `EntryLog` – time-ordered record log of one entry
//!
//! A doubly linked list of [`DataNode`]s, newest last, bounded by three
//! cursors:
//!
//! | Cursor    | Meaning |
//! |-----------|---------|
//! | `latest`  | Write sentinel. Dataless until the next write fills it. |
//! | `oldest`  | Oldest node still guaranteed to be readable. |
//! | `cleanup` | Trails `oldest`; nodes from here up to `oldest` wait for their claims to drain. |
//!
//! Exactly one writer appends (serialised by the writer lock, which readers
//! never take). Readers go lock-free:
//! * time-indexed readers pin `oldest`, then walk back from `latest`;
//!   cleanup cannot get past the pin, so every node they visit stays live.
//! * sequential readers hold claims from their position to the sentinel and
//!   step forward, releasing what they pass.
//!
//! Reclamation runs after each write and only recycles a node when its
//! count swaps from exactly 1 to 0.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use log::warn;
use parking_lot::Mutex;

use crate::{
    entry_log::{
        access::{DataAccess, SequentialCursor, SequentialRead},
        data_node::{DataNode, GAP_SEQUENCE, NIL},
        error::EntryLogError,
        node_pool::NodePool,
        retention::{Retention, SaveupMode},
    },
    types::{SequenceId, TimeAspect, TimeSpec, TimeTick},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeRef {
    index: u32,
    generation: u32,
}

impl NodeRef {
    fn pack(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    fn unpack(value: u64) -> Self {
        Self {
            index: value as u32,
            generation: (value >> 32) as u32,
        }
    }
}

struct LogWriter {
    free: Vec<u32>,
    oldest: NodeRef,
    latest: NodeRef,
    cleanup: u32,
    next_sequence: SequenceId,
    last_time: Option<TimeSpec>,
    retained_records: u32,
    retention: Retention,
    saveup: SaveupMode,
    sequential_claims: u32,
}

/// Holds `oldest` in place while a time-indexed read walks the log
struct Pin<'a, T> {
    node: &'a DataNode<T>,
    index: u32,
}

impl<T> Drop for Pin<'_, T> {
    fn drop(&mut self) {
        self.node.release();
    }
}

pub struct EntryLog<T> {
    pool: NodePool<T>,
    time_aspect: TimeAspect,
    oldest: AtomicU64,
    latest: AtomicU64,
    latest_sequence: AtomicU32,
    writer: Mutex<LogWriter>,
}

// SAFETY: node contents are written by the single writer before publication
// and only read through claims afterwards; all link and count updates are
// atomic. Records are shared between reader threads, hence `T: Sync`.
unsafe impl<T: Send + Sync> Sync for EntryLog<T> {}
// SAFETY: see above.
unsafe impl<T: Send + Sync> Send for EntryLog<T> {}

impl<T> EntryLog<T> {
    pub fn new(time_aspect: TimeAspect, retention: Retention, saveup: SaveupMode) -> Result<Self, EntryLogError> {
        let pool = NodePool::new();
        let mut free: Vec<u32> = pool.grow()?.rev().collect();
        let sentinel_index = free.pop().ok_or(EntryLogError::PoolExhausted { capacity: 0 })?;
        pool.node(sentinel_index).prepare(1, NIL);

        let sentinel = NodeRef {
            index: sentinel_index,
            generation: pool.node(sentinel_index).generation(),
        };

        Ok(Self {
            pool,
            time_aspect,
            oldest: AtomicU64::new(sentinel.pack()),
            latest: AtomicU64::new(sentinel.pack()),
            latest_sequence: AtomicU32::new(GAP_SEQUENCE),
            writer: Mutex::new(LogWriter {
                free,
                oldest: sentinel,
                latest: sentinel,
                cleanup: sentinel_index,
                next_sequence: 1,
                last_time: None,
                retained_records: 0,
                retention,
                saveup,
                sequential_claims: 0,
            }),
        })
    }

    pub fn time_aspect(&self) -> TimeAspect {
        self.time_aspect
    }

    // Writing

    /// Appends a record and returns its sequence number.
    ///
    /// Stream data that does not connect to the previous interval gets an
    /// explicit gap node in front of it. Out-of-order or overlapping data is
    /// refused and leaves the log untouched.
    pub fn append(&self, data: T, time: TimeSpec) -> Result<SequenceId, EntryLogError> {
        let mut writer = self.writer.lock();

        let gap_start = match self.check_time(&writer, time) {
            Ok(gap_start) => gap_start,
            Err(error) => {
                warn!("{}", error);
                return Err(error);
            }
        };

        let time = match self.time_aspect {
            TimeAspect::Event => TimeSpec::event(time.start),
            TimeAspect::Stream => time,
        };

        let sequence = writer.next_sequence;
        let sentinel = writer.latest.index;
        let claims = 1 + writer.sequential_claims;

        match gap_start {
            None => {
                let new_sentinel = self.take_free(&mut writer)?;
                self.pool.node(new_sentinel).prepare(claims, sentinel);

                let node = self.pool.node(sentinel);
                // SAFETY: `sentinel` is not published yet
                unsafe { node.fill(sequence, time, Some(data)) };
                node.publish(new_sentinel);
                self.set_latest(&mut writer, new_sentinel);
            }
            Some(gap_start) => {
                let data_index = self.take_free(&mut writer)?;
                let new_sentinel = match self.take_free(&mut writer) {
                    Ok(index) => index,
                    Err(error) => {
                        writer.free.push(data_index);
                        return Err(error);
                    }
                };
                self.pool.node(new_sentinel).prepare(claims, data_index);

                let data_node = self.pool.node(data_index);
                data_node.prepare(claims, sentinel);
                // SAFETY: freshly prepared, not linked from anywhere yet
                unsafe { data_node.fill(sequence, time, Some(data)) };
                data_node.publish(new_sentinel);

                let gap_node = self.pool.node(sentinel);
                // SAFETY: `sentinel` is not published yet
                unsafe {
                    gap_node.fill(GAP_SEQUENCE, TimeSpec::span(gap_start, time.start), None)
                };
                gap_node.publish(data_index);
                self.set_latest(&mut writer, new_sentinel);
            }
        }

        writer.next_sequence += 1;
        writer.last_time = Some(time);
        writer.retained_records += 1;
        self.latest_sequence.store(sequence, Ordering::Release);

        self.reclaim(&mut writer);
        Ok(sequence)
    }

    /// Records an explicit discontinuity in stream data, up to `until`.
    /// Has no effect on event logs or before the first write.
    pub fn mark_gap(&self, until: TimeTick) -> Result<(), EntryLogError> {
        if self.time_aspect != TimeAspect::Stream {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        let Some(last_time) = writer.last_time else {
            return Ok(());
        };
        if until <= last_time.end {
            return Ok(());
        }

        let sentinel = writer.latest.index;
        let new_sentinel = self.take_free(&mut writer)?;
        self.pool
            .node(new_sentinel)
            .prepare(1 + writer.sequential_claims, sentinel);

        let gap_node = self.pool.node(sentinel);
        let gap = TimeSpec::span(last_time.end, until);
        // SAFETY: `sentinel` is not published yet
        unsafe { gap_node.fill(GAP_SEQUENCE, gap, None) };
        gap_node.publish(new_sentinel);
        self.set_latest(&mut writer, new_sentinel);
        writer.last_time = Some(gap);

        self.reclaim(&mut writer);
        Ok(())
    }

    /// Returns the start of the gap the write opens, if any
    fn check_time(&self, writer: &LogWriter, time: TimeSpec) -> Result<Option<TimeTick>, EntryLogError> {
        match self.time_aspect {
            TimeAspect::Event => {
                if let Some(last) = writer.last_time {
                    if time.start < last.start {
                        return Err(EntryLogError::TimeNotMonotonic {
                            latest: last.start,
                            requested: time.start,
                        });
                    }
                }
                Ok(None)
            }
            TimeAspect::Stream => {
                if time.end <= time.start {
                    return Err(EntryLogError::EmptyInterval {
                        start: time.start,
                        end: time.end,
                    });
                }
                match writer.last_time {
                    None => Ok(None),
                    Some(last) if time.start < last.end => Err(EntryLogError::OverlappingInterval {
                        latest_end: last.end,
                        start: time.start,
                        end: time.end,
                    }),
                    Some(last) if time.start > last.end => Ok(Some(last.end)),
                    Some(_) => Ok(None),
                }
            }
        }
    }

    fn take_free(&self, writer: &mut LogWriter) -> Result<u32, EntryLogError> {
        if writer.free.is_empty() {
            writer.free.extend(self.pool.grow()?.rev());
        }
        writer
            .free
            .pop()
            .ok_or(EntryLogError::PoolExhausted {
                capacity: self.pool.allocated(),
            })
    }

    fn set_latest(&self, writer: &mut LogWriter, index: u32) {
        writer.latest = NodeRef {
            index,
            generation: self.pool.node(index).generation(),
        };
        self.latest.store(writer.latest.pack(), Ordering::Release);
    }

    // Reclamation

    fn reclaim(&self, writer: &mut LogWriter) {
        if writer.saveup == SaveupMode::TryRemove {
            writer.saveup = SaveupMode::None;
        }
        if writer.saveup == SaveupMode::None {
            self.advance_oldest(writer);
        }
        self.cleanup(writer);
    }

    fn advance_oldest(&self, writer: &mut LogWriter) {
        let depth = writer.retention.depth.max(1);
        let span = writer.retention.span;
        let newest_tick = writer.last_time.map_or(0, |time| match self.time_aspect {
            TimeAspect::Event => time.start,
            TimeAspect::Stream => time.end,
        });

        let mut moved = false;
        loop {
            if writer.oldest.index == writer.latest.index {
                break;
            }
            let oldest = self.pool.node(writer.oldest.index);
            let next = oldest.newer();
            // the newest published node always stays
            if next == writer.latest.index {
                break;
            }
            let oldest_is_record = !oldest.is_gap();
            if oldest_is_record && writer.retained_records <= depth {
                break;
            }
            if span > 0 && newest_tick.saturating_sub(self.pool.node(next).time().start) < span {
                break;
            }

            if oldest_is_record {
                writer.retained_records -= 1;
            }
            writer.oldest = NodeRef {
                index: next,
                generation: self.pool.node(next).generation(),
            };
            moved = true;
        }

        if moved {
            self.oldest.store(writer.oldest.pack(), Ordering::Release);
        }
    }

    /// Recycles nodes behind `oldest` in order, stopping at the first one
    /// that is still claimed. It is retried after the next write.
    fn cleanup(&self, writer: &mut LogWriter) {
        while writer.cleanup != writer.oldest.index {
            let node = self.pool.node(writer.cleanup);
            let next = node.newer();
            if !node.try_retire() {
                break;
            }
            // SAFETY: retired just above, nobody else holds the node
            unsafe { node.vacate() };
            self.pool.node(next).unlink_older();
            writer.free.push(writer.cleanup);
            writer.cleanup = next;
        }
    }

    // Time-indexed reading

    fn pin_oldest(&self) -> Pin<'_, T> {
        loop {
            let oldest = NodeRef::unpack(self.oldest.load(Ordering::Acquire));
            let node = self.pool.node(oldest.index);
            if node.try_acquire() {
                if node.generation() == oldest.generation {
                    return Pin {
                        node,
                        index: oldest.index,
                    };
                }
                node.release();
            }
            std::hint::spin_loop();
        }
    }

    /// Newest record whose validity starts at or before `tick`. Returns
    /// `None` when there is no such record, or when `tick` falls in a gap.
    pub fn read_at(&self, tick: TimeTick) -> Option<DataAccess<'_, T>> {
        let pin = self.pin_oldest();
        let latest = NodeRef::unpack(self.latest.load(Ordering::Acquire));

        let mut index = latest.index;
        loop {
            let node = self.pool.node(index);
            if node.is_published() && node.time().start <= tick {
                if node.is_gap() || !node.try_acquire() {
                    return None;
                }
                return DataAccess::from_claimed(node);
            }
            if index == pin.index {
                return None;
            }
            index = node.older();
            if index == NIL {
                return None;
            }
        }
    }

    pub fn read_latest(&self) -> Option<DataAccess<'_, T>> {
        self.read_at(TimeTick::MAX)
    }

    // Sequential reading

    /// Registers a sequential reader positioned at `oldest`
    pub fn attach_sequential(&self) -> SequentialCursor {
        let mut writer = self.writer.lock();
        writer.sequential_claims += 1;

        let mut index = writer.oldest.index;
        loop {
            let node = self.pool.node(index);
            node.claim();
            if index == writer.latest.index {
                break;
            }
            index = node.newer();
        }

        SequentialCursor {
            index: writer.oldest.index,
            consumed: false,
        }
    }

    /// Gives back every claim a sequential reader still holds
    pub fn detach_sequential(&self, cursor: SequentialCursor) {
        let mut writer = self.writer.lock();
        writer.sequential_claims = writer.sequential_claims.saturating_sub(1);

        let mut index = cursor.index;
        loop {
            let node = self.pool.node(index);
            let next = node.newer();
            node.release();
            if index == writer.latest.index || next == NIL {
                break;
            }
            index = next;
        }

        self.reclaim(&mut writer);
    }

    /// Looks at the next unread node without consuming it
    pub fn peek_sequential(&self, cursor: &mut SequentialCursor, up_to: TimeTick) -> SequentialRead<'_, T> {
        loop {
            let node = self.pool.node(cursor.index);
            let newer = node.newer();
            if newer == NIL {
                return SequentialRead::Nothing;
            }
            if cursor.consumed {
                cursor.index = newer;
                cursor.consumed = false;
                node.release();
                continue;
            }

            let time = node.time();
            if time.start > up_to {
                return SequentialRead::Nothing;
            }
            if node.is_gap() {
                return SequentialRead::Gap(time);
            }
            node.claim();
            return match DataAccess::from_claimed(node) {
                Some(access) => SequentialRead::Data(access),
                None => SequentialRead::Nothing,
            };
        }
    }

    /// Marks the node last returned by `peek_sequential` as read
    pub fn advance_sequential(&self, cursor: &mut SequentialCursor) {
        cursor.consumed = true;
    }

    /// Returns the next unread record or gap, up to `up_to`, and moves past it
    pub fn read_sequential(&self, cursor: &mut SequentialCursor, up_to: TimeTick) -> SequentialRead<'_, T> {
        let read = self.peek_sequential(cursor, up_to);
        if !read.is_nothing() {
            cursor.consumed = true;
        }
        read
    }

    // Policy

    pub fn set_saveup(&self, saveup: SaveupMode) {
        let mut writer = self.writer.lock();
        writer.saveup = saveup;
        if saveup != SaveupMode::Active {
            self.reclaim(&mut writer);
        }
    }

    pub fn saveup(&self) -> SaveupMode {
        self.writer.lock().saveup
    }

    pub fn set_retention(&self, retention: Retention) {
        self.writer.lock().retention = retention;
    }

    /// Prunes everything for deletion of the entry. Returns true once the
    /// log holds nothing but an unclaimed sentinel.
    pub fn drain_for_deletion(&self) -> bool {
        let mut writer = self.writer.lock();
        writer.saveup = SaveupMode::None;
        writer.oldest = writer.latest;
        writer.retained_records = 0;
        self.oldest.store(writer.oldest.pack(), Ordering::Release);
        self.cleanup(&mut writer);

        writer.cleanup == writer.latest.index && self.pool.node(writer.latest.index).refs() == 1
    }

    // Diagnostics

    /// Sequence number of the newest record, 0 before the first write
    pub fn latest_sequence(&self) -> SequenceId {
        self.latest_sequence.load(Ordering::Acquire)
    }

    /// Number of records still readable by time-indexed readers
    pub fn retained_count(&self) -> u32 {
        self.writer.lock().retained_records
    }

    /// Number of nodes not yet recycled, the sentinel included
    pub fn live_nodes(&self) -> usize {
        let writer = self.writer.lock();
        self.pool.allocated() - writer.free.len()
    }

    pub fn allocated_nodes(&self) -> usize {
        self.pool.allocated()
    }

    pub fn sequential_readers(&self) -> u32 {
        self.writer.lock().sequential_claims
    }
}
