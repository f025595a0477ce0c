use std::{
    ptr,
    sync::atomic::{AtomicPtr, AtomicUsize, Ordering},
};

use crate::entry_log::{data_node::DataNode, error::EntryLogError};

const CHUNK_SHIFT: u32 = 6;
const CHUNK_SIZE: usize = 1 << CHUNK_SHIFT;
const CHUNK_MASK: u32 = (CHUNK_SIZE as u32) - 1;
const MAX_CHUNKS: usize = 4_096;

/// Upper bound on live nodes in one entry log
pub const MAX_NODES: usize = CHUNK_SIZE * MAX_CHUNKS;

/// Typed node storage addressed by `u32` index.
///
/// Chunks of `CHUNK_SIZE` nodes are added by the writer and never moved or
/// freed before the pool itself is dropped, so any index handed out once
/// stays dereferenceable. Recycling is tracked by the owner of the pool.
pub(crate) struct NodePool<T> {
    chunks: Box<[AtomicPtr<DataNode<T>>]>,
    chunk_count: AtomicUsize,
}

impl<T> NodePool<T> {
    pub(crate) fn new() -> Self {
        let chunks: Vec<AtomicPtr<DataNode<T>>> = (0..MAX_CHUNKS)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect();
        Self {
            chunks: chunks.into_boxed_slice(),
            chunk_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn node(&self, index: u32) -> &DataNode<T> {
        let chunk = self.chunks[(index >> CHUNK_SHIFT) as usize].load(Ordering::Acquire);
        assert!(!chunk.is_null(), "data node index {} was never allocated", index);
        // SAFETY: the chunk holds CHUNK_SIZE initialised nodes and lives as
        // long as the pool; the offset is masked into range.
        unsafe { &*chunk.add((index & CHUNK_MASK) as usize) }
    }

    /// Number of node slots allocated so far
    pub(crate) fn allocated(&self) -> usize {
        self.chunk_count.load(Ordering::Relaxed) * CHUNK_SIZE
    }

    /// Adds a chunk and returns the indices of its vacant slots. Writer only.
    pub(crate) fn grow(&self) -> Result<std::ops::Range<u32>, EntryLogError> {
        let chunk_index = self.chunk_count.load(Ordering::Relaxed);
        if chunk_index >= MAX_CHUNKS {
            return Err(EntryLogError::PoolExhausted {
                capacity: MAX_NODES,
            });
        }

        let nodes: Box<[DataNode<T>]> = (0..CHUNK_SIZE).map(|_| DataNode::vacant()).collect();
        let chunk = Box::into_raw(nodes) as *mut DataNode<T>;
        self.chunks[chunk_index].store(chunk, Ordering::Release);
        self.chunk_count.store(chunk_index + 1, Ordering::Release);

        let first = (chunk_index * CHUNK_SIZE) as u32;
        Ok(first..first + CHUNK_SIZE as u32)
    }
}

impl<T> Drop for NodePool<T> {
    fn drop(&mut self) {
        for chunk in self.chunks.iter_mut() {
            let chunk = *chunk.get_mut();
            if chunk.is_null() {
                continue;
            }
            // SAFETY: created in `grow` from a boxed slice of CHUNK_SIZE nodes
            // and freed exactly once, here.
            unsafe {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(chunk, CHUNK_SIZE)));
            }
        }
    }
}
