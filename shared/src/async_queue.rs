//! # `AsyncQueue` – many writers, one reader
//!
//! A sentinel-based singly linked FIFO. Writers swap themselves in as the
//! new `tail` and then link the previous tail to their node; the reader
//! follows `head.next`, takes the value out and makes that node the new
//! sentinel. Neither side ever blocks.
//!
//! Consumed sentinels are parked in a bounded lock-free free list and handed
//! back to writers, so a queue under steady load stops allocating.
//!
//! Only one thread may pop at a time. Instead of leaving a second reader
//! undefined, `pop` claims a reader flag and simply returns `None` when
//! another pop is in progress.

use std::{
    cell::UnsafeCell,
    ptr,
    sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering},
};

use crossbeam_queue::ArrayQueue;
use crossbeam_utils::CachePadded;

/// Number of recycled nodes kept when no capacity is given
pub const DEFAULT_SPARE_CAPACITY: usize = 64;

struct QueueNode<T> {
    next: AtomicPtr<QueueNode<T>>,
    value: UnsafeCell<Option<T>>,
}

impl<T> QueueNode<T> {
    fn empty() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            value: UnsafeCell::new(None),
        }
    }
}

pub struct AsyncQueue<T> {
    head: CachePadded<AtomicPtr<QueueNode<T>>>,
    tail: CachePadded<AtomicPtr<QueueNode<T>>>,
    spares: ArrayQueue<Box<QueueNode<T>>>,
    reading: AtomicBool,
    len: AtomicUsize,
}

// SAFETY: values move between threads through the queue, nodes are only
// touched by the writer that owns them before publication and by the single
// claimed reader afterwards.
unsafe impl<T: Send> Send for AsyncQueue<T> {}
// SAFETY: see above, every shared access goes through atomics.
unsafe impl<T: Send> Sync for AsyncQueue<T> {}

impl<T> Default for AsyncQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SPARE_CAPACITY)
    }
}

impl<T> AsyncQueue<T> {
    pub fn new(spare_capacity: usize) -> Self {
        let sentinel = Box::into_raw(Box::new(QueueNode::empty()));
        Self {
            head: CachePadded::new(AtomicPtr::new(sentinel)),
            tail: CachePadded::new(AtomicPtr::new(sentinel)),
            spares: ArrayQueue::new(spare_capacity.max(1)),
            reading: AtomicBool::new(false),
            len: AtomicUsize::new(0),
        }
    }

    /// Appends a value, callable from any number of threads
    pub fn push(&self, value: T) {
        let mut node = self
            .spares
            .pop()
            .unwrap_or_else(|| Box::new(QueueNode::empty()));
        *node.next.get_mut() = ptr::null_mut();
        *node.value.get_mut() = Some(value);

        // counted before publication so the reader can never decrement first
        self.len.fetch_add(1, Ordering::Relaxed);

        let node = Box::into_raw(node);
        let previous = self.tail.swap(node, Ordering::AcqRel);

        // SAFETY: `previous` stays allocated until its `next` is set, which
        // only happens here, because the reader never retires a sentinel
        // whose `next` is still null.
        unsafe {
            (*previous).next.store(node, Ordering::Release);
        }
    }

    /// Takes the oldest value. Returns `None` when the queue is empty or when
    /// another thread is popping at this moment.
    pub fn pop(&self) -> Option<T> {
        if self
            .reading
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: the head sentinel is only retired below, by the claimed reader
        let next = unsafe { (*head).next.load(Ordering::Acquire) };

        let output = if next.is_null() {
            None
        } else {
            // SAFETY: `next` was fully initialised before it was linked
            // (Release above, Acquire here), and from now on it is the
            // sentinel, owned by the reader side.
            let value = unsafe { (*(*next).value.get()).take() };
            self.head.store(next, Ordering::Release);

            // SAFETY: the old head is unreachable for writers: it is no
            // longer the tail, and the writer that linked `next` is done.
            let retired = unsafe { Box::from_raw(head) };
            // a full free list just drops the node
            let _ = self.spares.push(retired);

            self.len.fetch_sub(1, Ordering::Relaxed);
            value
        };

        self.reading.store(false, Ordering::Release);
        output
    }

    /// Pops until the queue is empty
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.pop())
    }

    /// Approximate number of queued values
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of consumed nodes waiting to be reused
    pub fn spare_count(&self) -> usize {
        self.spares.len()
    }
}

impl<T> Drop for AsyncQueue<T> {
    fn drop(&mut self) {
        let mut node = *self.head.get_mut();
        while !node.is_null() {
            // SAFETY: we have exclusive access, every linked node was created
            // by Box::into_raw and is freed exactly once here.
            let mut boxed = unsafe { Box::from_raw(node) };
            node = *boxed.next.get_mut();
        }
    }
}
