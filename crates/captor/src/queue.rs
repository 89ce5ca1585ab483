//! Stamp-ordered dispatch queue.
//!
//! Uses index-based separation:
//! - a `VecDeque` keeps lightweight metadata (stamp + slab key) in ascending
//!   stamp order
//! - a `Slab` stores the actual values
//!
//! Ordered insertion and front eviction only shuffle metadata, never the
//! payloads (images, point clouds, ...).

use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;

use contracts::{Dispatch, DispatchSink, Stamp, StampRange};
use slab::Slab;

/// Lightweight metadata stored in the ordered index
#[derive(Debug, Clone, Copy)]
struct Slot<S> {
    stamp: S,
    key: usize,
}

/// Ascending-stamp buffer of dispatches.
///
/// Entries with equal stamps keep their arrival order. An optional capacity
/// bounds the queue: injecting into a full queue drops the oldest entry.
pub struct DispatchQueue<S, V> {
    /// Ordered metadata (stamp + key into `storage`)
    index: VecDeque<Slot<S>>,
    /// Actual value storage
    storage: Slab<V>,
    capacity: Option<usize>,
    dropped_count: u64,
    out_of_order_count: u64,
    last_injected: Option<S>,
}

impl<S: fmt::Debug, V> fmt::Debug for DispatchQueue<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("len", &self.index.len())
            .field("oldest", &self.index.front().map(|s| &s.stamp))
            .field("newest", &self.index.back().map(|s| &s.stamp))
            .field("capacity", &self.capacity)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl<S: Stamp, V> Default for DispatchQueue<S, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Stamp, V> DispatchQueue<S, V> {
    /// Create an unbounded queue
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Create a queue holding at most `capacity` dispatches (at least one)
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        let capacity = capacity.map(|c| c.max(1));
        let reserve = capacity.unwrap_or(0);
        Self {
            index: VecDeque::with_capacity(reserve),
            storage: Slab::with_capacity(reserve),
            capacity,
            dropped_count: 0,
            out_of_order_count: 0,
            last_injected: None,
        }
    }

    /// Insert a dispatch, keeping ascending stamp order.
    ///
    /// Returns the stamp of the entry dropped to make room, if the queue was
    /// full.
    pub fn inject(&mut self, stamp: S, value: V) -> Option<S> {
        if let Some(last) = self.last_injected {
            if stamp < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_injected = Some(stamp);

        let dropped = match self.capacity {
            Some(capacity) if self.index.len() >= capacity => {
                let oldest = self.pop_front().map(|d| d.stamp());
                self.dropped_count += 1;
                oldest
            }
            _ => None,
        };

        let key = self.storage.insert(value);
        let slot = Slot { stamp, key };

        // Common case: in-order arrival appends at the back
        let in_order = self.index.back().map_or(true, |newest| newest.stamp <= stamp);
        if in_order {
            self.index.push_back(slot);
        } else {
            let pos = self.index.partition_point(|s| s.stamp <= stamp);
            self.index.insert(pos, slot);
        }

        dropped
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[inline]
    pub fn oldest_stamp(&self) -> Option<S> {
        self.index.front().map(|s| s.stamp)
    }

    #[inline]
    pub fn newest_stamp(&self) -> Option<S> {
        self.index.back().map(|s| s.stamp)
    }

    /// Oldest and newest buffered stamps
    pub fn available_range(&self) -> Option<StampRange<S>> {
        Some(StampRange {
            lower_stamp: self.oldest_stamp()?,
            upper_stamp: self.newest_stamp()?,
        })
    }

    /// Iterate `(stamp, value)` pairs, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (S, &V)> + ExactSizeIterator + '_ {
        self.index
            .iter()
            .map(move |slot| (slot.stamp, &self.storage[slot.key]))
    }

    /// Stamp of the entry at position `idx`
    #[inline]
    pub fn stamp_at(&self, idx: usize) -> Option<S> {
        self.index.get(idx).map(|s| s.stamp)
    }

    /// Position of the first entry with stamp `>= stamp` (or `len()`)
    #[inline]
    pub fn lower_bound(&self, stamp: S) -> usize {
        self.index.partition_point(|s| s.stamp < stamp)
    }

    /// Position of the first entry with stamp `> stamp` (or `len()`)
    #[inline]
    pub fn upper_bound(&self, stamp: S) -> usize {
        self.index.partition_point(|s| s.stamp <= stamp)
    }

    /// Evict every entry with stamp `< stamp`, returning the evicted count
    pub fn remove_before(&mut self, stamp: S) -> usize {
        self.remove_while(|s| s < stamp)
    }

    /// Evict every entry with stamp `<= stamp`, returning the evicted count
    pub fn remove_at_before(&mut self, stamp: S) -> usize {
        self.remove_while(|s| s <= stamp)
    }

    fn remove_while(&mut self, evict: impl Fn(S) -> bool) -> usize {
        let mut evicted = 0;
        while let Some(front) = self.index.front() {
            if !evict(front.stamp) {
                break;
            }
            if let Some(slot) = self.index.pop_front() {
                self.storage.remove(slot.key);
                evicted += 1;
            }
        }
        evicted
    }

    /// Remove and return the oldest dispatch
    pub fn pop_front(&mut self) -> Option<Dispatch<S, V>> {
        let slot = self.index.pop_front()?;
        Some(Dispatch::new(slot.stamp, self.storage.remove(slot.key)))
    }

    /// Remove entries `0..=idx`, returning the one at `idx` by value
    pub fn take_through(&mut self, idx: usize) -> Option<Dispatch<S, V>> {
        if idx >= self.index.len() {
            return None;
        }
        for _ in 0..idx {
            self.pop_front();
        }
        self.pop_front()
    }

    /// Drop every buffered dispatch; counters are kept
    pub fn clear(&mut self) {
        self.index.clear();
        self.storage.clear();
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}

impl<S: Stamp, V: Clone> DispatchQueue<S, V> {
    /// Copy of the dispatch at position `idx`
    pub fn dispatch_at(&self, idx: usize) -> Option<Dispatch<S, V>> {
        self.index
            .get(idx)
            .map(|slot| Dispatch::new(slot.stamp, self.storage[slot.key].clone()))
    }

    /// Copy the entries in `positions` into `output`, oldest first.
    ///
    /// Returns the number of dispatches emitted.
    pub fn copy_range(
        &self,
        positions: Range<usize>,
        output: &mut dyn DispatchSink<S, V>,
    ) -> usize {
        let mut copied = 0;
        for slot in self.index.range(positions) {
            output.push_dispatch(Dispatch::new(slot.stamp, self.storage[slot.key].clone()));
            copied += 1;
        }
        copied
    }
}
