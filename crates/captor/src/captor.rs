//! Generic captor engine.
//!
//! [`Captor`] couples a [`DispatchQueue`] with a policy behind a lock policy
//! and exposes the captor lifecycle (`inject`, `capture`, `abort`, `reset`).
//! The role traits [`Driver`] and [`Follower`] are object safe so that a
//! synchronizer can hold heterogeneous captors.

use std::fmt;

use contracts::{
    CaptorId, CaptorStats, CaptureRange, DispatchSink, Stamp, StampRange, State,
};
use tracing::instrument;

use crate::lock::{LockPolicy, NoLock};
use crate::policy::{DriverPolicy, FollowerPolicy, Policy};
use crate::queue::DispatchQueue;

/// Everything guarded by the captor's critical section
struct Inner<P: Policy> {
    queue: DispatchQueue<P::Stamp, P::Value>,
    policy: P,
}

/// Buffering state machine around one stream
pub struct Captor<P: Policy, L: LockPolicy = NoLock> {
    id: CaptorId,
    inner: L::Lock<Inner<P>>,
}

impl<P: Policy, L: LockPolicy> fmt::Debug for Captor<P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Captor")
            .field("id", &self.id)
            .field("policy", &P::NAME)
            .field("lock", &L::NAME)
            .finish()
    }
}

impl<P: Policy, L: LockPolicy> Captor<P, L> {
    /// Create a captor with an unbounded queue
    pub fn new(id: impl Into<CaptorId>, policy: P) -> Self {
        Self::with_capacity(id, policy, None)
    }

    /// Create a captor whose queue drops its oldest entry beyond `capacity`
    pub fn with_capacity(id: impl Into<CaptorId>, policy: P, capacity: Option<usize>) -> Self {
        Self {
            id: id.into(),
            inner: L::wrap(Inner {
                queue: DispatchQueue::with_capacity(capacity),
                policy,
            }),
        }
    }

    pub fn id(&self) -> &CaptorId {
        &self.id
    }

    /// Buffer a new dispatch
    pub fn inject(&self, stamp: P::Stamp, value: P::Value) {
        let dropped = L::acquire(&self.inner).queue.inject(stamp, value);

        if let Some(dropped_stamp) = dropped {
            tracing::warn!(
                captor = %self.id,
                dropped_stamp = ?dropped_stamp,
                "captor queue full, dropped oldest dispatch"
            );
            metrics::counter!("flow_captor_dropped_total", "captor" => self.id.to_string())
                .increment(1);
        }
    }

    /// Inform the captor that no cycle will request data at or before `t_abort`
    #[instrument(level = "debug", skip(self), fields(captor = %self.id, policy = P::NAME))]
    pub fn abort(&self, t_abort: P::Stamp) {
        let evicted = {
            let mut inner = L::acquire(&self.inner);
            let Inner { queue, policy } = &mut *inner;
            let before = queue.len();
            policy.abort(queue, t_abort);
            before.saturating_sub(queue.len())
        };

        if evicted > 0 {
            tracing::debug!(evicted, "abort evicted stale dispatches");
            metrics::counter!("flow_captor_evicted_total", "captor" => self.id.to_string())
                .increment(evicted as u64);
        }
    }

    /// Clear policy cursor/memo state; buffered data is kept
    pub fn reset(&self) {
        L::acquire(&self.inner).policy.reset();
        tracing::debug!(captor = %self.id, policy = P::NAME, "captor reset");
    }

    /// Oldest/newest buffered stamps, `None` when nothing is buffered
    pub fn get_available_stamp_range(&self) -> Option<StampRange<P::Stamp>> {
        L::acquire(&self.inner).queue.available_range()
    }

    pub fn len(&self) -> usize {
        L::acquire(&self.inner).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        L::acquire(&self.inner).queue.is_empty()
    }

    /// Drop every buffered dispatch
    pub fn clear(&self) {
        L::acquire(&self.inner).queue.clear();
    }

    /// Snapshot of the queue status
    pub fn stats(&self) -> CaptorStats<P::Stamp> {
        let inner = L::acquire(&self.inner);
        CaptorStats {
            id: self.id.clone(),
            depth: inner.queue.len(),
            available: inner.queue.available_range(),
            dropped_count: inner.queue.dropped_count(),
            out_of_order_count: inner.queue.out_of_order_count(),
        }
    }

    /// Run `f` against the queue inside the critical section
    pub fn inspect<R>(&self, f: impl FnOnce(&DispatchQueue<P::Stamp, P::Value>) -> R) -> R {
        f(&L::acquire(&self.inner).queue)
    }

    fn record_capture(&self, state: State) {
        tracing::trace!(captor = %self.id, policy = P::NAME, %state, "capture");
        metrics::counter!(
            "flow_captor_captures_total",
            "captor" => self.id.to_string(),
            "state" => state.as_str()
        )
        .increment(1);
    }
}

/// Lifecycle shared by drivers and followers
pub trait CaptorInterface<S: Stamp, V> {
    fn id(&self) -> &CaptorId;

    fn inject(&self, stamp: S, value: V);

    fn abort(&self, t_abort: S);

    fn reset(&self);

    fn get_available_stamp_range(&self) -> Option<StampRange<S>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CaptorStats<S>;
}

/// Captor proposing the window of each synchronization cycle
pub trait Driver<S: Stamp, V>: CaptorInterface<S, V> {
    /// Propose a window; on `Primed`, `range` is overwritten with it
    fn capture(&self, output: &mut dyn DispatchSink<S, V>, range: &mut CaptureRange<S>) -> State;
}

/// Captor that must satisfy a window proposed by the driver
pub trait Follower<S: Stamp, V>: CaptorInterface<S, V> {
    fn capture(&self, output: &mut dyn DispatchSink<S, V>, range: &CaptureRange<S>) -> State;
}

impl<P: Policy, L: LockPolicy> CaptorInterface<P::Stamp, P::Value> for Captor<P, L> {
    fn id(&self) -> &CaptorId {
        Captor::id(self)
    }

    fn inject(&self, stamp: P::Stamp, value: P::Value) {
        Captor::inject(self, stamp, value)
    }

    fn abort(&self, t_abort: P::Stamp) {
        Captor::abort(self, t_abort)
    }

    fn reset(&self) {
        Captor::reset(self)
    }

    fn get_available_stamp_range(&self) -> Option<StampRange<P::Stamp>> {
        Captor::get_available_stamp_range(self)
    }

    fn len(&self) -> usize {
        Captor::len(self)
    }

    fn stats(&self) -> CaptorStats<P::Stamp> {
        Captor::stats(self)
    }
}

impl<P: DriverPolicy, L: LockPolicy> Driver<P::Stamp, P::Value> for Captor<P, L> {
    #[instrument(level = "trace", skip_all, fields(captor = %self.id))]
    fn capture(
        &self,
        output: &mut dyn DispatchSink<P::Stamp, P::Value>,
        range: &mut CaptureRange<P::Stamp>,
    ) -> State {
        let state = {
            let mut inner = L::acquire(&self.inner);
            let Inner { queue, policy } = &mut *inner;
            policy.capture(queue, output, range)
        };
        self.record_capture(state);
        state
    }
}

impl<P: FollowerPolicy, L: LockPolicy> Follower<P::Stamp, P::Value> for Captor<P, L> {
    #[instrument(level = "trace", skip_all, fields(captor = %self.id))]
    fn capture(
        &self,
        output: &mut dyn DispatchSink<P::Stamp, P::Value>,
        range: &CaptureRange<P::Stamp>,
    ) -> State {
        let state = {
            let mut inner = L::acquire(&self.inner);
            let Inner { queue, policy } = &mut *inner;
            policy.capture(queue, output, range)
        };
        self.record_capture(state);
        state
    }
}
