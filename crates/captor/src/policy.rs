//! Capture policies.
//!
//! A policy owns the cursor/memo state of one captor and decides, given the
//! captor's queue, what a capture produces. Policies never lock: the
//! [`Captor`](crate::Captor) engine hands them the queue from inside its
//! critical section.

use contracts::{CaptureRange, DispatchSink, Stamp, State};

use crate::queue::DispatchQueue;

/// Behavior shared by driver and follower policies
pub trait Policy: Send + 'static {
    type Stamp: Stamp;
    type Value: Send + 'static;

    /// Label used in logs and metrics
    const NAME: &'static str;

    /// Evict data made unreachable by the synchronization cursor passing
    /// `t_abort`
    fn abort(&mut self, queue: &mut DispatchQueue<Self::Stamp, Self::Value>, t_abort: Self::Stamp);

    /// Clear cursor/memo state; buffered data is left alone
    fn reset(&mut self);
}

/// Policy of a captor that proposes the window of each cycle
pub trait DriverPolicy: Policy {
    /// Propose a window from the queue.
    ///
    /// On `Primed`, `range` holds the proposed window and `output` the
    /// dispatches backing it.
    fn capture(
        &mut self,
        queue: &mut DispatchQueue<Self::Stamp, Self::Value>,
        output: &mut dyn DispatchSink<Self::Stamp, Self::Value>,
        range: &mut CaptureRange<Self::Stamp>,
    ) -> State;
}

/// Policy of a captor that must satisfy a window proposed by the driver
pub trait FollowerPolicy: Policy {
    fn capture(
        &mut self,
        queue: &mut DispatchQueue<Self::Stamp, Self::Value>,
        output: &mut dyn DispatchSink<Self::Stamp, Self::Value>,
        range: &CaptureRange<Self::Stamp>,
    ) -> State;
}
