//! Latched follower: holds the newest value old enough to be trusted.
//!
//! Meant for streams updating less often than the synchronization rate
//! (maps, calibration, slow state). A dispatch is trusted once its stamp is
//! at or before `range.lower_stamp - min_period`; newer dispatches stay
//! queued until a later window makes them eligible.
//!
//! Latched may never prime if data never arrives; callers needing liveness
//! must bound how long they wait on it.

use contracts::{CaptureRange, ContractError, Dispatch, DispatchSink, Stamp, State};

use crate::policy::{FollowerPolicy, Policy};
use crate::queue::DispatchQueue;

/// Latched follower policy
///
/// - `Primed`: a trusted value exists; it is emitted (again, if unchanged)
/// - `Retry`: nothing at or before the trust boundary yet
///
/// Data removal: everything older than the latched dispatch is evicted.
/// `abort(t)` does not evict everything before `t`: it keeps the newest
/// dispatch at or before `t - min_period` so the next window can still latch.
///
/// A window whose trust boundary falls below the smallest representable
/// stamp (e.g. `lower_stamp < min_period` with unsigned stamps) trusts
/// nothing and retries.
#[derive(Debug)]
pub struct Latched<S: Stamp, V> {
    min_period: S::Offset,
    latched: Option<Dispatch<S, V>>,
}

impl<S: Stamp, V> Latched<S, V> {
    /// # Errors
    /// `min_period` below zero
    pub fn new(min_period: S::Offset) -> Result<Self, ContractError> {
        if min_period < S::ZERO_OFFSET {
            return Err(ContractError::invalid_parameter(
                "latched",
                format!("min_period must be >= 0, got {min_period:?}"),
            ));
        }
        Ok(Self {
            min_period,
            latched: None,
        })
    }

    pub fn min_period(&self) -> S::Offset {
        self.min_period
    }

    /// Stamp of the currently held dispatch
    pub fn latched_stamp(&self) -> Option<S> {
        self.latched.as_ref().map(Dispatch::stamp)
    }

    /// `None` when no stamp can be old enough
    fn trust_boundary(&self, lower_stamp: S) -> Option<S> {
        lower_stamp.checked_rewind(self.min_period)
    }
}

impl<S: Stamp, V: Clone> Latched<S, V> {
    /// Move the latch forward to the newest queued dispatch at or before
    /// `boundary`, evicting what it supersedes
    fn advance(&mut self, queue: &mut DispatchQueue<S, V>, boundary: S) {
        let trusted = queue.upper_bound(boundary);
        if trusted > 0 {
            if let Some(newest) = queue.dispatch_at(trusted - 1) {
                let is_forward = self
                    .latched
                    .as_ref()
                    .map_or(true, |held| newest.stamp() >= held.stamp());
                if is_forward {
                    self.latched = Some(newest);
                }
            }
        }

        if let Some(held) = self.latched_stamp() {
            queue.remove_before(held);
        }
    }
}

impl<S: Stamp, V: Clone + Send + 'static> Policy for Latched<S, V> {
    type Stamp = S;
    type Value = V;

    const NAME: &'static str = "latched";

    fn abort(&mut self, queue: &mut DispatchQueue<S, V>, t_abort: S) {
        // Keep the newest dispatch a window at `t_abort` would have trusted:
        // later windows may still latch it
        let Some(boundary) = self.trust_boundary(t_abort) else {
            return;
        };
        let trusted = queue.upper_bound(boundary);
        if let Some(newest_trusted) = trusted.checked_sub(1).and_then(|i| queue.stamp_at(i)) {
            queue.remove_before(newest_trusted);
        }
    }

    fn reset(&mut self) {
        self.latched = None;
    }
}

impl<S: Stamp, V: Clone + Send + 'static> FollowerPolicy for Latched<S, V> {
    fn capture(
        &mut self,
        queue: &mut DispatchQueue<S, V>,
        output: &mut dyn DispatchSink<S, V>,
        range: &CaptureRange<S>,
    ) -> State {
        let Some(boundary) = self.trust_boundary(range.lower_stamp) else {
            return State::Retry;
        };
        self.advance(queue, boundary);

        match &self.latched {
            Some(held) if held.stamp() <= boundary => {
                output.push_dispatch(held.clone());
                State::Primed
            }
            // Only data newer than the boundary (or none): it may still
            // become trusted in a later cycle
            _ => State::Retry,
        }
    }
}
