//! Rate-limiting driver.
//!
//! Proposes single-dispatch windows no closer together than
//! `throttle_period`. Dispatches arriving faster than that are skipped and
//! evicted once a later one is emitted.

use std::marker::PhantomData;

use contracts::{CaptureRange, ContractError, DispatchSink, Stamp, State};

use crate::policy::{DriverPolicy, Policy};
use crate::queue::DispatchQueue;

/// Throttled driver policy
///
/// - `capture`: emits the oldest dispatch whose stamp is at least
///   `throttle_period` after the previously emitted one (any dispatch if
///   nothing was emitted since construction/reset), together with a
///   zero-width window at its stamp. Never aborts.
/// - `abort(t)`: evicts dispatches older than `t`.
/// - `reset()`: forgets the previously emitted stamp.
#[derive(Debug)]
pub struct Throttled<S: Stamp, V> {
    throttle_period: S::Offset,
    previous_stamp: Option<S>,
    _value: PhantomData<fn() -> V>,
}

impl<S: Stamp, V> Throttled<S, V> {
    /// # Errors
    /// `throttle_period` below zero
    pub fn new(throttle_period: S::Offset) -> Result<Self, ContractError> {
        if throttle_period < S::ZERO_OFFSET {
            return Err(ContractError::invalid_parameter(
                "throttled",
                format!("throttle_period must be >= 0, got {throttle_period:?}"),
            ));
        }
        Ok(Self {
            throttle_period,
            previous_stamp: None,
            _value: PhantomData,
        })
    }

    pub fn throttle_period(&self) -> S::Offset {
        self.throttle_period
    }

    /// Stamp of the last emitted dispatch
    pub fn previous_stamp(&self) -> Option<S> {
        self.previous_stamp
    }

    fn is_eligible(&self, stamp: S) -> bool {
        match self.previous_stamp {
            None => true,
            // Late arrivals behind the cursor never move the window back
            Some(previous) => {
                stamp >= previous && stamp.offset_since(previous) >= self.throttle_period
            }
        }
    }
}

impl<S: Stamp, V: Send + 'static> Policy for Throttled<S, V> {
    type Stamp = S;
    type Value = V;

    const NAME: &'static str = "throttled";

    fn abort(&mut self, queue: &mut DispatchQueue<S, V>, t_abort: S) {
        queue.remove_before(t_abort);
    }

    fn reset(&mut self) {
        self.previous_stamp = None;
    }
}

impl<S: Stamp, V: Send + 'static> DriverPolicy for Throttled<S, V> {
    fn capture(
        &mut self,
        queue: &mut DispatchQueue<S, V>,
        output: &mut dyn DispatchSink<S, V>,
        range: &mut CaptureRange<S>,
    ) -> State {
        if queue.is_empty() {
            return State::Retry;
        }

        let Some(position) = queue.iter().position(|(stamp, _)| self.is_eligible(stamp)) else {
            return State::Retry;
        };

        // Skipped dispatches ahead of `position` are dropped along with it
        let Some(dispatch) = queue.take_through(position) else {
            return State::Retry;
        };

        let stamp = dispatch.stamp();
        *range = CaptureRange::at(stamp);
        output.push_dispatch(dispatch);

        self.previous_stamp = Some(stamp);
        queue.remove_at_before(stamp);

        State::Primed
    }
}
