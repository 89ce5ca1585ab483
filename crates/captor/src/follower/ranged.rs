//! Ranged follower: brackets the driver's window.
//!
//! For a window `[lower, upper]` shifted back by `delay`, the follower
//! produces the newest dispatch strictly before the window, the oldest one
//! strictly after it, and everything in between. Interpolating consumers
//! (odometry, IMU) use the two bracketing samples.

use std::marker::PhantomData;

use contracts::{CaptureRange, ContractError, DispatchSink, Stamp, State};

use crate::policy::{FollowerPolicy, Policy};
use crate::queue::DispatchQueue;

/// Ranged follower policy
///
/// - `Abort`: nothing older than the window; waiting cannot fix that
/// - `Retry`: nothing newer than the window yet
/// - `Primed`: the bracket `[before, after]` is emitted, intermediates
///   included
///
/// Data removal: after priming, data older than `before` is evicted.
/// On abort, data older than `t - delay - retention_periods * period`.
#[derive(Debug)]
pub struct Ranged<S: Stamp, V> {
    period: S::Offset,
    delay: S::Offset,
    retention_periods: u32,
    _value: PhantomData<fn() -> V>,
}

impl<S: Stamp, V> Ranged<S, V> {
    /// Ranged follower retaining one period of history on abort
    ///
    /// # Errors
    /// `period` or `delay` below zero
    pub fn new(period: S::Offset, delay: S::Offset) -> Result<Self, ContractError> {
        Self::with_retention(period, delay, 1)
    }

    /// # Errors
    /// `period` or `delay` below zero, `retention_periods == 0`
    pub fn with_retention(
        period: S::Offset,
        delay: S::Offset,
        retention_periods: u32,
    ) -> Result<Self, ContractError> {
        if period < S::ZERO_OFFSET {
            return Err(ContractError::invalid_parameter(
                "ranged",
                format!("period must be >= 0, got {period:?}"),
            ));
        }
        if delay < S::ZERO_OFFSET {
            return Err(ContractError::invalid_parameter(
                "ranged",
                format!("delay must be >= 0, got {delay:?}"),
            ));
        }
        if retention_periods == 0 {
            return Err(ContractError::invalid_parameter(
                "ranged",
                "retention_periods must be >= 1",
            ));
        }
        Ok(Self {
            period,
            delay,
            retention_periods,
            _value: PhantomData,
        })
    }

    pub fn period(&self) -> S::Offset {
        self.period
    }

    pub fn delay(&self) -> S::Offset {
        self.delay
    }

    pub fn retention_periods(&self) -> u32 {
        self.retention_periods
    }

    fn retention_boundary(&self, t_abort: S) -> S {
        t_abort
            .rewind(self.delay)
            .rewind(S::scale_offset(self.period, self.retention_periods))
    }
}

impl<S: Stamp, V: Clone + Send + 'static> Policy for Ranged<S, V> {
    type Stamp = S;
    type Value = V;

    const NAME: &'static str = "ranged";

    fn abort(&mut self, queue: &mut DispatchQueue<S, V>, t_abort: S) {
        queue.remove_before(self.retention_boundary(t_abort));
    }

    fn reset(&mut self) {}
}

impl<S: Stamp, V: Clone + Send + 'static> FollowerPolicy for Ranged<S, V> {
    fn capture(
        &mut self,
        queue: &mut DispatchQueue<S, V>,
        output: &mut dyn DispatchSink<S, V>,
        range: &CaptureRange<S>,
    ) -> State {
        if queue.is_empty() {
            return State::Retry;
        }

        let lower = range.lower_stamp.rewind(self.delay);
        let upper = range.upper_stamp.rewind(self.delay);

        let Some(before) = queue
            .lower_bound(lower)
            .checked_sub(1)
            .and_then(|i| queue.stamp_at(i))
        else {
            return State::Abort;
        };

        let Some(after) = queue.stamp_at(queue.upper_bound(upper)) else {
            return State::Retry;
        };

        let bracket = queue.lower_bound(before)..queue.upper_bound(after);
        queue.copy_range(bracket, output);
        queue.remove_before(before);

        State::Primed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Captor, Follower};
    use contracts::Dispatch;
    use proptest::prelude::*;

    type CaptorType = Captor<Ranged<i32, i32>>;

    /// `(delay, period)` pairs every scenario is swept over
    fn sweep() -> impl Iterator<Item = (i32, i32)> {
        [0, 1, 2]
            .into_iter()
            .flat_map(|delay| [1, 2].into_iter().map(move |period| (delay, period)))
    }

    fn captor(delay: i32, period: i32) -> CaptorType {
        Captor::new("ranged", Ranged::new(period, delay).unwrap())
    }

    fn capture(captor: &CaptorType, lower: i32, upper: i32) -> (State, Vec<Dispatch<i32, i32>>) {
        let mut data = Vec::new();
        let state = captor.capture(&mut data, &CaptureRange::new(lower, upper));
        (state, data)
    }

    fn run(delay: i32, period: i32, offsets: &[i32], upper: i32) -> (State, usize) {
        let captor = captor(delay, period);
        for offset in offsets {
            captor.inject(offset - delay, 100);
        }
        let (state, data) = capture(&captor, 0, upper);
        (state, data.len())
    }

    #[test]
    fn test_retry_on_empty() {
        for (delay, period) in sweep() {
            assert_eq!(run(delay, period, &[], 0), (State::Retry, 0));
        }
    }

    #[test]
    fn test_abort_on_nothing_before_window() {
        for (delay, period) in sweep() {
            assert_eq!(run(delay, period, &[1, 2], 0), (State::Abort, 0));
            assert_eq!(run(delay, period, &[1, 2], 1), (State::Abort, 0));
        }
    }

    #[test]
    fn test_retry_on_nothing_after_window() {
        for (delay, period) in sweep() {
            assert_eq!(run(delay, period, &[-1, -2], 0), (State::Retry, 0));
            assert_eq!(run(delay, period, &[-1, 1], 1), (State::Retry, 0));
        }
    }

    #[test]
    fn test_capture_brackets() {
        for (delay, period) in sweep() {
            assert_eq!(run(delay, period, &[-1, 1], 0), (State::Primed, 2));
            assert_eq!(run(delay, period, &[-1, 0, 1], 0), (State::Primed, 3));
            assert_eq!(run(delay, period, &[-1, 2], 1), (State::Primed, 2));
            assert_eq!(run(delay, period, &[-1, 0, 1, 2], 1), (State::Primed, 4));
        }
    }

    #[test]
    fn test_retry_keeps_data() {
        let captor = captor(0, 1);
        captor.inject(-1, 1);
        captor.inject(0, 2);
        assert_eq!(capture(&captor, 0, 0).0, State::Retry);
        assert_eq!(captor.len(), 2);

        captor.inject(1, 3);
        let (state, data) = capture(&captor, 0, 0);
        assert_eq!(state, State::Primed);
        let stamps: Vec<i32> = data.iter().map(Dispatch::stamp).collect();
        assert_eq!(stamps, vec![-1, 0, 1]);
    }

    #[test]
    fn test_primed_evicts_superseded_data() {
        let captor = captor(0, 1);
        for stamp in [-5, -3, -1, 1, 3] {
            captor.inject(stamp, stamp);
        }

        let (state, data) = capture(&captor, 0, 0);
        assert_eq!(state, State::Primed);
        assert_eq!(data, vec![Dispatch::new(-1, -1), Dispatch::new(1, 1)]);

        let available = captor.get_available_stamp_range().unwrap();
        assert_eq!(available.lower_stamp, -1);
        assert_eq!(available.upper_stamp, 3);
    }

    #[test]
    fn test_abort_data_removal() {
        for (delay, period) in sweep() {
            let captor = captor(delay, period);
            for offset in [-3 * period, -1, 0, 1, 2] {
                captor.inject(offset - delay, 100);
            }

            captor.abort(0);

            let available = captor.get_available_stamp_range().unwrap();
            assert!(available.lower_stamp > -delay - 2 * period);
        }
    }

    #[test]
    fn test_abort_respects_retention_periods() {
        let captor: CaptorType = Captor::new("ranged", Ranged::with_retention(2, 0, 3).unwrap());
        for stamp in [-10, -7, -6, -1] {
            captor.inject(stamp, 0);
        }
        captor.abort(0);
        let available = captor.get_available_stamp_range().unwrap();
        assert_eq!(available.lower_stamp, -6);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(Ranged::<i32, ()>::new(-1, 0).is_err());
        assert!(Ranged::<i32, ()>::new(1, -1).is_err());
        assert!(Ranged::<i32, ()>::with_retention(1, 0, 0).is_err());
        assert!(Ranged::<i32, ()>::new(0, 0).is_ok());
    }

    proptest! {
        #[test]
        fn prop_primed_output_brackets_window(
            delay in 0i32..5,
            lower in -20i32..20,
            width in 0i32..5,
            input in prop::collection::vec(-40i32..40, 0..48),
        ) {
            let captor = captor(delay, 1);
            for stamp in &input {
                captor.inject(*stamp, 0);
            }
            let upper = lower + width;
            let (lo, hi) = (lower - delay, upper - delay);
            let (state, data) = capture(&captor, lower, upper);

            let has_before = input.iter().any(|s| *s < lo);
            let has_after = input.iter().any(|s| *s > hi);
            match state {
                State::Abort => prop_assert!(!input.is_empty() && !has_before),
                State::Retry => prop_assert!(input.is_empty() || (has_before && !has_after)),
                State::Primed => {
                    prop_assert!(data.len() >= 2);
                    let first = data[0].stamp();
                    let last = data[data.len() - 1].stamp();
                    prop_assert!(first < lo);
                    prop_assert!(last > hi);
                    prop_assert!(data.windows(2).all(|w| w[0].stamp() <= w[1].stamp()));
                    prop_assert_eq!(first, input.iter().copied().filter(|s| *s < lo).max().unwrap());
                    prop_assert_eq!(last, input.iter().copied().filter(|s| *s > hi).min().unwrap());
                }
            }
        }

        #[test]
        fn prop_abort_is_idempotent(
            t_abort in -20i32..20,
            input in prop::collection::vec(-40i32..40, 0..48),
        ) {
            let captor = captor(1, 2);
            for stamp in &input {
                captor.inject(*stamp, 0);
            }
            captor.abort(t_abort);
            let once = captor.get_available_stamp_range();
            captor.abort(t_abort);
            prop_assert_eq!(captor.get_available_stamp_range(), once);
        }
    }
}
