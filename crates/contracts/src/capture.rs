//! Capture contracts shared by every captor
//!
//! - [`CaptureRange`]: the synchronization window of one cycle
//! - [`StampRange`]: the span of data currently buffered by a captor
//! - [`State`]: outcome of one capture attempt

use serde::{Deserialize, Serialize};
use std::fmt;

/// Synchronization window for one cycle, `lower_stamp <= upper_stamp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureRange<S> {
    /// Oldest stamp of the window
    pub lower_stamp: S,
    /// Newest stamp of the window
    pub upper_stamp: S,
}

impl<S: Copy + Ord> CaptureRange<S> {
    /// Create a window, swapping the bounds if given in reverse
    #[inline]
    pub fn new(lower_stamp: S, upper_stamp: S) -> Self {
        Self {
            lower_stamp: lower_stamp.min(upper_stamp),
            upper_stamp: lower_stamp.max(upper_stamp),
        }
    }

    /// Zero-width window at `stamp`
    #[inline]
    pub fn at(stamp: S) -> Self {
        Self {
            lower_stamp: stamp,
            upper_stamp: stamp,
        }
    }

    /// Whether `stamp` lies inside the window (inclusive)
    #[inline]
    pub fn contains(&self, stamp: S) -> bool {
        self.lower_stamp <= stamp && stamp <= self.upper_stamp
    }
}

/// Oldest/newest stamp of the data buffered by a captor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StampRange<S> {
    pub lower_stamp: S,
    pub upper_stamp: S,
}

/// Outcome of one capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Data was produced for the requested window
    Primed,
    /// Not decidable yet, try again later; no data was lost
    Retry,
    /// The window can never be satisfied; the caller must advance
    Abort,
}

impl State {
    /// Label used for logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            State::Primed => "primed",
            State::Retry => "retry",
            State::Abort => "abort",
        }
    }

    /// Combine two states, keeping the most severe one
    ///
    /// `Abort` dominates `Retry`, which dominates `Primed`.
    pub fn merge(self, other: State) -> State {
        match (self, other) {
            (State::Abort, _) | (_, State::Abort) => State::Abort,
            (State::Retry, _) | (_, State::Retry) => State::Retry,
            _ => State::Primed,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_range_orders_bounds() {
        let range = CaptureRange::new(5, 2);
        assert_eq!(range.lower_stamp, 2);
        assert_eq!(range.upper_stamp, 5);
        assert!(range.contains(2));
        assert!(range.contains(5));
        assert!(!range.contains(6));
    }

    #[test]
    fn test_state_merge_severity() {
        assert_eq!(State::Primed.merge(State::Primed), State::Primed);
        assert_eq!(State::Primed.merge(State::Retry), State::Retry);
        assert_eq!(State::Retry.merge(State::Abort), State::Abort);
        assert_eq!(State::Abort.merge(State::Primed), State::Abort);
    }

    #[test]
    fn test_state_serde_snake_case() {
        assert_eq!(serde_json::to_string(&State::Primed).unwrap(), "\"primed\"");
        assert_eq!(State::Retry.to_string(), "retry");
    }
}
