//! Dispatch - unit of data moving through a captor
//!
//! A dispatch pairs a stamp with an opaque value. Captors emit dispatches
//! into an append-only [`DispatchSink`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Immutable timestamped value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch<S, V> {
    stamp: S,
    value: V,
}

impl<S: Copy, V> Dispatch<S, V> {
    /// Create a new dispatch
    #[inline]
    pub fn new(stamp: S, value: V) -> Self {
        Self { stamp, value }
    }

    /// Sequencing stamp
    #[inline]
    pub fn stamp(&self) -> S {
        self.stamp
    }

    /// Borrow the carried value
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consume the dispatch, returning the carried value
    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Split into `(stamp, value)`
    #[inline]
    pub fn into_parts(self) -> (S, V) {
        (self.stamp, self.value)
    }
}

/// Append-only, ordered output for captured dispatches.
///
/// Captors only ever push to the back; they never read back or reorder what
/// was already emitted.
pub trait DispatchSink<S, V> {
    /// Append a dispatch
    fn push_dispatch(&mut self, dispatch: Dispatch<S, V>);
}

impl<S, V> DispatchSink<S, V> for Vec<Dispatch<S, V>> {
    #[inline]
    fn push_dispatch(&mut self, dispatch: Dispatch<S, V>) {
        self.push(dispatch);
    }
}

impl<S, V> DispatchSink<S, V> for VecDeque<Dispatch<S, V>> {
    #[inline]
    fn push_dispatch(&mut self, dispatch: Dispatch<S, V>) {
        self.push_back(dispatch);
    }
}
