//! SyncedFrame - Synchronizer output
//!
//! One frame per successful cycle: the driver's window plus what every
//! follower captured for it.

use serde::{Deserialize, Serialize};

use crate::{CaptorId, CaptureRange, Dispatch, StampRange};

/// Synchronized frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedFrame<S, V> {
    /// Frame sequence number (monotonically increasing)
    pub frame_id: u64,

    /// Window proposed by the driver
    pub range: CaptureRange<S>,

    /// Dispatches emitted by the driver
    pub driver: Vec<Dispatch<S, V>>,

    /// Dispatches emitted by each follower, in registration order
    pub followers: Vec<FollowerFrame<S, V>>,
}

impl<S, V> SyncedFrame<S, V> {
    /// Dispatches captured by the follower named `id`
    pub fn follower(&self, id: &str) -> Option<&[Dispatch<S, V>]> {
        self.followers
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.dispatches.as_slice())
    }
}

/// Output of a single follower within a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerFrame<S, V> {
    pub id: CaptorId,
    pub dispatches: Vec<Dispatch<S, V>>,
}

/// Result of one synchronization cycle
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome<S, V> {
    /// Every captor primed; a frame was assembled
    Synced(SyncedFrame<S, V>),
    /// Some captor needs more data; the pending window is kept
    Retry,
    /// The window was unreachable; every captor was aborted at `stamp`
    Aborted { stamp: S },
}

impl<S, V> SyncOutcome<S, V> {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }

    /// Take the frame out of a successful outcome
    pub fn into_frame(self) -> Option<SyncedFrame<S, V>> {
        match self {
            SyncOutcome::Synced(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Buffer status of a single captor (for diagnostics)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptorStats<S> {
    pub id: CaptorId,

    /// Buffered dispatch count
    pub depth: usize,

    /// Oldest/newest buffered stamps, `None` when empty
    pub available: Option<StampRange<S>>,

    /// Dispatches dropped because the queue was full
    pub dropped_count: u64,

    /// Injections older than their predecessor
    pub out_of_order_count: u64,
}

/// Synchronizer counters and per-captor buffer status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStats<S> {
    pub frames: u64,
    pub retries: u64,
    pub aborts: u64,

    /// Driver first, then followers in registration order
    pub captors: Vec<CaptorStats<S>>,
}

impl<S> SyncStats<S> {
    /// Total buffered dispatches across all captors
    pub fn total_depth(&self) -> usize {
        self.captors.iter().map(|c| c.depth).sum()
    }
}
