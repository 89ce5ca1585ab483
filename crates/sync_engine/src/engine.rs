//! Main synchronizer implementation.

use std::sync::Arc;

use captor::{CaptorInterface, Driver, Follower};
use contracts::{
    CaptorId, CaptureRange, ContractError, Dispatch, FollowerFrame, Stamp, State, SyncOutcome,
    SyncStats, SyncedFrame,
};
use tracing::instrument;

/// Driver shared between producers and the synchronizer
pub type SharedDriver<S, V> = Arc<dyn Driver<S, V> + Send + Sync>;

/// Follower shared between producers and the synchronizer
pub type SharedFollower<S, V> = Arc<dyn Follower<S, V> + Send + Sync>;

/// Window proposed by the driver that some follower could not satisfy yet.
///
/// The driver already consumed its data for it, so the window is replayed
/// to the followers instead of asking the driver again.
#[derive(Debug)]
struct PendingWindow<S, V> {
    range: CaptureRange<S>,
    driver: Vec<Dispatch<S, V>>,
}

/// Multi-stream synchronizer: one driver, N followers
pub struct Synchronizer<S: Stamp, V> {
    driver: SharedDriver<S, V>,
    followers: Vec<SharedFollower<S, V>>,
    /// Window waiting on followers after a retry
    pending: Option<PendingWindow<S, V>>,
    /// Frame counter
    frame_counter: u64,
    retries: u64,
    aborts: u64,
}

impl<S: Stamp, V> std::fmt::Debug for Synchronizer<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("driver", self.driver.id())
            .field(
                "followers",
                &self.followers.iter().map(|f| f.id()).collect::<Vec<_>>(),
            )
            .field("pending", &self.pending.as_ref().map(|p| p.range))
            .field("frames", &self.frame_counter)
            .finish()
    }
}

impl<S: Stamp, V> Synchronizer<S, V> {
    /// Create a synchronizer over already constructed captors
    ///
    /// # Errors
    /// Two captors sharing the same id
    pub fn new(
        driver: SharedDriver<S, V>,
        followers: Vec<SharedFollower<S, V>>,
    ) -> Result<Self, ContractError> {
        let mut seen: Vec<&CaptorId> = Vec::with_capacity(followers.len() + 1);
        seen.push(driver.id());
        for follower in &followers {
            if seen.contains(&follower.id()) {
                return Err(ContractError::duplicate_captor(follower.id().as_str()));
            }
            seen.push(follower.id());
        }

        tracing::debug!(
            driver = %driver.id(),
            followers = followers.len(),
            "synchronizer created"
        );

        Ok(Self {
            driver,
            followers,
            pending: None,
            frame_counter: 0,
            retries: 0,
            aborts: 0,
        })
    }

    /// Run one synchronization cycle
    #[instrument(
        level = "trace",
        name = "synchronizer_capture",
        skip(self),
        fields(driver = %self.driver.id(), pending = self.pending.is_some())
    )]
    pub fn capture(&mut self) -> SyncOutcome<S, V> {
        let PendingWindow { range, driver } = match self.pending.take() {
            Some(pending) => pending,
            None => match self.capture_driver() {
                Ok(window) => window,
                Err(outcome) => return outcome,
            },
        };

        let mut state = State::Primed;
        let mut followers = Vec::with_capacity(self.followers.len());
        for follower in &self.followers {
            let mut dispatches = Vec::new();
            let follower_state = follower.capture(&mut dispatches, &range);
            if follower_state != State::Primed {
                tracing::trace!(
                    follower = %follower.id(),
                    state = %follower_state,
                    "follower not primed"
                );
            }
            state = state.merge(follower_state);
            followers.push(FollowerFrame {
                id: follower.id().clone(),
                dispatches,
            });
        }

        let outcome = match state {
            State::Primed => {
                self.frame_counter += 1;
                SyncOutcome::Synced(SyncedFrame {
                    frame_id: self.frame_counter,
                    range,
                    driver,
                    followers,
                })
            }
            State::Retry => {
                self.pending = Some(PendingWindow { range, driver });
                self.retries += 1;
                SyncOutcome::Retry
            }
            State::Abort => self.abort_all(range.lower_stamp),
        };

        observability::metrics::record_sync_outcome(&outcome);
        outcome
    }

    /// Ask the driver for a new window
    fn capture_driver(&mut self) -> Result<PendingWindow<S, V>, SyncOutcome<S, V>> {
        let mut driver = Vec::new();
        let mut range = CaptureRange::default();
        match self.driver.capture(&mut driver, &mut range) {
            State::Primed => Ok(PendingWindow { range, driver }),
            State::Retry => {
                self.retries += 1;
                let outcome = SyncOutcome::Retry;
                observability::metrics::record_sync_outcome(&outcome);
                Err(outcome)
            }
            State::Abort => {
                let outcome = self.abort_all(range.lower_stamp);
                observability::metrics::record_sync_outcome(&outcome);
                Err(outcome)
            }
        }
    }

    /// Abort every captor at `stamp` and forget the pending window
    #[instrument(name = "synchronizer_abort", level = "debug", skip(self))]
    fn abort_all(&mut self, stamp: S) -> SyncOutcome<S, V> {
        self.driver.abort(stamp);
        for follower in &self.followers {
            follower.abort(stamp);
        }
        self.pending = None;
        self.aborts += 1;
        SyncOutcome::Aborted { stamp }
    }

    /// Run cycles until one retries, returning the produced frames.
    ///
    /// An abort is followed by another cycle since the captors advanced.
    /// At most `max_cycles` cycles run.
    pub fn drain(&mut self, max_cycles: usize) -> Vec<SyncedFrame<S, V>> {
        let mut frames = Vec::new();
        for _ in 0..max_cycles {
            match self.capture() {
                SyncOutcome::Synced(frame) => frames.push(frame),
                SyncOutcome::Aborted { .. } => continue,
                SyncOutcome::Retry => break,
            }
        }
        frames
    }

    /// Buffer a dispatch into the captor named `id`
    ///
    /// # Errors
    /// No captor is named `id`
    pub fn inject(&self, id: &str, stamp: S, value: V) -> Result<(), ContractError> {
        if self.driver.id() == id {
            self.driver.inject(stamp, value);
            return Ok(());
        }
        let follower = self
            .follower(id)
            .ok_or_else(|| ContractError::unknown_captor(id))?;
        follower.inject(stamp, value);
        Ok(())
    }

    /// Reset every captor and drop the pending window
    pub fn reset(&mut self) {
        self.driver.reset();
        for follower in &self.followers {
            follower.reset();
        }
        self.pending = None;
        tracing::debug!(driver = %self.driver.id(), "synchronizer reset");
    }

    pub fn driver(&self) -> &SharedDriver<S, V> {
        &self.driver
    }

    pub fn followers(&self) -> &[SharedFollower<S, V>] {
        &self.followers
    }

    pub fn follower(&self, id: &str) -> Option<&SharedFollower<S, V>> {
        self.followers.iter().find(|f| f.id() == id)
    }

    /// Window replayed by the next cycle, if the last one retried
    pub fn pending_range(&self) -> Option<CaptureRange<S>> {
        self.pending.as_ref().map(|p| p.range)
    }

    /// Get frame counter
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Counters plus per-captor buffer status, driver first
    pub fn stats(&self) -> SyncStats<S> {
        let mut captors = Vec::with_capacity(self.followers.len() + 1);
        captors.push(self.driver.stats());
        captors.extend(self.followers.iter().map(|f| f.stats()));
        SyncStats {
            frames: self.frame_counter,
            retries: self.retries,
            aborts: self.aborts,
            captors,
        }
    }
}
