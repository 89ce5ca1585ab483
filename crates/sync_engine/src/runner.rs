//! Periodic synchronization loop on the tokio runtime.
//!
//! Producers inject into the captors from their own tasks/threads; the loop
//! wakes up every `poll_interval`, drains the synchronizer and forwards the
//! frames downstream.

use std::time::Duration;

use captor::CaptorInterface;
use contracts::{Stamp, SyncStats, SyncedFrame};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::Synchronizer;

/// Upper bound on cycles run per tick, so a flood of aborts cannot starve
/// the shutdown check
const MAX_CYCLES_PER_TICK: usize = 1024;

/// Shortest accepted poll interval; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn the synchronization loop.
///
/// The task stops when `shutdown_rx` observes `true` (or its sender is
/// dropped) or when the frame receiver is dropped, and returns the final
/// synchronizer statistics. A `poll_interval` below 1ms is raised to 1ms.
pub fn spawn_sync_loop<S, V>(
    mut synchronizer: Synchronizer<S, V>,
    poll_interval: Duration,
    frames_tx: mpsc::Sender<SyncedFrame<S, V>>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<SyncStats<S>>
where
    S: Stamp,
    V: Send + 'static,
{
    let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            driver = %synchronizer.driver().id(),
            followers = synchronizer.followers().len(),
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Sync loop started"
        );

        'run: loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                    continue;
                }
            }

            for frame in synchronizer.drain(MAX_CYCLES_PER_TICK) {
                debug!(
                    frame_id = frame.frame_id,
                    range = ?frame.range,
                    followers = frame.followers.len(),
                    "Synced frame produced"
                );
                if frames_tx.send(frame).await.is_err() {
                    warn!("Frame channel closed");
                    break 'run;
                }
            }

            observability::metrics::record_sync_stats(&synchronizer.stats());
        }

        let stats = synchronizer.stats();
        info!(
            frames = stats.frames,
            retries = stats.retries,
            aborts = stats.aborts,
            buffered = stats.total_depth(),
            "Sync loop stopped"
        );
        stats
    })
}
