//! Synchronizer 指标收集模块
//!
//! 基于 SyncOutcome / SyncStats 收集和统计同步引擎的运行指标。

use std::collections::HashMap;

use contracts::{CaptorStats, SyncOutcome, SyncStats, SyncedFrame};
use metrics::{counter, gauge, histogram};

/// 记录一次同步周期的结果
///
/// 每次 `Synchronizer::capture` 返回时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sync_outcome;
///
/// let outcome = synchronizer.capture();
/// record_sync_outcome(&outcome);
/// ```
pub fn record_sync_outcome<S, V>(outcome: &SyncOutcome<S, V>) {
    match outcome {
        SyncOutcome::Synced(frame) => record_frame(frame),
        SyncOutcome::Retry => {
            counter!("flow_sync_cycles_total", "outcome" => "retry").increment(1);
        }
        SyncOutcome::Aborted { .. } => {
            counter!("flow_sync_cycles_total", "outcome" => "abort").increment(1);
        }
    }
}

/// 记录同步帧
pub fn record_frame<S, V>(frame: &SyncedFrame<S, V>) {
    counter!("flow_sync_cycles_total", "outcome" => "synced").increment(1);

    // 帧 ID (用于检测跳帧)
    gauge!("flow_sync_last_frame_id").set(frame.frame_id as f64);

    histogram!("flow_sync_driver_dispatches").record(frame.driver.len() as f64);

    // 各 follower 输出数量
    for follower in &frame.followers {
        histogram!(
            "flow_sync_follower_dispatches",
            "captor" => follower.id.to_string()
        )
        .record(follower.dispatches.len() as f64);
    }
}

/// 记录单个 captor 的队列深度
pub fn record_queue_depth(captor_id: &str, depth: usize) {
    gauge!(
        "flow_captor_queue_depth",
        "captor" => captor_id.to_string()
    )
    .set(depth as f64);
}

/// 记录 Synchronizer 统计快照
pub fn record_sync_stats<S>(stats: &SyncStats<S>) {
    gauge!("flow_sync_frames").set(stats.frames as f64);
    gauge!("flow_sync_retries").set(stats.retries as f64);
    gauge!("flow_sync_aborts").set(stats.aborts as f64);

    for captor in &stats.captors {
        record_captor_stats(captor);
    }
}

fn record_captor_stats<S>(captor: &CaptorStats<S>) {
    record_queue_depth(&captor.id, captor.depth);

    // 丢弃 / 乱序计数
    gauge!(
        "flow_captor_dropped_current",
        "captor" => captor.id.to_string()
    )
    .set(captor.dropped_count as f64);
    gauge!(
        "flow_captor_out_of_order_current",
        "captor" => captor.id.to_string()
    )
    .set(captor.out_of_order_count as f64);
}

/// 同步指标聚合器
///
/// 在进程内累计 `SyncOutcome`，用于测试断言和退出时的摘要输出。
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    pub total_cycles: u64,
    pub total_frames: u64,
    pub total_retries: u64,
    pub total_aborts: u64,

    /// Frame ids missing between consecutive observed frames
    pub skipped_frames: u64,
    last_frame_id: Option<u64>,

    /// Driver dispatches per frame
    pub driver_stats: RunningStats,

    /// Dispatches per frame, keyed by follower id
    pub follower_stats: HashMap<String, RunningStats>,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one synchronization cycle
    pub fn update<S, V>(&mut self, outcome: &SyncOutcome<S, V>) {
        self.total_cycles += 1;
        match outcome {
            SyncOutcome::Synced(frame) => self.update_frame(frame),
            SyncOutcome::Retry => self.total_retries += 1,
            SyncOutcome::Aborted { .. } => self.total_aborts += 1,
        }
    }

    /// Account for a frame received downstream, e.g. from the sync loop's
    /// channel, where cycles are not observable
    pub fn update_frame<S, V>(&mut self, frame: &SyncedFrame<S, V>) {
        if let Some(last) = self.last_frame_id {
            self.skipped_frames += frame.frame_id.saturating_sub(last + 1);
        }
        self.last_frame_id = Some(frame.frame_id);
        self.total_frames += 1;

        self.driver_stats.push(frame.driver.len() as f64);
        for follower in &frame.followers {
            self.follower_stats
                .entry(follower.id.to_string())
                .or_default()
                .push(follower.dispatches.len() as f64);
        }
    }

    /// Fold another aggregator (e.g. from a second synchronizer) into this one
    pub fn merge(&mut self, other: &SyncMetricsAggregator) {
        self.total_cycles += other.total_cycles;
        self.total_frames += other.total_frames;
        self.total_retries += other.total_retries;
        self.total_aborts += other.total_aborts;
        self.skipped_frames += other.skipped_frames;
        self.driver_stats.merge(&other.driver_stats);
        for (id, stats) in &other.follower_stats {
            self.follower_stats.entry(id.clone()).or_default().merge(stats);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let percent = |count: u64| match self.total_cycles {
            0 => 0.0,
            cycles => count as f64 * 100.0 / cycles as f64,
        };

        let mut followers: Vec<_> = self
            .follower_stats
            .iter()
            .map(|(id, stats)| (id.clone(), StatsSummary::from(stats)))
            .collect();
        followers.sort_by(|a, b| a.0.cmp(&b.0));

        MetricsSummary {
            total_cycles: self.total_cycles,
            total_frames: self.total_frames,
            total_retries: self.total_retries,
            total_aborts: self.total_aborts,
            skipped_frames: self.skipped_frames,
            retry_rate: percent(self.total_retries),
            abort_rate: percent(self.total_aborts),
            driver_dispatches: StatsSummary::from(&self.driver_stats),
            follower_dispatches: followers,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of [`SyncMetricsAggregator`]
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_cycles: u64,
    pub total_frames: u64,
    pub total_retries: u64,
    pub total_aborts: u64,
    pub skipped_frames: u64,
    /// Percent of cycles
    pub retry_rate: f64,
    /// Percent of cycles
    pub abort_rate: f64,
    pub driver_dispatches: StatsSummary,
    /// Sorted by follower id
    pub follower_dispatches: Vec<(String, StatsSummary)>,
}

impl MetricsSummary {
    pub fn follower(&self, id: &str) -> Option<&StatsSummary> {
        self.follower_dispatches
            .iter()
            .find(|(follower, _)| follower == id)
            .map(|(_, stats)| stats)
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(
            f,
            "cycles={} frames={} skipped={}",
            self.total_cycles, self.total_frames, self.skipped_frames
        )?;
        writeln!(
            f,
            "retry={} ({:.2}%) abort={} ({:.2}%)",
            self.total_retries, self.retry_rate, self.total_aborts, self.abort_rate
        )?;
        writeln!(f, "driver: {}", self.driver_dispatches)?;
        for (id, stats) in &self.follower_dispatches {
            writeln!(f, "{id}: {stats}")?;
        }
        Ok(())
    }
}

/// Summary statistics of a [`RunningStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    /// `None` without samples
    pub range: Option<(f64, f64)>,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            range: stats.min().zip(stats.max()),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.range {
            None => write!(f, "no samples"),
            Some((min, max)) => write!(
                f,
                "n={} mean={:.2} std={:.2} range=[{min}, {max}]",
                self.count, self.mean, self.std_dev
            ),
        }
    }
}

/// Streaming mean / variance (Welford), mergeable across instances
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    bounds: Option<(f64, f64)>,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.bounds = Some(match self.bounds {
            None => (value, value),
            Some((min, max)) => (min.min(value), max.max(value)),
        });
    }

    /// Combine with the samples of `other` (Chan et al.)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / count as f64;
        self.m2 += other.m2 + delta * delta * (self.count * other.count) as f64 / count as f64;
        self.count = count;
        self.bounds = match (self.bounds, other.bounds) {
            (Some((a_min, a_max)), Some((b_min, b_max))) => {
                Some((a_min.min(b_min), a_max.max(b_max)))
            }
            (bounds, None) | (None, bounds) => bounds,
        };
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance, zero below two samples
    pub fn variance(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => self.m2 / (n - 1) as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        self.bounds.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<f64> {
        self.bounds.map(|(_, max)| max)
    }
}

impl Extend<f64> for RunningStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        iter.into_iter().for_each(|value| self.push(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CaptureRange, Dispatch, FollowerFrame};

    fn frame(frame_id: u64, imu: usize) -> SyncedFrame<i64, u8> {
        SyncedFrame {
            frame_id,
            range: CaptureRange::at(frame_id as i64),
            driver: vec![Dispatch::new(frame_id as i64, 0)],
            followers: vec![FollowerFrame {
                id: "imu".into(),
                dispatches: (0..imu).map(|i| Dispatch::new(i as i64, 0)).collect(),
            }],
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_running_stats_moments() {
        let mut stats = RunningStats::default();
        assert_eq!(stats.min(), None);

        stats.extend([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(stats.count(), 5);
        assert!(close(stats.mean(), 3.0));
        assert!(close(stats.variance(), 2.5));
        assert_eq!(stats.min(), Some(1.0));
        assert_eq!(stats.max(), Some(5.0));
    }

    #[test]
    fn test_running_stats_merge_matches_single_pass() {
        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        let mut all = RunningStats::default();
        left.extend([2.0, 4.0, 4.0]);
        right.extend([4.0, 5.0, 5.0, 7.0, 9.0]);
        all.extend([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);

        left.merge(&right);
        assert_eq!(left.count(), all.count());
        assert!(close(left.mean(), all.mean()));
        assert!(close(left.variance(), all.variance()));
        assert_eq!(left.min(), Some(2.0));
        assert_eq!(left.max(), Some(9.0));

        let mut empty = RunningStats::default();
        empty.merge(&all);
        assert!(close(empty.mean(), 5.0));
    }

    #[test]
    fn test_aggregator_counts_outcomes() {
        let mut aggregator = SyncMetricsAggregator::new();

        aggregator.update(&SyncOutcome::Synced(frame(1, 2)));
        aggregator.update(&SyncOutcome::<i64, u8>::Retry);
        aggregator.update(&SyncOutcome::Synced(frame(2, 4)));
        aggregator.update(&SyncOutcome::<i64, u8>::Aborted { stamp: 3 });

        assert_eq!(aggregator.total_cycles, 4);
        assert_eq!(aggregator.total_frames, 2);
        assert_eq!(aggregator.total_retries, 1);
        assert_eq!(aggregator.total_aborts, 1);

        let summary = aggregator.summary();
        assert!(close(summary.retry_rate, 25.0));
        let imu = summary.follower("imu").unwrap();
        assert!(close(imu.mean, 3.0));
        assert_eq!(imu.range, Some((2.0, 4.0)));
    }

    #[test]
    fn test_aggregator_detects_skipped_frames() {
        let mut aggregator = SyncMetricsAggregator::new();
        for id in [1, 2, 5, 6, 9] {
            aggregator.update_frame(&frame(id, 1));
        }
        assert_eq!(aggregator.total_frames, 5);
        assert_eq!(aggregator.skipped_frames, 4);

        aggregator.reset();
        assert_eq!(aggregator.summary().total_frames, 0);
    }

    #[test]
    fn test_aggregator_merge() {
        let mut first = SyncMetricsAggregator::new();
        let mut second = SyncMetricsAggregator::new();
        first.update(&SyncOutcome::Synced(frame(1, 2)));
        second.update(&SyncOutcome::Synced(frame(1, 6)));
        second.update(&SyncOutcome::<i64, u8>::Retry);

        first.merge(&second);
        assert_eq!(first.total_cycles, 3);
        assert_eq!(first.total_frames, 2);
        assert!(close(first.follower_stats["imu"].mean(), 4.0));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // No global recorder installed: every call is a no-op
        record_sync_outcome(&SyncOutcome::Synced(frame(1, 2)));
        record_queue_depth("imu", 3);
        record_sync_stats(&SyncStats::<i64> {
            frames: 1,
            retries: 0,
            aborts: 0,
            captors: Vec::new(),
        });
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SyncMetricsAggregator::new();
        for _ in 0..19 {
            aggregator.update(&SyncOutcome::Synced(frame(1, 2)));
        }
        aggregator.update(&SyncOutcome::<i64, u8>::Retry);

        let output = aggregator.summary().to_string();
        assert!(output.contains("cycles=20 frames=19"));
        assert!(output.contains("retry=1 (5.00%)"));
        assert!(output.contains("imu: n=19 mean=2.00"));
        assert!(SyncMetricsAggregator::new().summary().to_string().contains("no samples"));
    }
}
