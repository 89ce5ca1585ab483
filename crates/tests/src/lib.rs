//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> Synchronizer -> 帧 的 e2e 测试
//! - 多生产者并发注入测试

#[cfg(test)]
mod contract_tests {
    use contracts::{CaptureRange, ConfigVersion, State};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = ConfigVersion::V1;
    }

    #[test]
    fn test_state_merge_precedence() {
        assert_eq!(State::Primed.merge(State::Retry), State::Retry);
        assert_eq!(State::Retry.merge(State::Abort), State::Abort);
        assert_eq!(State::Abort.merge(State::Primed), State::Abort);
        assert_eq!(State::Primed.merge(State::Primed), State::Primed);
    }

    #[test]
    fn test_capture_range_contains_bounds() {
        let range = CaptureRange::new(10i64, 20);
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(21));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use captor::{Captor, CaptorInterface, PollingLock, Ranged, Throttled};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ConfigStamp, SyncOutcome, SyncedFrame};
    use observability::SyncMetricsAggregator;
    use sync_engine::{spawn_sync_loop, SharedDriver, SharedFollower, Synchronizer};
    use tokio::sync::{mpsc, watch};

    const CONFIG: &str = r#"
        [driver]
        id = "camera"
        policy = "throttled"
        throttle_period = 10

        [[followers]]
        id = "imu"
        policy = "ranged"
        period = 5

        [[followers]]
        id = "map"
        policy = "latched"
        min_period = 0

        [followers.queue]
        capacity = 4
        lock = "blocking"
    "#;

    fn synchronizer() -> Synchronizer<ConfigStamp, u32> {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        Synchronizer::from_config(&config).unwrap()
    }

    /// 检查 ranged follower 的输出包围了驱动窗口
    fn assert_bracketed(frame: &SyncedFrame<ConfigStamp, u32>, follower: &str) {
        let dispatches = frame.follower(follower).unwrap();
        let first = dispatches.first().unwrap().stamp();
        let last = dispatches.last().unwrap().stamp();
        assert!(
            first < frame.range.lower_stamp && last > frame.range.upper_stamp,
            "frame {} window {:?} not bracketed by [{}, {}]",
            frame.frame_id,
            frame.range,
            first,
            last
        );
    }

    /// End-to-end test: TOML -> ConfigLoader -> Synchronizer -> SyncedFrame
    #[test]
    fn test_e2e_config_pipeline() {
        let mut sync = synchronizer();
        for stamp in [0, 10, 20] {
            sync.inject("camera", stamp, stamp as u32).unwrap();
        }
        for stamp in (-5..=25).step_by(5) {
            sync.inject("imu", stamp, 0).unwrap();
        }
        sync.inject("map", 0, 42).unwrap();

        let frames = sync.drain(16);
        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.frame_id, i as u64 + 1);
            assert_eq!(frame.driver.len(), 1);
            assert_eq!(frame.follower("imu").unwrap().len(), 3);
            assert_bracketed(frame, "imu");

            // Latched value is repeated for every frame
            let map = frame.follower("map").unwrap();
            assert_eq!(map.len(), 1);
            assert_eq!(*map[0].value(), 42);
        }

        // Nothing left for the driver
        assert_eq!(sync.capture(), SyncOutcome::Retry);
        assert_eq!(sync.frame_count(), 3);
    }

    /// 数据迟到时 RETRY 不丢失任何驱动窗口
    #[test]
    fn test_late_follower_data_loses_no_window() {
        let mut sync = synchronizer();
        sync.inject("map", 0, 1).unwrap();
        sync.inject("imu", -5, 0).unwrap();

        let mut windows = Vec::new();
        for stamp in (0..50).step_by(10) {
            sync.inject("camera", stamp, 0).unwrap();
            // Follower lags behind the driver
            assert_eq!(sync.capture(), SyncOutcome::Retry);
            sync.inject("imu", stamp + 5, 0).unwrap();
            windows.extend(sync.drain(4).into_iter().map(|f| f.range.lower_stamp));
        }

        assert_eq!(windows, vec![0, 10, 20, 30, 40]);
        assert_eq!(sync.stats().aborts, 0);
        assert_eq!(sync.stats().retries, 5 + 5);
    }

    /// ABORT 之后同步器从下一个驱动窗口恢复
    #[test]
    fn test_abort_recovery() {
        let mut sync = synchronizer();
        for stamp in [0, 10, 20] {
            sync.inject("camera", stamp, 0).unwrap();
        }
        // imu starts late: window 0 can never be bracketed
        for stamp in [3, 15, 25] {
            sync.inject("imu", stamp, 0).unwrap();
        }
        sync.inject("map", 0, 0).unwrap();

        let mut aggregator = SyncMetricsAggregator::new();
        let mut frames = Vec::new();
        loop {
            let outcome = sync.capture();
            aggregator.update(&outcome);
            match outcome {
                SyncOutcome::Synced(frame) => frames.push(frame),
                SyncOutcome::Aborted { stamp } => assert_eq!(stamp, 0),
                SyncOutcome::Retry => break,
            }
        }

        let windows: Vec<ConfigStamp> = frames.iter().map(|f| f.range.lower_stamp).collect();
        assert_eq!(windows, vec![10, 20]);
        frames.iter().for_each(|f| assert_bracketed(f, "imu"));

        let summary = aggregator.summary();
        assert_eq!(summary.total_aborts, 1);
        assert_eq!(summary.total_frames, 2);
        assert_eq!(summary.total_retries, 1);
    }

    /// Bounded queue drops the oldest dispatches
    #[test]
    fn test_bounded_follower_queue() {
        let sync = synchronizer();
        for stamp in 0..10 {
            sync.inject("map", stamp, stamp as u32).unwrap();
        }
        let map = sync.follower("map").unwrap();
        let stats = map.stats();
        assert_eq!(stats.depth, 4);
        assert_eq!(stats.dropped_count, 6);
        assert_eq!(stats.available.unwrap().lower_stamp, 6);
    }

    /// 多个生产者线程并发注入
    #[test]
    fn test_concurrent_producers() {
        let mut sync = synchronizer();
        let camera = Arc::clone(sync.driver());
        let imu = Arc::clone(sync.follower("imu").unwrap());
        let map = Arc::clone(sync.follower("map").unwrap());

        let producers = vec![
            thread::spawn(move || {
                for stamp in (0..=100).step_by(10) {
                    camera.inject(stamp, 1);
                }
            }),
            thread::spawn(move || {
                for stamp in (-5..=105).step_by(5) {
                    imu.inject(stamp, 2);
                }
            }),
            thread::spawn(move || map.inject(0, 3)),
        ];
        for producer in producers {
            producer.join().unwrap();
        }

        let frames = sync.drain(1024);
        assert_eq!(frames.len(), 11);
        frames.iter().for_each(|f| assert_bracketed(f, "imu"));

        let stats = sync.stats();
        assert_eq!(stats.captors[0].out_of_order_count, 0);
        assert_eq!(stats.captors[1].out_of_order_count, 0);
    }

    /// Duration 时间戳同样可用
    #[test]
    fn test_duration_stamps() {
        type Value = &'static str;

        let ms = Duration::from_millis;
        let driver: SharedDriver<Duration, Value> = Arc::new(Captor::<_, PollingLock>::new(
            "camera",
            Throttled::<Duration, Value>::new(ms(10)).unwrap(),
        ));
        let imu: SharedFollower<Duration, Value> = Arc::new(Captor::<_, PollingLock>::new(
            "imu",
            Ranged::<Duration, Value>::new(ms(5), Duration::ZERO).unwrap(),
        ));
        let mut sync = Synchronizer::new(driver, vec![imu]).unwrap();

        for stamp in [10, 20] {
            sync.inject("camera", ms(stamp), "frame").unwrap();
        }
        for stamp in (5..=25).step_by(5) {
            sync.inject("imu", ms(stamp), "imu").unwrap();
        }

        let frames = sync.drain(8);
        assert_eq!(frames.len(), 2);
        let imu = frames[1].follower("imu").unwrap();
        let stamps: Vec<Duration> = imu.iter().map(|d| d.stamp()).collect();
        assert_eq!(stamps, vec![ms(15), ms(20), ms(25)]);
    }

    /// Producers -> spawn_sync_loop -> frame channel
    #[tokio::test]
    async fn test_e2e_sync_loop() {
        let sync = synchronizer();
        let camera = Arc::clone(sync.driver());
        let imu = Arc::clone(sync.follower("imu").unwrap());
        sync.inject("map", -1000, 7).unwrap();

        let (frames_tx, mut frames_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_sync_loop(sync, Duration::from_millis(1), frames_tx, shutdown_rx);

        let producer = tokio::spawn(async move {
            imu.inject(-5, 0);
            for tick in 0..20 {
                let stamp = tick * 10;
                camera.inject(stamp, tick as u32);
                imu.inject(stamp, 0);
                imu.inject(stamp + 5, 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        });

        let target_frames = 5;
        let mut aggregator = SyncMetricsAggregator::new();
        let mut previous_id = 0;
        while aggregator.total_frames < target_frames {
            let frame = tokio::time::timeout(Duration::from_secs(5), frames_rx.recv())
                .await
                .expect("Pipeline timed out")
                .expect("Frame channel closed early");
            assert_eq!(frame.frame_id, previous_id + 1);
            previous_id = frame.frame_id;
            assert_bracketed(&frame, "imu");
            aggregator.update_frame(&frame);
        }

        producer.await.unwrap();
        shutdown_tx.send(true).unwrap();
        let stats = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Sync loop did not stop")
            .unwrap();

        assert!(stats.frames >= target_frames);
        assert_eq!(stats.aborts, 0);
        let summary = aggregator.summary();
        assert_eq!(summary.driver_dispatches.count, target_frames);
        assert!(summary.follower("map").is_some());
        assert_eq!(summary.skipped_frames, 0);
    }
}
