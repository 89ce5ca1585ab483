//! # Sync Engine
//!
//! 多数据流时间同步引擎。
//!
//! 负责：
//! - 每个周期运行一个 Driver 和 N 个 Follower
//! - RETRY 时保留待处理窗口（不丢失 Driver 数据）
//! - ABORT 时对所有 Captor 执行 `abort` 并推进
//! - 输出 `SyncedFrame`
//!
//! ## 使用示例
//!
//! ```no_run
//! use std::time::Duration;
//! use sync_engine::{spawn_sync_loop, CaptorInterface, Synchronizer, SynchronizerConfig};
//! use tokio::sync::{mpsc, watch};
//!
//! # async fn run(config: SynchronizerConfig) -> Result<(), contracts::ContractError> {
//! let sync = Synchronizer::<i64, Vec<u8>>::from_config(&config)?;
//! let camera = sync.driver().clone();
//!
//! let (frames_tx, mut frames_rx) = mpsc::channel(64);
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = spawn_sync_loop(sync, Duration::from_millis(5), frames_tx, shutdown_rx);
//!
//! camera.inject(0, vec![0u8; 16]);
//! if let Some(frame) = frames_rx.recv().await {
//!     println!("frame {} at {:?}", frame.frame_id, frame.range);
//! }
//!
//! let _ = shutdown_tx.send(true);
//! let _stats = handle.await;
//! # Ok(())
//! # }
//! ```

mod engine;
mod factory;
mod runner;

pub use engine::{SharedDriver, SharedFollower, Synchronizer};
pub use factory::{build_driver, build_follower};
pub use runner::spawn_sync_loop;

// Re-export captor role traits
pub use captor::{CaptorInterface, Driver, Follower};

// Re-export contracts types
pub use contracts::{SyncOutcome, SyncStats, SyncedFrame, SynchronizerConfig};
