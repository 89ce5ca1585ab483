//! # Captor
//!
//! 单数据流的缓冲状态机。
//!
//! 每个 [`Captor`] 持有一个按时间戳排序的 [`DispatchQueue`]，并在每个同步周期
//! 根据其策略返回 [`State`]：
//! - `Primed`: 可以为当前窗口提供数据
//! - `Retry`: 数据不足，稍后重试（不丢弃数据）
//! - `Abort`: 窗口已不可达，需要 `abort` 并推进
//!
//! ## Roles
//! - [`Driver`]: proposes the window ([`Throttled`])
//! - [`Follower`]: satisfies it ([`Latched`], [`Ranged`])
//!
//! ## 使用示例
//!
//! ```
//! use captor::{Captor, CaptureRange, Driver, Follower, PollingLock, Ranged, State, Throttled};
//!
//! let driver: Captor<Throttled<i64, &str>, PollingLock> =
//!     Captor::new("camera", Throttled::new(10).unwrap());
//! let follower: Captor<Ranged<i64, &str>, PollingLock> =
//!     Captor::new("imu", Ranged::new(5, 0).unwrap());
//!
//! driver.inject(100, "frame");
//! for stamp in [95, 100, 105] {
//!     follower.inject(stamp, "sample");
//! }
//!
//! let mut frame = Vec::new();
//! let mut range = CaptureRange::default();
//! assert_eq!(driver.capture(&mut frame, &mut range), State::Primed);
//!
//! let mut samples = Vec::new();
//! assert_eq!(follower.capture(&mut samples, &range), State::Primed);
//! assert_eq!(samples.len(), 3);
//! ```

mod captor;
pub mod driver;
pub mod follower;
pub mod lock;
mod policy;
mod queue;

pub use captor::{Captor, CaptorInterface, Driver, Follower};
pub use driver::Throttled;
pub use follower::{Latched, Ranged};
pub use lock::{BlockingLock, LockPolicy, NoLock, PollingLock};
pub use policy::{DriverPolicy, FollowerPolicy, Policy};
pub use queue::DispatchQueue;

// Re-export contracts types
pub use contracts::{
    CaptorId, CaptorStats, CaptureRange, Dispatch, DispatchSink, Stamp, StampRange, State,
};
