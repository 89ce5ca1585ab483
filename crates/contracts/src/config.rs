//! Synchronizer configuration contracts that can be shared across crates.
//!
//! Stamps and offsets in configuration files are plain `i64` ticks; the
//! unit (ns, µs, frame counts, ...) is whatever the producers stamp with.

use serde::{Deserialize, Serialize};

use crate::CaptorId;

/// Stamp/offset type used by file-based configuration
pub type ConfigStamp = i64;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete synchronizer description: one driver, any number of followers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynchronizerConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Captor proposing the window of every cycle
    pub driver: DriverSpec,

    /// Captors that must satisfy the driver's window, in output order
    #[serde(default)]
    pub followers: Vec<FollowerSpec>,
}

impl SynchronizerConfig {
    /// Every captor id, driver first
    pub fn captor_ids(&self) -> impl Iterator<Item = &CaptorId> {
        std::iter::once(&self.driver.id).chain(self.followers.iter().map(|f| &f.id))
    }
}

/// Driver captor description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSpec {
    pub id: CaptorId,

    #[serde(flatten)]
    pub policy: DriverPolicyConfig,

    #[serde(default)]
    pub queue: QueueConfig,
}

/// Follower captor description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerSpec {
    pub id: CaptorId,

    #[serde(flatten)]
    pub policy: FollowerPolicyConfig,

    #[serde(default)]
    pub queue: QueueConfig,
}

/// Driver policy selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DriverPolicyConfig {
    /// Rate-limited driver
    Throttled(ThrottledConfig),
}

/// Follower policy selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FollowerPolicyConfig {
    /// Holds the newest trusted value
    Latched(LatchedConfig),
    /// Captures a bracket around the delayed window
    Ranged(RangedConfig),
}

impl DriverPolicyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            DriverPolicyConfig::Throttled(_) => "throttled",
        }
    }
}

impl FollowerPolicyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            FollowerPolicyConfig::Latched(_) => "latched",
            FollowerPolicyConfig::Ranged(_) => "ranged",
        }
    }
}

/// Throttled driver parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottledConfig {
    /// Minimum spacing between successive driver emissions
    pub throttle_period: ConfigStamp,
}

/// Latched follower parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatchedConfig {
    /// How old data must be, relative to the window, before it is trusted
    pub min_period: ConfigStamp,
}

/// Ranged follower parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangedConfig {
    /// Expected period of the stream; also the abort retention unit
    pub period: ConfigStamp,

    /// Shift applied to the driver's window
    #[serde(default)]
    pub delay: ConfigStamp,

    /// Number of periods kept behind the window on abort
    #[serde(default = "default_retention_periods")]
    pub retention_periods: u32,
}

/// Default number of `period`s retained behind an aborted window
pub const DEFAULT_RETENTION_PERIODS: u32 = 1;

fn default_retention_periods() -> u32 {
    DEFAULT_RETENTION_PERIODS
}

/// Per-captor queue and locking configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum buffered dispatches; oldest are dropped on overflow
    #[serde(default)]
    pub capacity: Option<usize>,

    /// Locking used to share the captor between producers and the synchronizer
    #[serde(default)]
    pub lock: LockKind,
}

/// Lock policy for captors shared across threads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    /// Spin on `try_lock`, yielding between bursts; never parks the thread
    #[default]
    Polling,
    /// Park until the lock is free
    Blocking,
}
