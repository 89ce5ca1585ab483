//! Build synchronizers from [`SynchronizerConfig`].

use std::sync::Arc;

use captor::{
    BlockingLock, Captor, DriverPolicy, FollowerPolicy, Latched, PollingLock, Ranged, Throttled,
};
use contracts::{
    CaptorId, ConfigStamp, ContractError, DriverPolicyConfig, DriverSpec, FollowerPolicyConfig,
    FollowerSpec, LockKind, QueueConfig, SynchronizerConfig,
};

use crate::engine::{SharedDriver, SharedFollower, Synchronizer};

impl<V: Clone + Send + 'static> Synchronizer<ConfigStamp, V> {
    /// Construct every captor described by `config`
    ///
    /// # Errors
    /// Invalid policy parameters or duplicate captor ids
    pub fn from_config(config: &SynchronizerConfig) -> Result<Self, ContractError> {
        let driver = build_driver(&config.driver)?;
        let followers = config
            .followers
            .iter()
            .map(build_follower)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            driver = %config.driver.id,
            driver_policy = config.driver.policy.name(),
            followers = followers.len(),
            "building synchronizer from config"
        );

        Synchronizer::new(driver, followers)
    }
}

/// Create the driver captor for `spec`
pub fn build_driver<V: Send + 'static>(
    spec: &DriverSpec,
) -> Result<SharedDriver<ConfigStamp, V>, ContractError> {
    match &spec.policy {
        DriverPolicyConfig::Throttled(throttled) => {
            let policy = Throttled::<ConfigStamp, V>::new(throttled.throttle_period)?;
            Ok(shared_driver(spec.id.clone(), policy, &spec.queue))
        }
    }
}

/// Create a follower captor for `spec`
pub fn build_follower<V: Clone + Send + 'static>(
    spec: &FollowerSpec,
) -> Result<SharedFollower<ConfigStamp, V>, ContractError> {
    let follower = match &spec.policy {
        FollowerPolicyConfig::Latched(latched) => {
            let policy = Latched::<ConfigStamp, V>::new(latched.min_period)?;
            shared_follower(spec.id.clone(), policy, &spec.queue)
        }
        FollowerPolicyConfig::Ranged(ranged) => {
            let policy = Ranged::<ConfigStamp, V>::with_retention(
                ranged.period,
                ranged.delay,
                ranged.retention_periods,
            )?;
            shared_follower(spec.id.clone(), policy, &spec.queue)
        }
    };
    Ok(follower)
}

fn shared_driver<P: DriverPolicy>(
    id: CaptorId,
    policy: P,
    queue: &QueueConfig,
) -> SharedDriver<P::Stamp, P::Value> {
    match queue.lock {
        LockKind::Polling => Arc::new(Captor::<P, PollingLock>::with_capacity(
            id,
            policy,
            queue.capacity,
        )),
        LockKind::Blocking => Arc::new(Captor::<P, BlockingLock>::with_capacity(
            id,
            policy,
            queue.capacity,
        )),
    }
}

fn shared_follower<P: FollowerPolicy>(
    id: CaptorId,
    policy: P,
    queue: &QueueConfig,
) -> SharedFollower<P::Stamp, P::Value> {
    match queue.lock {
        LockKind::Polling => Arc::new(Captor::<P, PollingLock>::with_capacity(
            id,
            policy,
            queue.capacity,
        )),
        LockKind::Blocking => Arc::new(Captor::<P, BlockingLock>::with_capacity(
            id,
            policy,
            queue.capacity,
        )),
    }
}
