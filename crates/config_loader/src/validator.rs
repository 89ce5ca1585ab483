//! 配置校验模块
//!
//! 校验规则：
//! - captor id 非空且唯一 (driver + followers)
//! - 时间偏移参数 >= 0 (throttle_period / min_period / period / delay)
//! - retention_periods >= 1
//! - queue.capacity > 0 (如果设置)
//!
//! 字段路径统一按位置编号：`driver.*`、`followers[<idx>].*`。

use std::collections::HashSet;

use contracts::{
    ContractError, DriverPolicyConfig, FollowerPolicyConfig, QueueConfig, SynchronizerConfig,
};

/// 校验 SynchronizerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &SynchronizerConfig) -> Result<(), ContractError> {
    validate_captor_ids(config)?;
    validate_driver(config)?;
    validate_followers(config)?;
    Ok(())
}

/// 校验 captor id 非空且唯一
fn validate_captor_ids(config: &SynchronizerConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, id) in config.captor_ids().enumerate() {
        if id.trim().is_empty() {
            return Err(ContractError::config_validation(
                captor_path(idx),
                "captor id cannot be empty",
            ));
        }
        if !seen.insert(id) {
            return Err(ContractError::config_validation(
                format!("{}[id={}]", captor_path(idx), id),
                "duplicate captor id",
            ));
        }
    }
    Ok(())
}

/// 校验 driver 参数
fn validate_driver(config: &SynchronizerConfig) -> Result<(), ContractError> {
    let driver = &config.driver;
    match &driver.policy {
        DriverPolicyConfig::Throttled(throttled) => {
            non_negative("driver.throttle_period", throttled.throttle_period)?;
        }
    }
    validate_queue("driver.queue", &driver.queue)
}

/// 校验 follower 参数
fn validate_followers(config: &SynchronizerConfig) -> Result<(), ContractError> {
    for (idx, follower) in config.followers.iter().enumerate() {
        let path = format!("followers[{idx}]");
        match &follower.policy {
            FollowerPolicyConfig::Latched(latched) => {
                non_negative(&format!("{path}.min_period"), latched.min_period)?;
            }
            FollowerPolicyConfig::Ranged(ranged) => {
                non_negative(&format!("{path}.period"), ranged.period)?;
                non_negative(&format!("{path}.delay"), ranged.delay)?;
                if ranged.retention_periods == 0 {
                    return Err(ContractError::config_validation(
                        format!("{path}.retention_periods"),
                        "retention_periods must be >= 1",
                    ));
                }
            }
        }
        validate_queue(&format!("{path}.queue"), &follower.queue)?;
    }
    Ok(())
}

/// 校验队列容量
fn validate_queue(path: &str, queue: &QueueConfig) -> Result<(), ContractError> {
    if queue.capacity == Some(0) {
        return Err(ContractError::config_validation(
            format!("{path}.capacity"),
            "capacity must be > 0",
        ));
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<(), ContractError> {
    if value < 0 {
        return Err(ContractError::config_validation(
            field,
            format!("must be >= 0, got {value}"),
        ));
    }
    Ok(())
}

fn captor_path(idx: usize) -> String {
    match idx {
        0 => "driver".to_string(),
        n => format!("followers[{}]", n - 1),
    }
}
