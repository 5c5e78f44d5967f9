//! 配置校验模块
//!
//! 校验规则：
//! - stream.name / stream_type 非空
//! - channel_count > 0, rate_hz >= 0
//! - channel_labels 不长于 channel_count（更短时自动补全标签）
//! - device_channels <= channel_count
//! - resolve.property 为 "name" 或 "type"，timeout_secs > 0
//! - failure_threshold >= 1
//! - consumer 名称非空且唯一；file 消费者必须带 path 参数

use std::collections::HashSet;

use contracts::{ConsumerKind, RelayConfig, RelayError};

/// 校验 RelayConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RelayConfig) -> Result<(), RelayError> {
    validate_stream(config)?;
    validate_resolve(config)?;
    validate_pacing(config)?;
    validate_consumers(config)?;
    Ok(())
}

/// 校验流标识与通道布局
fn validate_stream(config: &RelayConfig) -> Result<(), RelayError> {
    let stream = &config.stream;

    if stream.name.is_empty() {
        return Err(RelayError::config_validation(
            "stream.name",
            "stream name cannot be empty",
        ));
    }
    if stream.stream_type.is_empty() {
        return Err(RelayError::config_validation(
            "stream.stream_type",
            "stream type cannot be empty",
        ));
    }
    if stream.channel_count == 0 {
        return Err(RelayError::config_validation(
            "stream.channel_count",
            "channel_count must be > 0",
        ));
    }
    if stream.rate_hz < 0.0 || !stream.rate_hz.is_finite() {
        return Err(RelayError::config_validation(
            "stream.rate_hz",
            format!("rate_hz must be >= 0 and finite, got {}", stream.rate_hz),
        ));
    }
    if stream.channel_labels.len() > stream.channel_count {
        return Err(RelayError::config_validation(
            "stream.channel_labels",
            format!(
                "{} labels for {} channels",
                stream.channel_labels.len(),
                stream.channel_count
            ),
        ));
    }
    if let Some(device_channels) = stream.device_channels {
        if device_channels > stream.channel_count {
            return Err(RelayError::config_validation(
                "stream.device_channels",
                format!(
                    "device_channels ({device_channels}) exceeds channel_count ({})",
                    stream.channel_count
                ),
            ));
        }
    }
    Ok(())
}

/// 校验发现查询
fn validate_resolve(config: &RelayConfig) -> Result<(), RelayError> {
    let resolve = &config.resolve;

    if resolve.property != "name" && resolve.property != "type" {
        return Err(RelayError::config_validation(
            "resolve.property",
            format!(
                "property must be \"name\" or \"type\", got \"{}\"",
                resolve.property
            ),
        ));
    }
    if resolve.timeout_secs <= 0.0 || !resolve.timeout_secs.is_finite() {
        return Err(RelayError::config_validation(
            "resolve.timeout_secs",
            format!("timeout_secs must be > 0, got {}", resolve.timeout_secs),
        ));
    }
    Ok(())
}

/// 校验节拍策略
fn validate_pacing(config: &RelayConfig) -> Result<(), RelayError> {
    if config.pacing.failure_threshold == 0 {
        return Err(RelayError::config_validation(
            "pacing.failure_threshold",
            "failure_threshold must be >= 1",
        ));
    }
    if config.pacing.pull_timeout_ms == 0 {
        return Err(RelayError::config_validation(
            "pacing.pull_timeout_ms",
            "pull_timeout_ms must be >= 1",
        ));
    }
    Ok(())
}

/// 校验消费者列表
fn validate_consumers(config: &RelayConfig) -> Result<(), RelayError> {
    let mut seen = HashSet::new();
    for (idx, consumer) in config.consumers.iter().enumerate() {
        if consumer.name.is_empty() {
            return Err(RelayError::config_validation(
                format!("consumers[{idx}].name"),
                "consumer name cannot be empty",
            ));
        }
        if !seen.insert(&consumer.name) {
            return Err(RelayError::config_validation(
                format!("consumers[name={}]", consumer.name),
                "duplicate consumer name",
            ));
        }
        if consumer.kind == ConsumerKind::File && !consumer.params.contains_key("path") {
            return Err(RelayError::config_validation(
                format!("consumers[{}].params.path", consumer.name),
                "file consumer requires a path parameter",
            ));
        }
    }
    Ok(())
}
