//! 配置校验模块
//!
//! 校验规则：
//! - rate_limit.max_events >= 1, rate_limit.window_sec > 0
//! - dedupe.ttl_sec > 0, dedupe.sweep_threshold > 0
//! - digest 启用时 interval_sec > 0
//! - news 启用时至少一个 http(s) feed，interval/timeout > 0
//! - marker 非空且两端互不相同
//! - max_message_len 必须能容纳 marker 前缀

use contracts::{BridgeBlueprint, ContractError, Platform};

/// `" | "` between marker and author
const PREFIX_SEPARATOR_LEN: usize = 3;

/// 校验 BridgeBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    validate_rate_limit(blueprint)?;
    validate_dedupe(blueprint)?;
    validate_digest(blueprint)?;
    validate_news(blueprint)?;
    validate_markers(blueprint)?;
    validate_message_lengths(blueprint)?;
    Ok(())
}

/// 校验限流参数
fn validate_rate_limit(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let limits = &blueprint.rate_limit;

    if limits.max_events == 0 {
        return Err(ContractError::config_validation(
            "rate_limit.max_events",
            "max_events must be >= 1",
        ));
    }
    if limits.window_sec == 0 {
        return Err(ContractError::config_validation(
            "rate_limit.window_sec",
            "window_sec must be > 0",
        ));
    }
    Ok(())
}

/// 校验去重参数
fn validate_dedupe(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let dedupe = &blueprint.dedupe;

    if dedupe.ttl_sec == 0 {
        return Err(ContractError::config_validation(
            "dedupe.ttl_sec",
            "ttl_sec must be > 0",
        ));
    }
    if dedupe.sweep_threshold == 0 {
        return Err(ContractError::config_validation(
            "dedupe.sweep_threshold",
            "sweep_threshold must be > 0",
        ));
    }
    Ok(())
}

/// 校验定时摘要
fn validate_digest(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let digest = &blueprint.digest;

    if digest.enabled && digest.interval_sec == 0 {
        return Err(ContractError::config_validation(
            "digest.interval_sec",
            "interval_sec must be > 0 when the digest is enabled",
        ));
    }
    Ok(())
}

/// 校验新闻订阅
fn validate_news(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let news = &blueprint.news;
    if !news.enabled {
        return Ok(());
    }

    if news.feeds.is_empty() {
        return Err(ContractError::config_validation(
            "news.feeds",
            "at least one feed is required when news is enabled",
        ));
    }
    for (idx, feed) in news.feeds.iter().enumerate() {
        let feed = feed.trim();
        if !(feed.starts_with("http://") || feed.starts_with("https://")) {
            return Err(ContractError::config_validation(
                format!("news.feeds[{idx}]"),
                format!("'{feed}' is not an http(s) URL"),
            ));
        }
    }
    if news.interval_sec == 0 {
        return Err(ContractError::config_validation(
            "news.interval_sec",
            "interval_sec must be > 0 when news is enabled",
        ));
    }
    if news.request_timeout_sec == 0 {
        return Err(ContractError::config_validation(
            "news.request_timeout_sec",
            "request_timeout_sec must be > 0",
        ));
    }
    Ok(())
}

/// 校验 marker：非空且互不相同
fn validate_markers(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    for platform in Platform::ALL {
        let marker = blueprint.platform(platform).effective_marker(platform);
        if marker.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("{}.marker", platform.config_key()),
                "marker cannot be empty",
            ));
        }
    }

    let telegram = blueprint.telegram.effective_marker(Platform::Telegram);
    let discord = blueprint.discord.effective_marker(Platform::Discord);
    if telegram.starts_with(&discord) || discord.starts_with(&telegram) {
        return Err(ContractError::config_validation(
            "telegram.marker / discord.marker",
            format!(
                "markers must be distinct and neither a prefix of the other ('{telegram}' vs '{discord}')"
            ),
        ));
    }
    Ok(())
}

/// 校验消息长度上限能容纳对端 marker 前缀
fn validate_message_lengths(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    for destination in Platform::ALL {
        let origin = destination.opposite();
        let max_len = blueprint.platform(destination).effective_max_len(destination);
        let prefix_len = blueprint
            .platform(origin)
            .effective_marker(origin)
            .chars()
            .count()
            + PREFIX_SEPARATOR_LEN;

        if max_len <= prefix_len {
            return Err(ContractError::config_validation(
                format!("{}.max_message_len", destination.config_key()),
                format!("max_message_len ({max_len}) must exceed the relay prefix ({prefix_len} chars)"),
            ));
        }
    }
    Ok(())
}
