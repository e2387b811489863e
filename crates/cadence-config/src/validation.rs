// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as hour ranges, positive durations, and backoff factors. Every
//! duration has an upper bound so derived timestamps stay far from the
//! limits of the date types and inside the scheduler's one-year horizon.

use crate::diagnostic::ConfigError;
use crate::model::{CadenceConfig, StorageBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest timeout, TTL, or delay in seconds (30 days).
const MAX_SECS: u64 = 30 * 24 * 60 * 60;
const MAX_RETRY_BACKOFF_MS: u64 = 60_000;
/// Longest window, cooldown, or cadence in hours (90 days).
const MAX_HOURS: u32 = 90 * 24;
/// Longest gap or recency in minutes (7 days).
const MAX_MINUTES: u32 = 7 * 24 * 60;
const MAX_HORIZON_HOURS: u32 = 14 * 24;
const MAX_BACKOFF_FACTOR: f64 = 100.0;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CadenceConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        fail("storage.database_path must not be empty".to_string());
    }

    let orch = &config.orchestrator;
    for (name, value) in [
        ("orchestrator.tick_interval_secs", orch.tick_interval_secs),
        ("orchestrator.generation_timeout_secs", orch.generation_timeout_secs),
        ("orchestrator.send_timeout_secs", orch.send_timeout_secs),
        ("orchestrator.confirmation_ttl_secs", orch.confirmation_ttl_secs),
    ] {
        if value == 0 {
            fail(format!("{name} must be greater than 0"));
        }
    }
    for (name, value) in [
        ("orchestrator.tick_interval_secs", orch.tick_interval_secs),
        ("orchestrator.generation_timeout_secs", orch.generation_timeout_secs),
        ("orchestrator.send_timeout_secs", orch.send_timeout_secs),
        ("orchestrator.confirmation_ttl_secs", orch.confirmation_ttl_secs),
        ("orchestrator.retry_delay_secs", orch.retry_delay_secs),
        (
            "orchestrator.presence_promotion_window_secs",
            orch.presence_promotion_window_secs,
        ),
    ] {
        if value > MAX_SECS {
            fail(format!("{name} must be at most {MAX_SECS}, got {value}"));
        }
    }
    if orch.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
        fail(format!(
            "orchestrator.retry_backoff_ms must be at most {MAX_RETRY_BACKOFF_MS}, got {}",
            orch.retry_backoff_ms
        ));
    }
    for (name, value) in [
        ("orchestrator.max_entries_per_tick", orch.max_entries_per_tick),
        ("orchestrator.worker_concurrency", orch.worker_concurrency),
        ("orchestrator.event_buffer", orch.event_buffer),
    ] {
        if value == 0 {
            fail(format!("{name} must be at least 1"));
        }
    }
    if orch.max_attempts == 0 {
        fail("orchestrator.max_attempts must be at least 1".to_string());
    }
    if !(0.0..=1.0).contains(&orch.min_confidence_gain) {
        fail(format!(
            "orchestrator.min_confidence_gain must be within [0, 1], got {}",
            orch.min_confidence_gain
        ));
    }

    let fatigue = &config.fatigue;
    if fatigue.window_hours == 0 {
        fail("fatigue.window_hours must be greater than 0".to_string());
    }
    if fatigue.max_contacts == 0 {
        fail("fatigue.max_contacts must be at least 1".to_string());
    }
    if !(1.0..=MAX_BACKOFF_FACTOR).contains(&fatigue.negative_backoff_factor) {
        fail(format!(
            "fatigue.negative_backoff_factor must be within [1.0, {MAX_BACKOFF_FACTOR}], got {}",
            fatigue.negative_backoff_factor
        ));
    }
    for (name, value) in [
        ("fatigue.window_hours", fatigue.window_hours),
        ("fatigue.base_cooldown_hours", fatigue.base_cooldown_hours),
        ("fatigue.max_cooldown_hours", fatigue.max_cooldown_hours),
    ] {
        if value > MAX_HOURS {
            fail(format!("{name} must be at most {MAX_HOURS}, got {value}"));
        }
    }
    if fatigue.max_cooldown_hours == 0 {
        fail("fatigue.max_cooldown_hours must be greater than 0".to_string());
    } else if fatigue.base_cooldown_hours > fatigue.max_cooldown_hours {
        fail(format!(
            "fatigue.base_cooldown_hours ({}) must not exceed max_cooldown_hours ({})",
            fatigue.base_cooldown_hours, fatigue.max_cooldown_hours
        ));
    }
    if fatigue.min_gap_minutes > MAX_MINUTES {
        fail(format!(
            "fatigue.min_gap_minutes must be at most {MAX_MINUTES}, got {}",
            fatigue.min_gap_minutes
        ));
    }

    let timing = &config.timing;
    if timing.business_hours_start >= 24 || timing.business_hours_end > 24 {
        fail("timing.business_hours_start/end must be within 0..=24".to_string());
    } else if timing.business_hours_start >= timing.business_hours_end {
        fail(format!(
            "timing.business_hours_start ({}) must be before business_hours_end ({})",
            timing.business_hours_start, timing.business_hours_end
        ));
    }
    if timing.default_utc_offset_minutes.abs() > 14 * 60 {
        fail(format!(
            "timing.default_utc_offset_minutes must be within +/-840, got {}",
            timing.default_utc_offset_minutes
        ));
    }
    if timing.horizon_hours == 0 || timing.horizon_hours > MAX_HORIZON_HOURS {
        fail(format!(
            "timing.horizon_hours must be within 1..={MAX_HORIZON_HOURS}, got {}",
            timing.horizon_hours
        ));
    }
    if timing.candidate_step_minutes == 0 || timing.candidate_step_minutes > MAX_MINUTES {
        fail(format!(
            "timing.candidate_step_minutes must be within 1..={MAX_MINUTES}, got {}",
            timing.candidate_step_minutes
        ));
    }
    if timing.presence_recency_minutes > MAX_MINUTES {
        fail(format!(
            "timing.presence_recency_minutes must be at most {MAX_MINUTES}, got {}",
            timing.presence_recency_minutes
        ));
    }
    if timing.history_capacity == 0 {
        fail("timing.history_capacity must be at least 1".to_string());
    }
    if !(timing.decay_half_life_days > 0.0 && timing.decay_half_life_days <= 365.0) {
        fail(format!(
            "timing.decay_half_life_days must be within (0, 365], got {}",
            timing.decay_half_life_days
        ));
    }

    let strategy = &config.strategy;
    for (name, value) in [
        ("strategy.business_cadence_hours", strategy.business_cadence_hours),
        ("strategy.casual_cadence_hours", strategy.casual_cadence_hours),
        ("strategy.urgent_cadence_hours", strategy.urgent_cadence_hours),
    ] {
        if value == 0 {
            fail(format!("{name} must be greater than 0"));
        } else if value > MAX_HOURS {
            fail(format!("{name} must be at most {MAX_HOURS}, got {value}"));
        }
    }
    if strategy.business_bias_hours > MAX_HOURS {
        fail(format!(
            "strategy.business_bias_hours must be at most {MAX_HOURS}, got {}",
            strategy.business_bias_hours
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CadenceConfig::default()).is_ok());
    }

    #[test]
    fn inverted_business_hours_fail_validation() {
        let mut config = CadenceConfig::default();
        config.timing.business_hours_start = 18;
        config.timing.business_hours_end = 9;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "business_hours_start"));
    }

    #[test]
    fn backoff_factor_below_one_fails_validation() {
        let mut config = CadenceConfig::default();
        config.fatigue.negative_backoff_factor = 0.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "negative_backoff_factor"));
    }

    #[test]
    fn non_finite_backoff_factor_fails_validation() {
        let mut config = CadenceConfig::default();
        config.fatigue.negative_backoff_factor = f64::NAN;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "negative_backoff_factor"));
    }

    #[test]
    fn huge_durations_fail_validation() {
        let mut config = CadenceConfig::default();
        config.orchestrator.confirmation_ttl_secs = u64::MAX;
        config.orchestrator.retry_delay_secs = u64::MAX;
        config.fatigue.window_hours = u32::MAX;
        config.fatigue.min_gap_minutes = u32::MAX;
        config.strategy.casual_cadence_hours = u32::MAX;
        config.timing.horizon_hours = u32::MAX;
        let errors = validate_config(&config).unwrap_err();
        for field in [
            "confirmation_ttl_secs",
            "retry_delay_secs",
            "window_hours",
            "min_gap_minutes",
            "casual_cadence_hours",
            "horizon_hours",
        ] {
            assert!(has_error(&errors, field), "no error for {field}");
        }
    }

    #[test]
    fn base_cooldown_above_cap_fails_validation() {
        let mut config = CadenceConfig::default();
        config.fatigue.base_cooldown_hours = 12;
        config.fatigue.max_cooldown_hours = 8;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "must not exceed max_cooldown_hours"));

        config.fatigue.max_cooldown_hours = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "max_cooldown_hours must be greater than 0"));
    }

    #[test]
    fn empty_database_path_ok_for_memory_backend() {
        let mut config = CadenceConfig::default();
        config.storage.database_path = String::new();
        assert!(validate_config(&config).is_err());
        config.storage.backend = StorageBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = CadenceConfig::default();
        config.orchestrator.worker_concurrency = 0;
        config.fatigue.max_contacts = 0;
        config.agent.log_level = "loud".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
