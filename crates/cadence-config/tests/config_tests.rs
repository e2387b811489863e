// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Cadence configuration system.

use cadence_config::diagnostic::ConfigError;
use cadence_config::model::{CadenceConfig, StorageBackend};
use cadence_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use cadence_core::{FunnelStage, OperatingMode};
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;

#[test]
fn full_toml_deserializes_into_cadence_config() {
    let toml = r#"
[agent]
name = "nurture-bot"
log_level = "debug"

[storage]
backend = "memory"
database_path = "/tmp/cadence-test.db"
wal_mode = false

[orchestrator]
mode = "auto"
tick_interval_secs = 30
max_entries_per_tick = 10
worker_concurrency = 2
confirmation_ttl_secs = 3600

[fatigue]
window_hours = 12
max_contacts = 3
min_gap_minutes = 0
base_cooldown_hours = 4
negative_backoff_factor = 3.0

[timing]
business_hours_start = 8
business_hours_end = 18
default_utc_offset_minutes = 120
horizon_hours = 24

[strategy]
no_reply_threshold = 2
business_bias_hours = 12
biased_stages = ["lead", "qualified"]
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "nurture-bot");
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.orchestrator.mode, OperatingMode::Auto);
    assert_eq!(config.orchestrator.tick_interval_secs, 30);
    assert_eq!(config.orchestrator.worker_concurrency, 2);
    assert_eq!(config.fatigue.max_contacts, 3);
    assert_eq!(config.fatigue.negative_backoff_factor, 3.0);
    assert_eq!(config.timing.default_utc_offset_minutes, 120);
    assert_eq!(
        config.strategy.biased_stages,
        vec![FunnelStage::Lead, FunnelStage::Qualified]
    );
    // Unspecified keys in a present section keep their defaults.
    assert_eq!(config.orchestrator.max_attempts, 3);
    assert_eq!(config.timing.candidate_step_minutes, 60);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML uses defaults");
    assert_eq!(config.orchestrator.mode, OperatingMode::SemiAuto);
    assert_eq!(config.fatigue.window_hours, 24);
    assert_eq!(config.strategy.no_reply_threshold, 3);
}

#[test]
fn unknown_field_in_fatigue_is_rejected_with_suggestion() {
    let errors = load_and_validate_str(
        r#"
[fatigue]
max_contcts = 3
"#,
    )
    .expect_err("unknown key should fail");

    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion, .. }
            if key == "max_contcts" && suggestion.as_deref() == Some("max_contacts")
    )));
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let result = load_config_from_str(
        r#"
[telemetry]
enabled = true
"#,
    );
    assert!(result.is_err());
}

#[test]
fn invalid_mode_produces_diagnostic() {
    let errors = load_and_validate_str(
        r#"
[orchestrator]
mode = "manual"
"#,
    )
    .expect_err("unknown mode should fail");
    assert!(!errors.is_empty());
}

#[test]
fn wrong_type_produces_invalid_type() {
    let errors = load_and_validate_str(
        r#"
[orchestrator]
tick_interval_secs = "soon"
"#,
    )
    .expect_err("string for integer should fail");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidType { .. })));
}

#[test]
fn validation_runs_after_deserialization() {
    let errors = load_and_validate_str(
        r#"
[timing]
business_hours_start = 20
business_hours_end = 8
"#,
    )
    .expect_err("inverted hours should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn env_style_override_wins_over_file() {
    // Simulates CADENCE_ORCHESTRATOR_MODE without mutating the process env.
    let config: CadenceConfig = Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::string("[orchestrator]\nmode = \"semi_auto\"\n"))
        .merge(("orchestrator.mode", "auto"))
        .extract()
        .expect("should merge override");
    assert_eq!(config.orchestrator.mode, OperatingMode::Auto);
}

#[test]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.toml");
    std::fs::write(&path, "[fatigue]\nmax_contacts = 2\n").unwrap();

    let config = load_and_validate_path(&path).expect("file config should load");
    assert_eq!(config.fatigue.max_contacts, 2);
}

#[test]
fn config_error_renders_with_miette() {
    let errors = load_and_validate_str("[agent]\nnaem = \"x\"\n").unwrap_err();
    let handler = miette::GraphicalReportHandler::new();
    let mut out = String::new();
    let diagnostic: &dyn miette::Diagnostic = &errors[0];
    handler.render_report(&mut out, diagnostic).unwrap();
    assert!(out.contains("naem"));
}
