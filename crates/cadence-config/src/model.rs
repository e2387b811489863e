// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cadence nurturing engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use cadence_core::{FunnelStage, OperatingMode};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Top-level Cadence configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Persistence backend for engine state.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tick loop, worker pool, and confirmation settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Contact rate limiting.
    #[serde(default)]
    pub fatigue: FatigueConfig,

    /// Presence history and send-time recommendation.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Conversation strategy rules.
    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Name used in logs and notifications.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "cadence".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which [`NurtureStore`](cadence_core::NurtureStore) implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cadence").join("cadence.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cadence.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// `auto` executes tasks immediately; `semi_auto` waits for confirmation.
    #[serde(default = "default_mode")]
    pub mode: OperatingMode,

    /// Seconds between scheduler ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Maximum due entries claimed per tick. Excess entries wait for the next tick.
    #[serde(default = "default_max_entries_per_tick")]
    pub max_entries_per_tick: usize,

    /// Number of tasks generating or sending concurrently.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Backoff before the single in-tick retry of a transient generation failure.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// How long a task may wait for human confirmation in semi-auto mode.
    #[serde(default = "default_confirmation_ttl_secs")]
    pub confirmation_ttl_secs: u64,

    /// Total execution attempts for one follow-up before it stays failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before a retry entry created after a transient failure.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// How many times timing may defer a single entry.
    #[serde(default = "default_max_reschedules")]
    pub max_reschedules: u32,

    /// Confidence gain a later slot needs over "now" to justify deferring.
    #[serde(default = "default_min_confidence_gain")]
    pub min_confidence_gain: f64,

    /// A lead coming online pulls forward entries due within this window.
    #[serde(default = "default_presence_promotion_window_secs")]
    pub presence_promotion_window_secs: u64,

    /// Capacity of the inbound event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            tick_interval_secs: default_tick_interval_secs(),
            max_entries_per_tick: default_max_entries_per_tick(),
            worker_concurrency: default_worker_concurrency(),
            generation_timeout_secs: default_generation_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            confirmation_ttl_secs: default_confirmation_ttl_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            max_reschedules: default_max_reschedules(),
            min_confidence_gain: default_min_confidence_gain(),
            presence_promotion_window_secs: default_presence_promotion_window_secs(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl OrchestratorConfig {
    pub fn confirmation_ttl(&self) -> Duration {
        Duration::seconds(self.confirmation_ttl_secs as i64)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::seconds(self.retry_delay_secs as i64)
    }

    pub fn presence_promotion_window(&self) -> Duration {
        Duration::seconds(self.presence_promotion_window_secs as i64)
    }
}

fn default_mode() -> OperatingMode {
    OperatingMode::SemiAuto
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_max_entries_per_tick() -> usize {
    50
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_generation_timeout_secs() -> u64 {
    30
}

fn default_send_timeout_secs() -> u64 {
    15
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_confirmation_ttl_secs() -> u64 {
    2 * 60 * 60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    15 * 60
}

fn default_max_reschedules() -> u32 {
    3
}

fn default_min_confidence_gain() -> f64 {
    0.2
}

fn default_presence_promotion_window_secs() -> u64 {
    6 * 60 * 60
}

fn default_event_buffer() -> usize {
    256
}

/// Fatigue controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FatigueConfig {
    /// Length of the rolling contact window.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    /// Global contact ceiling per window. Per-lead settings may only lower it.
    #[serde(default = "default_max_contacts")]
    pub max_contacts: u32,

    /// Minimum spacing between two contacts to the same lead. Zero disables.
    #[serde(default = "default_min_gap_minutes")]
    pub min_gap_minutes: u32,

    /// Minimum cooldown applied on negative sentiment.
    #[serde(default = "default_base_cooldown_hours")]
    pub base_cooldown_hours: u32,

    /// Multiplier applied to the cooldown on negative sentiment.
    #[serde(default = "default_negative_backoff_factor")]
    pub negative_backoff_factor: f64,

    /// Upper bound on any cooldown, however many negative replies stack up.
    #[serde(default = "default_max_cooldown_hours")]
    pub max_cooldown_hours: u32,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            max_contacts: default_max_contacts(),
            min_gap_minutes: default_min_gap_minutes(),
            base_cooldown_hours: default_base_cooldown_hours(),
            negative_backoff_factor: default_negative_backoff_factor(),
            max_cooldown_hours: default_max_cooldown_hours(),
        }
    }
}

impl FatigueConfig {
    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours as i64)
    }

    pub fn min_gap(&self) -> Duration {
        Duration::minutes(self.min_gap_minutes as i64)
    }

    pub fn base_cooldown(&self) -> Duration {
        Duration::hours(self.base_cooldown_hours as i64)
    }

    pub fn max_cooldown(&self) -> Duration {
        Duration::hours(self.max_cooldown_hours as i64)
    }
}

fn default_window_hours() -> u32 {
    24
}

fn default_max_contacts() -> u32 {
    5
}

fn default_min_gap_minutes() -> u32 {
    60
}

fn default_base_cooldown_hours() -> u32 {
    6
}

fn default_negative_backoff_factor() -> f64 {
    2.0
}

fn default_max_cooldown_hours() -> u32 {
    7 * 24
}

/// Presence monitor and timing recommender configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// First local hour (inclusive) considered business hours.
    #[serde(default = "default_business_hours_start")]
    pub business_hours_start: u32,

    /// Last local hour (exclusive) considered business hours.
    #[serde(default = "default_business_hours_end")]
    pub business_hours_end: u32,

    /// Timezone assumed for leads without one.
    #[serde(default)]
    pub default_utc_offset_minutes: i32,

    /// How far ahead candidate send times are generated.
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: u32,

    #[serde(default = "default_candidate_step_minutes")]
    pub candidate_step_minutes: u32,

    /// Presence samples retained per peer.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Half-life of an observation's weight in the activity pattern.
    #[serde(default = "default_decay_half_life_days")]
    pub decay_half_life_days: f64,

    /// A peer seen within this many minutes counts as recently active.
    #[serde(default = "default_presence_recency_minutes")]
    pub presence_recency_minutes: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            business_hours_start: default_business_hours_start(),
            business_hours_end: default_business_hours_end(),
            default_utc_offset_minutes: 0,
            horizon_hours: default_horizon_hours(),
            candidate_step_minutes: default_candidate_step_minutes(),
            history_capacity: default_history_capacity(),
            decay_half_life_days: default_decay_half_life_days(),
            presence_recency_minutes: default_presence_recency_minutes(),
        }
    }
}

fn default_business_hours_start() -> u32 {
    9
}

fn default_business_hours_end() -> u32 {
    21
}

fn default_horizon_hours() -> u32 {
    48
}

fn default_candidate_step_minutes() -> u32 {
    60
}

fn default_history_capacity() -> usize {
    500
}

fn default_decay_half_life_days() -> f64 {
    7.0
}

fn default_presence_recency_minutes() -> u32 {
    30
}

/// Conversation strategy selector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Consecutive unanswered contacts after which casual is preferred.
    #[serde(default = "default_no_reply_threshold")]
    pub no_reply_threshold: u32,

    /// Extra age credited to the business channel for biased stages.
    #[serde(default = "default_business_bias_hours")]
    pub business_bias_hours: u32,

    /// Stages that lean toward business conversations.
    #[serde(default = "default_biased_stages")]
    pub biased_stages: Vec<FunnelStage>,

    /// Delay before the next follow-up after a business contact.
    #[serde(default = "default_business_cadence_hours")]
    pub business_cadence_hours: u32,

    /// Delay before the next follow-up after a casual contact.
    #[serde(default = "default_casual_cadence_hours")]
    pub casual_cadence_hours: u32,

    /// Delay before the next follow-up after an urgent contact.
    #[serde(default = "default_urgent_cadence_hours")]
    pub urgent_cadence_hours: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            no_reply_threshold: default_no_reply_threshold(),
            business_bias_hours: default_business_bias_hours(),
            biased_stages: default_biased_stages(),
            business_cadence_hours: default_business_cadence_hours(),
            casual_cadence_hours: default_casual_cadence_hours(),
            urgent_cadence_hours: default_urgent_cadence_hours(),
        }
    }
}

fn default_no_reply_threshold() -> u32 {
    3
}

fn default_business_bias_hours() -> u32 {
    24
}

fn default_biased_stages() -> Vec<FunnelStage> {
    vec![FunnelStage::Qualified, FunnelStage::Customer]
}

fn default_business_cadence_hours() -> u32 {
    72
}

fn default_casual_cadence_hours() -> u32 {
    48
}

fn default_urgent_cadence_hours() -> u32 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CadenceConfig::default();
        assert_eq!(config.agent.name, "cadence");
        assert_eq!(config.orchestrator.mode, OperatingMode::SemiAuto);
        assert_eq!(config.orchestrator.confirmation_ttl(), Duration::hours(2));
        assert_eq!(config.fatigue.window(), Duration::hours(24));
        assert_eq!(config.fatigue.max_contacts, 5);
        assert_eq!(config.fatigue.max_cooldown(), Duration::days(7));
        assert_eq!(config.timing.business_hours_start, 9);
        assert_eq!(config.timing.business_hours_end, 21);
        assert_eq!(
            config.strategy.biased_stages,
            vec![FunnelStage::Qualified, FunnelStage::Customer]
        );
    }

    #[test]
    fn database_path_ends_with_cadence_db() {
        let config = StorageConfig::default();
        assert!(config.database_path.ends_with("cadence.db"));
        assert_eq!(config.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn mode_parses_from_snake_case() {
        let config: CadenceConfig = toml::from_str(
            r#"
[orchestrator]
mode = "auto"
"#,
        )
        .unwrap();
        assert_eq!(config.orchestrator.mode, OperatingMode::Auto);
    }

    #[test]
    fn unknown_stage_in_biased_stages_is_rejected() {
        let result = toml::from_str::<CadenceConfig>(
            r#"
[strategy]
biased_stages = ["whale"]
"#,
        );
        assert!(result.is_err());
    }
}
