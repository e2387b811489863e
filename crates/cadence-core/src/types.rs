// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by every Cadence component.
//!
//! Lead records are owned by the external lead store; the engine only holds
//! their [`LeadId`]. Follow-up entries, fatigue state, conversation state,
//! and tasks are owned by the engine and persisted through
//! [`NurtureStore`](crate::traits::NurtureStore).

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), uuid::Uuid::new_v4()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identifier of a lead in the external lead store.
    LeadId,
    "lead"
);
id_type!(
    /// Identifier of a scheduled follow-up entry.
    EntryId,
    "entry"
);
id_type!(
    /// Identifier of an outreach task.
    TaskId,
    "task"
);

/// A lead's position in the sales lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Stranger,
    Visitor,
    Lead,
    Qualified,
    Customer,
    Advocate,
    Dormant,
}

impl FunnelStage {
    /// How strongly this stage penalises waiting, in `[0, 1]`.
    ///
    /// Urgent stages tolerate shorter lead times before contact.
    pub fn urgency(self) -> f64 {
        match self {
            FunnelStage::Qualified => 0.9,
            FunnelStage::Customer => 0.7,
            FunnelStage::Lead => 0.6,
            FunnelStage::Visitor => 0.4,
            FunnelStage::Advocate => 0.3,
            FunnelStage::Stranger => 0.2,
            FunnelStage::Dormant => 0.1,
        }
    }
}

/// Lead score vector, each component in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadScores {
    pub trust: f64,
    pub engagement: f64,
    pub intent: f64,
    pub urgency: f64,
    pub overall: f64,
}

impl Default for LeadScores {
    fn default() -> Self {
        Self {
            trust: 50.0,
            engagement: 50.0,
            intent: 50.0,
            urgency: 50.0,
            overall: 50.0,
        }
    }
}

impl LeadScores {
    /// Return a copy with every component clamped into `[0, 100]`.
    pub fn clamped(self) -> Self {
        let c = |v: f64| v.clamp(0.0, 100.0);
        Self {
            trust: c(self.trust),
            engagement: c(self.engagement),
            intent: c(self.intent),
            urgency: c(self.urgency),
            overall: c(self.overall),
        }
    }
}

/// Per-lead nurturing settings held by the lead store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurturingConfig {
    pub enabled: bool,
    /// Lowers the global contact ceiling for this lead. Never raises it.
    #[serde(default)]
    pub max_contacts_per_window: Option<u32>,
    /// Allowed conversation channels. Empty means all are allowed.
    #[serde(default)]
    pub allowed_channels: Vec<ConversationType>,
}

impl Default for NurturingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_contacts_per_window: None,
            allowed_channels: Vec::new(),
        }
    }
}

impl NurturingConfig {
    pub fn allows(&self, conversation_type: ConversationType) -> bool {
        self.allowed_channels.is_empty() || self.allowed_channels.contains(&conversation_type)
    }
}

/// Cumulative outreach statistics kept on the lead record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadStats {
    pub contacts_sent: u32,
    pub replies_received: u32,
    pub failed_contacts: u32,
    pub last_contact_at: Option<DateTime<Utc>>,
}

/// Canonical lead record as returned by the external lead store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    /// Messaging peer identifier used by the presence source and transport.
    pub peer_id: String,
    pub stage: FunnelStage,
    #[serde(default)]
    pub scores: LeadScores,
    pub is_nurturing: bool,
    #[serde(default)]
    pub nurturing: NurturingConfig,
    /// Offset of the lead's local time from UTC, when known.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default)]
    pub last_interaction_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_follow_up_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: LeadStats,
    /// Set when a fatal transport error halted scheduling for the lead.
    #[serde(default)]
    pub flagged_reason: Option<String>,
}

impl Lead {
    /// Whether the engine may act on this lead at all.
    pub fn nurturing_active(&self) -> bool {
        self.is_nurturing && self.nurturing.enabled
    }
}

/// Partial update sent to the lead store. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    pub stage: Option<FunnelStage>,
    pub is_nurturing: Option<bool>,
    pub last_interaction_at: Option<DateTime<Utc>>,
    pub next_follow_up_at: Option<Option<DateTime<Utc>>>,
    pub stats: Option<LeadStats>,
    pub flagged_reason: Option<Option<String>>,
}

impl LeadPatch {
    /// Apply this patch to a lead in place (last write wins).
    pub fn apply(&self, lead: &mut Lead) {
        if let Some(stage) = self.stage {
            lead.stage = stage;
        }
        if let Some(flag) = self.is_nurturing {
            lead.is_nurturing = flag;
        }
        if let Some(at) = self.last_interaction_at {
            lead.last_interaction_at = Some(at);
        }
        if let Some(next) = self.next_follow_up_at {
            lead.next_follow_up_at = next;
        }
        if let Some(stats) = &self.stats {
            lead.stats = stats.clone();
        }
        if let Some(flag) = &self.flagged_reason {
            lead.flagged_reason = flag.clone();
        }
    }
}

/// Filter for listing leads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub stage: Option<FunnelStage>,
    pub nurturing: Option<bool>,
    pub peer_id: Option<String>,
}

impl LeadFilter {
    pub fn by_peer(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: Some(peer_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        self.stage.is_none_or(|s| s == lead.stage)
            && self.nurturing.is_none_or(|n| n == lead.is_nurturing)
            && self.peer_id.as_deref().is_none_or(|p| p == lead.peer_id)
    }
}

/// Observed presence status of a messaging peer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PresenceStatus {
    Online,
    Offline,
    RecentlySeen,
    Unknown,
}

/// A single presence observation from the presence source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceSample {
    pub peer_id: String,
    pub status: PresenceStatus,
    pub observed_at: DateTime<Utc>,
}

/// Conversation channel chosen for a contact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    Business,
    Casual,
}

impl ConversationType {
    pub fn other(self) -> Self {
        match self {
            ConversationType::Business => ConversationType::Casual,
            ConversationType::Casual => ConversationType::Business,
        }
    }
}

/// Lifecycle status of a follow-up entry.
///
/// Transitions are `Pending -> Ready -> {Completed | Skipped | Failed}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Ready,
    Completed,
    Skipped,
    Failed,
}

impl EntryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EntryStatus::Completed | EntryStatus::Skipped | EntryStatus::Failed
        )
    }

    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Pending, EntryStatus::Ready)
                | (EntryStatus::Ready, EntryStatus::Completed)
                | (EntryStatus::Ready, EntryStatus::Skipped)
                | (EntryStatus::Ready, EntryStatus::Failed)
        )
    }
}

/// A durable scheduled follow-up for one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpEntry {
    pub id: EntryId,
    pub lead_id: LeadId,
    pub conversation_type: ConversationType,
    pub scheduled_at: DateTime<Utc>,
    pub status: EntryStatus,
    /// Execution attempts, carried over to retry entries.
    pub attempts: u32,
    /// Times the timing recommender deferred this entry.
    pub reschedule_count: u32,
    /// Why the entry reached its terminal state.
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FollowUpEntry {
    pub fn new(
        lead_id: LeadId,
        conversation_type: ConversationType,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            lead_id,
            conversation_type,
            scheduled_at,
            status: EntryStatus::Pending,
            attempts: 0,
            reschedule_count: 0,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == EntryStatus::Pending && self.scheduled_at <= now
    }
}

/// Rate-limiting state for one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueState {
    pub lead_id: LeadId,
    /// Timestamps of confirmed sends, oldest first. Pruned on every recorded contact.
    pub contact_log: Vec<DateTime<Utc>>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub cooldown_reason: Option<String>,
}

impl FatigueState {
    pub fn new(lead_id: LeadId) -> Self {
        Self {
            lead_id,
            contact_log: Vec::new(),
            last_contact_at: None,
            cooldown_until: None,
            cooldown_reason: None,
        }
    }

    /// Number of contacts inside the rolling window ending at `now`.
    pub fn contacts_in_window(&self, window: Duration, now: DateTime<Utc>) -> u32 {
        let start = now - window;
        self.contact_log
            .iter()
            .filter(|at| **at > start && **at <= now)
            .count() as u32
    }

    /// Earliest contact still inside the rolling window ending at `now`.
    pub fn earliest_in_window(&self, window: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = now - window;
        self.contact_log
            .iter()
            .filter(|at| **at > start && **at <= now)
            .min()
            .copied()
    }
}

/// Coarse label returned by the sentiment signal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

/// Result of analysing one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Signed score in `[-1, 1]`.
    pub score: f64,
}

/// Conversation history summary for one lead, input to the strategy selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub lead_id: LeadId,
    pub current_strategy: Option<ConversationType>,
    pub last_business_attempt_at: Option<DateTime<Utc>>,
    pub last_casual_attempt_at: Option<DateTime<Utc>>,
    pub consecutive_no_reply_count: u32,
    /// Exponential moving average of signed sentiment scores.
    pub sentiment_trend: f64,
    pub unhandled_purchase_signal: bool,
    pub last_reply_at: Option<DateTime<Utc>>,
    /// Set by a fatal send error; scheduling halts until cleared manually.
    pub halted_reason: Option<String>,
}

impl ConversationState {
    pub fn new(lead_id: LeadId) -> Self {
        Self {
            lead_id,
            current_strategy: None,
            last_business_attempt_at: None,
            last_casual_attempt_at: None,
            consecutive_no_reply_count: 0,
            sentiment_trend: 0.0,
            unhandled_purchase_signal: false,
            last_reply_at: None,
            halted_reason: None,
        }
    }

    pub fn last_attempt_at(&self, conversation_type: ConversationType) -> Option<DateTime<Utc>> {
        match conversation_type {
            ConversationType::Business => self.last_business_attempt_at,
            ConversationType::Casual => self.last_casual_attempt_at,
        }
    }

    /// Record an outbound attempt on the given channel.
    pub fn record_attempt(&mut self, conversation_type: ConversationType, at: DateTime<Utc>) {
        match conversation_type {
            ConversationType::Business => self.last_business_attempt_at = Some(at),
            ConversationType::Casual => self.last_casual_attempt_at = Some(at),
        }
        self.current_strategy = Some(conversation_type);
    }
}

/// Lifecycle status of an outreach task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    AwaitingConfirmation,
    Executing,
    Completed,
    Skipped,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Skipped | TaskStatus::Failed
        )
    }

    /// Statuses that count toward the one-open-task-per-lead limit.
    pub const OPEN: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Ready,
        TaskStatus::AwaitingConfirmation,
        TaskStatus::Executing,
    ];
}

/// Generated message content attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub text: String,
}

/// Transport acknowledgement of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
}

/// A unit of outreach work built from a due follow-up entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub lead_id: LeadId,
    pub entry_id: EntryId,
    pub conversation_type: ConversationType,
    pub topic_hint: String,
    pub urgent: bool,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub awaiting_since: Option<DateTime<Utc>>,
    pub content: Option<GeneratedContent>,
    pub message_id: Option<String>,
    pub reason: Option<String>,
}

impl Task {
    pub fn new(
        entry: &FollowUpEntry,
        conversation_type: ConversationType,
        topic_hint: impl Into<String>,
        urgent: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::generate(),
            lead_id: entry.lead_id.clone(),
            entry_id: entry.id.clone(),
            conversation_type,
            topic_hint: topic_hint.into(),
            urgent,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            awaiting_since: None,
            content: None,
            message_id: None,
            reason: None,
        }
    }
}

/// Whether tasks execute immediately or wait for a human.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Auto,
    SemiAuto,
}

/// Kind of notification emitted to the human operator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Confirmation,
    Warning,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    LeadStore,
    Storage,
    ContentGenerator,
    Transport,
    Notifier,
    Sentiment,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn ts(hour: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2026-03-02T{hour:02}:00:00Z"))
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn entry_transitions_follow_lifecycle() {
        use EntryStatus::*;
        assert!(Pending.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Completed));
        assert!(Ready.can_transition_to(Skipped));
        assert!(Ready.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Ready.can_transition_to(Pending));
    }

    #[test]
    fn presence_status_uses_kebab_case() {
        assert_eq!(PresenceStatus::RecentlySeen.to_string(), "recently-seen");
        assert_eq!(
            PresenceStatus::from_str("recently-seen").unwrap(),
            PresenceStatus::RecentlySeen
        );
    }

    #[test]
    fn task_status_round_trips_through_strings() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::AwaitingConfirmation,
            TaskStatus::Executing,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert_eq!(
            TaskStatus::AwaitingConfirmation.to_string(),
            "awaiting_confirmation"
        );
    }

    #[test]
    fn contacts_in_window_excludes_aged_out() {
        let mut state = FatigueState::new(LeadId::from("l1"));
        state.contact_log = vec![ts(1), ts(5), ts(9)];
        let now = ts(10);
        assert_eq!(state.contacts_in_window(Duration::hours(24), now), 3);
        assert_eq!(state.contacts_in_window(Duration::hours(6), now), 2);
        assert_eq!(
            state.earliest_in_window(Duration::hours(6), now),
            Some(ts(5))
        );
    }

    #[test]
    fn nurturing_config_empty_allow_list_allows_everything() {
        let cfg = NurturingConfig::default();
        assert!(cfg.allows(ConversationType::Business));
        assert!(cfg.allows(ConversationType::Casual));

        let restricted = NurturingConfig {
            allowed_channels: vec![ConversationType::Casual],
            ..NurturingConfig::default()
        };
        assert!(!restricted.allows(ConversationType::Business));
    }

    #[test]
    fn lead_patch_leaves_unset_fields() {
        let mut lead = Lead {
            id: LeadId::from("l1"),
            peer_id: "peer-1".into(),
            stage: FunnelStage::Lead,
            scores: LeadScores::default(),
            is_nurturing: true,
            nurturing: NurturingConfig::default(),
            utc_offset_minutes: None,
            last_interaction_at: None,
            next_follow_up_at: Some(ts(3)),
            stats: LeadStats::default(),
            flagged_reason: None,
        };
        LeadPatch {
            stage: Some(FunnelStage::Qualified),
            next_follow_up_at: Some(None),
            ..LeadPatch::default()
        }
        .apply(&mut lead);
        assert_eq!(lead.stage, FunnelStage::Qualified);
        assert!(lead.is_nurturing);
        assert!(lead.next_follow_up_at.is_none());
    }

    #[test]
    fn generated_ids_carry_prefix() {
        assert!(TaskId::generate().as_str().starts_with("task-"));
        assert!(EntryId::generate().as_str().starts_with("entry-"));
    }
}
