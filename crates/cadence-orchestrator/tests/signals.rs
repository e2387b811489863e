// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound replies, presence changes, send-time deferral, and the event loop.

mod common;

use std::time::Duration as StdDuration;

use cadence_core::{
    ConversationType, EntryStatus, FunnelStage, NurtureStore, OperatingMode, PresenceSample,
    PresenceStatus,
};
use cadence_orchestrator::{event_channel, OrchestratorEvent};
use cadence_test_utils::lead;
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{assert_close, config, id, t0, Harness};
use tokio_util::sync::CancellationToken;

fn sample(peer: &str, status: PresenceStatus, at: DateTime<Utc>) -> PresenceSample {
    PresenceSample {
        peer_id: peer.to_string(),
        status,
        observed_at: at,
    }
}

// ---- Test 1: Purchase signal ----

#[tokio::test(start_paused = true)]
async fn test_purchase_signal_promotes_urgent_business_follow_up() {
    let h = Harness::new(OperatingMode::Auto, vec![lead("lead-1", FunnelStage::Lead)]);
    h.orchestrator.start_nurturing(&id("lead-1"), t0()).await.unwrap();
    h.orchestrator.tick(t0()).await.unwrap();
    h.orchestrator.drain().await;

    let replied_at = t0() + Duration::hours(2);
    let outcome = h
        .orchestrator
        .handle_inbound(&id("lead-1"), "What's the price for the annual plan?", replied_at)
        .await
        .unwrap();
    assert!(outcome.purchase_signal);
    assert_eq!(outcome.promoted, 1);

    let next = h.orchestrator.next_follow_up(&id("lead-1")).await.unwrap().unwrap();
    assert_close(Some(next.scheduled_at), replied_at);

    let report = h.orchestrator.tick(replied_at).await.unwrap();
    h.orchestrator.drain().await;
    assert_eq!(report.dispatched, 1);

    let calls = h.generator.calls().await;
    let (_, conversation_type, topic) = calls.last().unwrap().clone();
    assert_eq!(conversation_type, ConversationType::Business);
    assert_eq!(topic, "purchase-follow-up");

    let conversation = h.orchestrator.conversation_state(&id("lead-1")).await.unwrap();
    assert!(!conversation.unhandled_purchase_signal);

    // Urgent contacts re-arm on the short cadence.
    let next = h.orchestrator.next_follow_up(&id("lead-1")).await.unwrap().unwrap();
    assert_close(Some(next.scheduled_at), replied_at + Duration::hours(4));
}

#[tokio::test(start_paused = true)]
async fn test_purchase_signal_without_schedule_arms_business_now() {
    let h = Harness::new(OperatingMode::Auto, vec![lead("lead-1", FunnelStage::Visitor)]);

    let outcome = h
        .orchestrator
        .handle_inbound(&id("lead-1"), "Can I book a demo?", t0())
        .await
        .unwrap();
    assert!(outcome.purchase_signal);
    assert_eq!(outcome.promoted, 1);

    let next = h.orchestrator.next_follow_up(&id("lead-1")).await.unwrap().unwrap();
    assert_eq!(next.conversation_type, ConversationType::Business);
    assert_eq!(next.scheduled_at, t0());
}

#[tokio::test(start_paused = true)]
async fn test_plain_reply_resets_no_reply_streak_without_promotion() {
    let h = Harness::new(OperatingMode::Auto, vec![lead("lead-1", FunnelStage::Lead)]);
    h.orchestrator.start_nurturing(&id("lead-1"), t0()).await.unwrap();
    h.orchestrator.tick(t0()).await.unwrap();
    h.orchestrator.drain().await;

    let outcome = h
        .orchestrator
        .handle_inbound(&id("lead-1"), "thanks, talk soon", t0() + Duration::hours(1))
        .await
        .unwrap();
    assert!(!outcome.purchase_signal);
    assert_eq!(outcome.promoted, 0);

    let conversation = h.orchestrator.conversation_state(&id("lead-1")).await.unwrap();
    assert_eq!(conversation.consecutive_no_reply_count, 0);
    assert_close(conversation.last_reply_at, t0() + Duration::hours(1));

    let next = h.orchestrator.next_follow_up(&id("lead-1")).await.unwrap().unwrap();
    assert_close(Some(next.scheduled_at), t0() + Duration::hours(48));
}

// ---- Test 2: Presence ----

#[tokio::test(start_paused = true)]
async fn test_coming_online_pulls_follow_up_forward() {
    let h = Harness::new(OperatingMode::Auto, vec![lead("lead-1", FunnelStage::Lead)]);
    h.orchestrator.start_nurturing(&id("lead-1"), t0()).await.unwrap();
    h.orchestrator.tick(t0()).await.unwrap();
    h.orchestrator.drain().await;

    // Next follow-up is at T+48h; the peer shows up 30 minutes early.
    let online_at = t0() + Duration::hours(47) + Duration::minutes(30);
    let processed = h
        .orchestrator
        .handle_event(
            OrchestratorEvent::Presence(sample("peer-lead-1", PresenceStatus::Online, online_at)),
            online_at,
        )
        .await;
    assert!(processed.is_ok());
    h.orchestrator.drain().await;

    assert_eq!(h.transport.sent_count().await, 2);
    let fatigue = h.orchestrator.fatigue_state(&id("lead-1")).await.unwrap();
    assert_eq!(fatigue.last_contact_at, Some(online_at));
}

#[tokio::test(start_paused = true)]
async fn test_coming_online_ignores_follow_ups_outside_window() {
    let h = Harness::new(OperatingMode::Auto, vec![lead("lead-1", FunnelStage::Lead)]);
    h.orchestrator.start_nurturing(&id("lead-1"), t0()).await.unwrap();
    h.orchestrator.tick(t0()).await.unwrap();
    h.orchestrator.drain().await;

    let online_at = t0() + Duration::hours(12);
    let processed = h
        .orchestrator
        .handle_presence(sample("peer-lead-1", PresenceStatus::Online, online_at), online_at)
        .await
        .unwrap();
    assert_eq!(processed, 0);

    let next = h.orchestrator.next_follow_up(&id("lead-1")).await.unwrap().unwrap();
    assert_close(Some(next.scheduled_at), t0() + Duration::hours(48));
}

#[tokio::test(start_paused = true)]
async fn test_follow_up_is_deferred_to_habitual_active_hour() {
    let h = Harness::new(OperatingMode::Auto, vec![lead("lead-1", FunnelStage::Lead)]);

    // Online around 18:00 on each of the three previous evenings.
    for day in [27, 28] {
        let evening = Utc.with_ymd_and_hms(2026, 2, day, 18, 0, 0).unwrap();
        feed_evening(&h, evening).await;
    }
    feed_evening(&h, Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()).await;

    let entry = h.orchestrator.start_nurturing(&id("lead-1"), t0()).await.unwrap();
    let report = h.orchestrator.tick(t0()).await.unwrap();
    assert_eq!(report.rescheduled, 1);
    assert_eq!(report.dispatched, 0);

    let replaced = h.store.get_entry(&entry.id).await.unwrap().unwrap();
    assert_eq!(replaced.status, EntryStatus::Skipped);
    let next = h.orchestrator.next_follow_up(&id("lead-1")).await.unwrap().unwrap();
    assert_eq!(next.scheduled_at, t0() + Duration::hours(8));
    assert_eq!(next.reschedule_count, 1);

    // At the habitual hour, sending now is as good as it gets.
    let evening = t0() + Duration::hours(8);
    let report = h.orchestrator.tick(evening).await.unwrap();
    h.orchestrator.drain().await;
    assert_eq!(report.dispatched, 1);
    assert_eq!(h.transport.sent_count().await, 1);
}

async fn feed_evening(h: &Harness, online: DateTime<Utc>) {
    let offline = online + Duration::minutes(30);
    for s in [
        sample("peer-lead-1", PresenceStatus::Online, online),
        sample("peer-lead-1", PresenceStatus::Offline, offline),
    ] {
        h.orchestrator.handle_presence(s, t0()).await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_urgent_follow_up_is_never_deferred() {
    let h = Harness::new(OperatingMode::Auto, vec![lead("lead-1", FunnelStage::Lead)]);
    feed_evening(&h, Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()).await;

    h.orchestrator
        .handle_inbound(&id("lead-1"), "how much does it cost?", t0())
        .await
        .unwrap();
    let report = h.orchestrator.tick(t0()).await.unwrap();
    h.orchestrator.drain().await;

    assert_eq!(report.rescheduled, 0);
    assert_eq!(report.dispatched, 1);
}

// ---- Test 3: Event loop ----

#[tokio::test(start_paused = true)]
async fn test_unknown_task_confirmation_is_rejected() {
    let h = Harness::new(OperatingMode::SemiAuto, vec![]);
    let result = h
        .orchestrator
        .handle_event(OrchestratorEvent::Confirm("task-missing".into()), t0())
        .await;
    assert!(matches!(
        result,
        Err(cadence_core::CadenceError::NotFound { kind: "task", .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_run_applies_events_until_cancelled() {
    let mut cfg = config(OperatingMode::SemiAuto);
    cfg.orchestrator.event_buffer = 4;
    let h = Harness::with_config(cfg.clone(), vec![]);
    let (tx, rx) = event_channel(&cfg.orchestrator);
    let cancel = CancellationToken::new();

    let orchestrator = h.orchestrator.clone();
    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move { orchestrator.run(rx, run_cancel).await });

    tx.send(OrchestratorEvent::SetMode(OperatingMode::Auto))
        .await
        .unwrap();
    for _ in 0..100 {
        if h.orchestrator.mode() == OperatingMode::Auto {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    assert_eq!(h.orchestrator.mode(), OperatingMode::Auto);

    cancel.cancel();
    let result = handle.await.unwrap();
    assert!(result.is_ok());
}
