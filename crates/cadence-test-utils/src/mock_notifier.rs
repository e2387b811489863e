// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier capturing every notification.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cadence_core::{AdapterType, NotificationKind, NotificationPriority, Notifier, PluginAdapter};

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub payload: serde_json::Value,
}

/// `notify()` is synchronous, so captures sit behind a std mutex.
pub struct MockNotifier {
    captured: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.captured
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }
}

impl Notifier for MockNotifier {
    fn notify(
        &self,
        kind: NotificationKind,
        priority: NotificationPriority,
        payload: serde_json::Value,
    ) {
        if let Ok(mut captured) = self.captured.lock() {
            captured.push(Notification {
                kind,
                priority,
                payload,
            });
        }
    }
}
