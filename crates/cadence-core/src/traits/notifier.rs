// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator notification trait.

use crate::traits::adapter::PluginAdapter;
use crate::types::{NotificationKind, NotificationPriority};

/// Fire-and-forget notifications to the human operator.
///
/// Implementations must not block. Delivery failures are the notifier's
/// problem and never fail the calling operation.
pub trait Notifier: PluginAdapter {
    fn notify(
        &self,
        kind: NotificationKind,
        priority: NotificationPriority,
        payload: serde_json::Value,
    );
}
