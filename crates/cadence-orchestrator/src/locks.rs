// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-lead mutual exclusion.

use std::sync::Arc;

use cadence_core::LeadId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per lead, created on first use and dropped by
/// [`LeadLocks::prune`] once nobody holds or waits on it.
///
/// Not reentrant: a holder must not lock the same lead again.
#[derive(Default)]
pub(crate) struct LeadLocks {
    locks: DashMap<LeadId, Arc<Mutex<()>>>,
}

impl LeadLocks {
    pub(crate) async fn lock(&self, lead_id: &LeadId) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(lead_id.clone()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drop mutexes that are neither held nor awaited. Returns how many
    /// remain.
    ///
    /// A caller clones the `Arc` under the map's shard lock before awaiting
    /// it, so a strong count of one means the map holds the only reference.
    pub(crate) fn prune(&self) -> usize {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        self.locks.len()
    }
}
