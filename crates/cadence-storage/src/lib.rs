// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the Cadence nurturing engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`, plus an in-memory
//! store with the same atomicity guarantees.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;
mod sql;

use std::sync::Arc;

use cadence_config::model::{StorageBackend, StorageConfig};
use cadence_core::{CadenceError, NurtureStore};

pub use adapter::SqliteStore;
pub use database::Database;
pub use memory::MemoryStore;

/// Build the store selected by `[storage] backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn NurtureStore>, CadenceError> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(config).await?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
