// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!` and applied whenever a [`Database`](crate::Database)
//! is opened.

use cadence_core::CadenceError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), CadenceError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| CadenceError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
