//! The client's local SQLite database: the pending write queue and the cache
//! buckets.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::Error;

/// The schema version written to `PRAGMA user_version`.
///
/// Bump this and add a migration step to [initialize] whenever the client
/// tables change.
pub const CLIENT_SCHEMA_VERSION: i64 = 1;

/// Create or upgrade the client tables.
///
/// Migrations only run when the stored schema version is behind
/// [CLIENT_SCHEMA_VERSION], so opening an up to date database is cheap.
///
/// # Errors
/// Returns an error if the database cannot be read or a migration fails.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let version: i64 = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version >= CLIENT_SCHEMA_VERSION {
        tracing::debug!("Client database is at schema version {version}");
        return Ok(());
    }

    tracing::info!(
        "Upgrading client database from schema version {version} to {CLIENT_SCHEMA_VERSION}"
    );

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    if version < 1 {
        create_pending_write_table(&transaction)?;
        create_cache_tables(&transaction)?;
    }

    transaction.pragma_update(None, "user_version", CLIENT_SCHEMA_VERSION)?;
    transaction.commit()?;

    Ok(())
}

fn create_pending_write_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS pending_write (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                enqueued_at TEXT NOT NULL
            )",
        (),
    )?;

    Ok(())
}

fn create_cache_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS cache_bucket (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS cache_entry (
                bucket TEXT NOT NULL,
                key TEXT NOT NULL,
                status INTEGER NOT NULL,
                content_type TEXT,
                body BLOB NOT NULL,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (bucket, key)
            )",
        (),
    )?;

    Ok(())
}
