//! Named buckets of cached responses stored in the client database.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;

use crate::{Error, client::fetch::FetchResponse};

/// Named buckets of request/response pairs.
///
/// Cloning is cheap and every clone shares the same database connection.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    connection: Arc<Mutex<Connection>>,
}

impl CacheStorage {
    /// Create a cache over an initialized client database.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }

    /// Create the bucket `name` if it does not exist yet.
    pub fn open_bucket(&self, name: &str) -> Result<(), Error> {
        let connection = self.lock()?;
        insert_bucket(&connection, name)?;

        Ok(())
    }

    /// Whether the bucket `name` exists.
    pub fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let connection = self.lock()?;
        let exists = connection
            .query_row("SELECT 1 FROM cache_bucket WHERE name = ?1", [name], |_| Ok(()))
            .optional()?
            .is_some();

        Ok(exists)
    }

    /// The names of every bucket, sorted alphabetically.
    pub fn bucket_names(&self) -> Result<Vec<String>, Error> {
        let connection = self.lock()?;
        let mut statement = connection.prepare("SELECT name FROM cache_bucket ORDER BY name ASC")?;
        let names = statement
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(names)
    }

    /// Delete the bucket `name` and everything in it.
    ///
    /// Returns whether the bucket existed.
    pub fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        transaction.execute("DELETE FROM cache_entry WHERE bucket = ?1", [name])?;
        let deleted = transaction.execute("DELETE FROM cache_bucket WHERE name = ?1", [name])?;

        transaction.commit()?;

        Ok(deleted > 0)
    }

    /// Store `response` under `key` in `bucket`, replacing any earlier copy.
    ///
    /// The bucket is created if needed.
    pub fn put(&self, bucket: &str, key: &str, response: &FetchResponse) -> Result<(), Error> {
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        insert_bucket(&transaction, bucket)?;
        insert_entry(&transaction, bucket, key, response)?;

        transaction.commit()?;

        Ok(())
    }

    /// Store every `(key, response)` pair in `bucket`.
    ///
    /// Either every entry is stored or none are.
    pub fn put_all(&self, bucket: &str, entries: &[(String, FetchResponse)]) -> Result<(), Error> {
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        insert_bucket(&transaction, bucket)?;
        for (key, response) in entries {
            insert_entry(&transaction, bucket, key, response)?;
        }

        transaction.commit()?;

        Ok(())
    }

    /// Find the response stored under `key` in `bucket`.
    pub fn lookup(&self, bucket: &str, key: &str) -> Result<Option<FetchResponse>, Error> {
        let connection = self.lock()?;
        let response = connection
            .query_row(
                "SELECT status, content_type, body FROM cache_entry WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |row| {
                    Ok(FetchResponse {
                        status: row.get(0)?,
                        content_type: row.get(1)?,
                        body: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(response)
    }
}

fn insert_bucket(connection: &Connection, name: &str) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT OR IGNORE INTO cache_bucket (name, created_at) VALUES (?1, ?2)",
        params![name, OffsetDateTime::now_utc()],
    )?;

    Ok(())
}

fn insert_entry(
    connection: &Connection,
    bucket: &str,
    key: &str,
    response: &FetchResponse,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT OR REPLACE INTO cache_entry (bucket, key, status, content_type, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            bucket,
            key,
            response.status,
            response.content_type,
            response.body,
            OffsetDateTime::now_utc()
        ],
    )?;

    Ok(())
}
