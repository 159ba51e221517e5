//! A durable queue of transactions that have not reached the server yet.
//!
//! Records are never removed when they are read. A replay first claims the
//! pending records, marking them in flight, and then either acknowledges them
//! (deleting them) once the server confirms it stored them, or releases them
//! back to pending if delivery failed. A crash between the two leaves records
//! in flight, and they are recovered when the queue is next opened.

use std::{
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Transaction};

/// The row ID of a queued write.
pub type PendingWriteId = i64;

/// Where a queued write is in the delivery protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingWriteState {
    /// Waiting to be sent.
    Pending,
    /// Claimed by a replay that has not finished yet.
    InFlight,
}

impl PendingWriteState {
    fn as_str(self) -> &'static str {
        match self {
            PendingWriteState::Pending => "pending",
            PendingWriteState::InFlight => "in_flight",
        }
    }
}

impl Display for PendingWriteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for PendingWriteState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PendingWriteState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(PendingWriteState::Pending),
            "in_flight" => Ok(PendingWriteState::InFlight),
            other => Err(FromSqlError::Other(
                format!("unknown pending write state {other:?}").into(),
            )),
        }
    }
}

/// A transaction waiting in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    /// The queue's ID for this record.
    pub id: PendingWriteId,
    /// The transaction to send.
    pub transaction: Transaction,
    /// Where the record is in the delivery protocol.
    pub state: PendingWriteState,
    /// How many replays have failed to deliver this record.
    pub attempts: u32,
    /// When the record was added to the queue.
    pub enqueued_at: OffsetDateTime,
}

/// The JSON stored in the `payload` column.
#[derive(Serialize, Deserialize)]
struct Payload {
    transaction: Transaction,
}

/// The durable write queue.
#[derive(Debug, Clone)]
pub struct PendingQueue {
    connection: Arc<Mutex<Connection>>,
}

impl PendingQueue {
    /// Open the queue over an initialized client database.
    ///
    /// Any records left in flight by an interrupted replay are returned to
    /// pending.
    ///
    /// # Errors
    /// Returns an error if the in flight records cannot be recovered.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Result<Self, Error> {
        let queue = Self { connection };
        let recovered = queue.recover_in_flight()?;

        if recovered > 0 {
            tracing::warn!("Recovered {recovered} queued writes from an interrupted replay");
        }

        Ok(queue)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }

    /// Add `transaction` to the end of the queue.
    pub fn enqueue(&self, transaction: &Transaction) -> Result<PendingWriteId, Error> {
        let payload = serde_json::to_string(&Payload {
            transaction: transaction.clone(),
        })?;

        let connection = self.lock()?;
        let id = connection.query_row(
            "INSERT INTO pending_write (payload, state, attempts, enqueued_at)
             VALUES (?1, ?2, 0, ?3)
             RETURNING id",
            (payload, PendingWriteState::Pending, OffsetDateTime::now_utc()),
            |row| row.get(0),
        )?;

        tracing::info!("Queued transaction \"{}\" as write {id}", transaction.name);

        Ok(id)
    }

    /// Every record in the queue, oldest first.
    pub fn pending(&self) -> Result<Vec<PendingWrite>, Error> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT id, payload, state, attempts, enqueued_at FROM pending_write ORDER BY id ASC",
        )?;

        let records = statement
            .query_map([], map_pending_write_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Mark every pending record as in flight and return them, oldest first.
    ///
    /// Records that are already in flight are not returned again.
    pub fn claim(&self) -> Result<Vec<PendingWrite>, Error> {
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        let mut records = {
            let mut statement = transaction.prepare(
                "UPDATE pending_write SET state = ?1 WHERE state = ?2
                 RETURNING id, payload, state, attempts, enqueued_at",
            )?;

            statement
                .query_map(
                    (PendingWriteState::InFlight, PendingWriteState::Pending),
                    map_pending_write_row,
                )?
                .collect::<Result<Vec<_>, _>>()?
        };

        transaction.commit()?;

        records.sort_by_key(|record| record.id);

        Ok(records)
    }

    /// Delete the records in `ids`. Call this once the server has confirmed
    /// it stored them.
    ///
    /// Returns the number of records deleted.
    pub fn acknowledge(&self, ids: &[PendingWriteId]) -> Result<usize, Error> {
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        let mut deleted = 0;
        {
            let mut statement = transaction.prepare("DELETE FROM pending_write WHERE id = ?1")?;
            for id in ids {
                deleted += statement.execute([id])?;
            }
        }

        transaction.commit()?;

        Ok(deleted)
    }

    /// Return the records in `ids` to pending and count a failed attempt for
    /// each.
    ///
    /// Returns the number of records released.
    pub fn release(&self, ids: &[PendingWriteId]) -> Result<usize, Error> {
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        let mut released = 0;
        {
            let mut statement = transaction.prepare(
                "UPDATE pending_write SET state = ?1, attempts = attempts + 1 WHERE id = ?2",
            )?;
            for id in ids {
                released += statement.execute((PendingWriteState::Pending, id))?;
            }
        }

        transaction.commit()?;

        Ok(released)
    }

    /// Return every in flight record to pending.
    ///
    /// Returns the number of records recovered.
    pub fn recover_in_flight(&self) -> Result<usize, Error> {
        let connection = self.lock()?;
        let recovered = connection.execute(
            "UPDATE pending_write SET state = ?1 WHERE state = ?2",
            (PendingWriteState::Pending, PendingWriteState::InFlight),
        )?;

        Ok(recovered)
    }

    /// The number of records in the queue, pending or in flight.
    pub fn len(&self) -> Result<usize, Error> {
        let connection = self.lock()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM pending_write", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    /// Whether the queue has no records.
    pub fn is_empty(&self) -> Result<bool, Error> {
        self.len().map(|len| len == 0)
    }
}

fn map_pending_write_row(row: &Row) -> Result<PendingWrite, rusqlite::Error> {
    let payload: String = row.get(1)?;
    let payload: Payload = serde_json::from_str(&payload).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error))
    })?;

    Ok(PendingWrite {
        id: row.get(0)?,
        transaction: payload.transaction,
        state: row.get(2)?,
        attempts: row.get(3)?,
        enqueued_at: row.get(4)?,
    })
}
