//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::Error;

// ============================================================================
// MODELS
// ============================================================================

/// An amount of money that was added to or taken from the budget.
///
/// Transactions have no identity of their own. Two transactions with the same
/// name, value and date are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// A short description of what the transaction was for.
    pub name: String,
    /// The amount of money in whole dollars.
    ///
    /// Positive values add to the total, negative values are withdrawals.
    pub value: i64,
    /// When the transaction was made.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    pub fn new(name: &str, value: i64, date: OffsetDateTime) -> Self {
        Self {
            name: name.to_owned(),
            value,
            date,
        }
    }
}

/// Whether a submitted amount should be added to or subtracted from the total.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionAction {
    /// Add the amount, e.g. a pay check.
    #[default]
    Add,
    /// Take the amount away, e.g. a grocery bill.
    Subtract,
}

impl TransactionAction {
    /// Give `amount` the sign for this action.
    pub fn apply(self, amount: i64) -> i64 {
        match self {
            TransactionAction::Add => amount,
            TransactionAction::Subtract => -amount,
        }
    }
}

/// Parse the whole number at the start of `text`.
///
/// Leading whitespace and a single sign are allowed, and anything after the
/// leading digits is ignored, so "12.75" parses as 12. Returns `None` if
/// `text` does not start with a number or the number does not fit in an `i64`.
pub fn parse_amount(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (is_negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    if digits_end == 0 {
        return None;
    }

    let magnitude: i64 = unsigned[..digits_end].parse().ok()?;

    Some(if is_negative { -magnitude } else { magnitude })
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                value INTEGER NOT NULL,
                date TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
        (),
    )?;

    Ok(())
}

/// Save a transaction to the database and return the stored record.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let stored = connection
        .prepare(
            "INSERT INTO \"transaction\" (name, value, date)
             VALUES (?1, ?2, ?3)
             RETURNING name, value, date",
        )?
        .query_row(
            (
                &transaction.name,
                transaction.value,
                transaction.date.to_offset(UtcOffset::UTC),
            ),
            map_transaction_row,
        )?;

    Ok(stored)
}

/// Save all of `transactions` to the database, or none of them.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error, in
/// which case no transactions are saved.
pub fn create_transactions(
    transactions: &[Transaction],
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let stored = transactions
        .iter()
        .map(|transaction| create_transaction(transaction, &sql_transaction))
        .collect::<Result<Vec<_>, _>>()?;

    sql_transaction.commit()?;

    Ok(stored)
}

/// Get all transactions, most recent first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare("SELECT name, value, date FROM \"transaction\" ORDER BY date DESC, id DESC")?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let name = row.get(0)?;
    let value = row.get(1)?;
    let date = row.get(2)?;

    Ok(Transaction { name, value, date })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod action_tests {
    use super::TransactionAction;

    #[test]
    fn subtract_negates_amount() {
        assert_eq!(TransactionAction::Subtract.apply(50), -50);
        assert_eq!(TransactionAction::Add.apply(50), 50);
    }

    #[test]
    fn deserializes_from_lowercase() {
        let action: TransactionAction = serde_json::from_str("\"subtract\"").unwrap();

        assert_eq!(action, TransactionAction::Subtract);
    }
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        db::initialize,
        transaction::{
            Transaction, count_transactions, create_transaction, create_transactions,
            get_transactions,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let transaction = Transaction::new("Pay day", 1200, datetime!(2025-10-05 09:30 UTC));

        let result = create_transaction(&transaction, &conn);

        assert_eq!(result, Ok(transaction));
    }

    #[test]
    fn create_stores_dates_in_utc() {
        let conn = get_test_connection();
        let transaction = Transaction::new("Coffee", -5, datetime!(2025-10-05 09:30 +13:00));

        let stored = create_transaction(&transaction, &conn).unwrap();

        assert_eq!(stored.date, transaction.date);
        assert_eq!(stored.date.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn get_transactions_returns_most_recent_first() {
        let conn = get_test_connection();
        let oldest = Transaction::new("Rent", -400, datetime!(2025-10-01 08:00 UTC));
        let newest = Transaction::new("Salary", 2000, datetime!(2025-10-15 08:00 UTC));
        let middle = Transaction::new("Groceries", -80, datetime!(2025-10-08 08:00 UTC));
        for transaction in [&oldest, &newest, &middle] {
            create_transaction(transaction, &conn).unwrap();
        }

        let got = get_transactions(&conn).unwrap();

        assert_eq!(got, vec![newest, middle, oldest]);
    }

    #[test]
    fn transactions_with_the_same_date_are_ordered_by_insertion() {
        let conn = get_test_connection();
        let date = datetime!(2025-10-01 08:00 UTC);
        let first = Transaction::new("First", 1, date);
        let second = Transaction::new("Second", 2, date);
        create_transaction(&first, &conn).unwrap();
        create_transaction(&second, &conn).unwrap();

        let got = get_transactions(&conn).unwrap();

        assert_eq!(got, vec![second, first]);
    }

    #[test]
    fn create_many_saves_every_transaction() {
        let conn = get_test_connection();
        let transactions = vec![
            Transaction::new("Lunch", -15, datetime!(2025-10-02 12:00 UTC)),
            Transaction::new("Refund", 15, datetime!(2025-10-03 12:00 UTC)),
        ];

        let stored = create_transactions(&transactions, &conn).unwrap();

        assert_eq!(stored, transactions);
        assert_eq!(count_transactions(&conn), Ok(2));
    }

    #[test]
    fn get_count() {
        let conn = get_test_connection();
        let want_count = 20;
        for i in 1..=want_count {
            create_transaction(
                &Transaction::new("test", i, datetime!(2025-10-05 00:00 UTC)),
                &conn,
            )
            .expect("Could not create transaction");
        }

        let got_count = count_transactions(&conn).expect("Could not get count");

        assert_eq!(want_count as u32, got_count);
    }
}
