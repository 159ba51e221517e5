//! The JSON endpoints for listing and saving transactions.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    transaction::{
        Transaction,
        core::{create_transaction, create_transactions, get_transactions},
        parse_amount,
    },
};

/// The state needed to list or save transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A transaction as sent by a client, before validation.
///
/// The page sends `value` as a string when adding funds and as a number when
/// subtracting, so both are accepted.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TransactionBody {
    /// What the transaction was for.
    #[serde(default)]
    pub name: Option<String>,
    /// The signed amount, either a JSON number or a numeric string.
    #[serde(default)]
    pub value: Option<Value>,
    /// When the transaction was made, defaults to the time it was received.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}

/// Validation messages keyed by field name.
type FieldErrors = BTreeMap<String, String>;

impl TransactionBody {
    /// Check the required fields and build a [Transaction].
    ///
    /// Field names in the returned errors are prefixed with `prefix`, which
    /// lets bulk requests report which element was invalid.
    fn validate(self, prefix: &str, now: OffsetDateTime) -> Result<Transaction, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                errors.insert(format!("{prefix}name"), "name is required".to_owned());
                String::new()
            }
        };

        let value = match self.value {
            None | Some(Value::Null) => {
                errors.insert(format!("{prefix}value"), "value is required".to_owned());
                0
            }
            Some(Value::Number(number)) => match number_to_amount(&number) {
                Some(value) => value,
                None => {
                    errors.insert(
                        format!("{prefix}value"),
                        format!("{number} is out of range"),
                    );
                    0
                }
            },
            Some(Value::String(text)) => parse_amount(&text).unwrap_or_else(|| {
                errors.insert(
                    format!("{prefix}value"),
                    format!("\"{text}\" is not a number"),
                );
                0
            }),
            Some(other) => {
                errors.insert(
                    format!("{prefix}value"),
                    format!("{other} is not a number"),
                );
                0
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Transaction {
            name,
            value,
            date: self.date.unwrap_or(now),
        })
    }
}

/// Truncate a JSON number to a whole amount, or `None` if it does not fit in
/// an `i64`.
fn number_to_amount(number: &serde_json::Number) -> Option<i64> {
    if let Some(value) = number.as_i64() {
        return Some(value);
    }

    let value = number.as_f64()?.trunc();
    // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
    if value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn rejected(errors: FieldErrors) -> Response {
    tracing::debug!("Rejected transaction: {errors:?}");
    (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
}

/// A route handler that returns every transaction, most recent first.
pub async fn get_transactions_endpoint(State(state): State<TransactionState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match get_transactions(&connection) {
        Ok(transactions) => Json(transactions).into_response(),
        Err(error) => {
            tracing::error!("could not get transactions: {error}");
            error.into_json_response()
        }
    }
}

/// A route handler for saving a single transaction.
///
/// Responds with the stored transaction, or a 400 response with an `errors`
/// object if a required field is missing.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Json(body): Json<TransactionBody>,
) -> Response {
    let transaction = match body.validate("", OffsetDateTime::now_utc()) {
        Ok(transaction) => transaction,
        Err(errors) => return rejected(errors),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match create_transaction(&transaction, &connection) {
        Ok(stored) => Json(stored).into_response(),
        Err(error) => {
            tracing::error!("could not create transaction: {error}");
            error.into_json_response()
        }
    }
}

/// A route handler for saving many transactions in one request.
///
/// Either every transaction is saved or none are.
pub async fn create_transactions_bulk_endpoint(
    State(state): State<TransactionState>,
    Json(bodies): Json<Vec<TransactionBody>>,
) -> Response {
    let now = OffsetDateTime::now_utc();
    let mut transactions = Vec::with_capacity(bodies.len());
    let mut errors = FieldErrors::new();

    for (index, body) in bodies.into_iter().enumerate() {
        match body.validate(&format!("{index}."), now) {
            Ok(transaction) => transactions.push(transaction),
            Err(field_errors) => errors.extend(field_errors),
        }
    }

    if !errors.is_empty() {
        return rejected(errors);
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match create_transactions(&transactions, &connection) {
        Ok(stored) => {
            tracing::info!("Saved {} transactions from bulk request", stored.len());
            Json(stored).into_response()
        }
        Err(error) => {
            tracing::error!("could not create transactions: {error}");
            error.into_json_response()
        }
    }
}
