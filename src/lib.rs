//! Budget Tracker is a small web app for keeping a running total of your
//! spending and income.
//!
//! This library provides:
//! - a REST API and server rendered page backed by SQLite (see [build_router]),
//! - an offline capable client (see [client]) that queues writes which could
//!   not reach the server and caches responses for when the network is down.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
pub mod client;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod not_found;
pub mod page;
mod routing;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use transaction::{Transaction, TransactionAction, create_transactions, parse_amount};

use crate::{internal_server_error::InternalServerError, not_found::get_404_not_found_response};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The transaction name or amount was left empty.
    #[error("Missing Information")]
    MissingInformation,

    /// The amount does not start with a whole number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// The remote store refused to save a transaction.
    ///
    /// Holds the `errors` object from the response body.
    #[error("the server rejected the transaction: {0}")]
    Rejected(serde_json::Value),

    /// A request could not be completed at the network layer, e.g. the server
    /// is unreachable or the connection dropped.
    #[error("network request failed: {0}")]
    Network(String),

    /// The server responded, but the response could not be understood.
    #[error("invalid response from the server: {0}")]
    InvalidResponse(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into a response for the JSON API.
    ///
    /// Only client mistakes carry an `errors` object. Server side failures
    /// carry a `message` instead so that clients treat them as a failed
    /// delivery rather than a rejected transaction.
    fn into_json_response(self) -> Response {
        match self {
            Error::MissingInformation | Error::InvalidAmount(_) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": { "message": self.to_string() } })),
            )
                .into_response(),
            Error::Rejected(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "an unexpected error occurred" })),
                )
                    .into_response()
            }
        }
    }
}
