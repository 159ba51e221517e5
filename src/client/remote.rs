//! Typed calls to the server's transaction API.

use serde_json::Value;

use crate::{
    Error, Transaction,
    client::fetch::{Fetch, FetchRequest, FetchResponse},
    endpoints,
};

/// What the server did with a transaction sent to it.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The server stored the transaction and echoed it back.
    Stored(Transaction),
    /// The server refused the transaction. Holds the `errors` value from the
    /// response body.
    Rejected(Value),
}

/// The server's transaction API, reached through `F`.
#[derive(Debug, Clone)]
pub struct RemoteStore<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> RemoteStore<F> {
    /// Create a client for the server at `base_url`, e.g.
    /// `http://127.0.0.1:3000`.
    pub fn new(fetcher: F, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The transport used for requests.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The absolute URL for `path` on the server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetch every transaction, most recent first.
    ///
    /// # Errors
    /// Returns [Error::Network] if the request failed and
    /// [Error::InvalidResponse] if the server did not reply with a list.
    pub async fn list(&self) -> Result<Vec<Transaction>, Error> {
        let response = self
            .fetcher
            .fetch(&FetchRequest::get(self.url(endpoints::TRANSACTION_API)))
            .await?;

        if !response.is_success() {
            return Err(Error::InvalidResponse(format!(
                "listing transactions returned status {}",
                response.status
            )));
        }

        serde_json::from_slice(&response.body).map_err(|error| {
            Error::InvalidResponse(format!("could not decode transaction list: {error}"))
        })
    }

    /// Send one transaction to the server.
    ///
    /// # Errors
    /// Returns [Error::Network] if the request failed and
    /// [Error::InvalidResponse] if the reply was neither a transaction nor a
    /// rejection.
    pub async fn create(&self, transaction: &Transaction) -> Result<CreateOutcome, Error> {
        let body = serde_json::to_string(transaction)?;
        let response = self
            .fetcher
            .fetch(&FetchRequest::post_json(
                self.url(endpoints::TRANSACTION_API),
                body,
            ))
            .await?;

        decode_create_response(&response)
    }

    /// Send many transactions to the server in one request.
    ///
    /// The server stores all of them or none of them.
    ///
    /// # Errors
    /// Returns [Error::Network] if the request failed and
    /// [Error::InvalidResponse] if the server did not confirm it stored them.
    pub async fn create_bulk(&self, transactions: &[Transaction]) -> Result<(), Error> {
        let body = serde_json::to_string(transactions)?;
        let response = self
            .fetcher
            .fetch(&FetchRequest::post_json(
                self.url(endpoints::TRANSACTION_BULK_API),
                body,
            ))
            .await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(Error::InvalidResponse(format!(
                "bulk upload returned status {}: {}",
                response.status,
                response.text()
            )))
        }
    }
}

fn decode_create_response(response: &FetchResponse) -> Result<CreateOutcome, Error> {
    let body: Value = serde_json::from_slice(&response.body).map_err(|error| {
        Error::InvalidResponse(format!(
            "status {} with undecodable body: {error}",
            response.status
        ))
    })?;

    if let Some(errors) = body.get("errors").filter(|errors| is_truthy(errors)) {
        return Ok(CreateOutcome::Rejected(errors.clone()));
    }

    // A failed status without `errors` means the write may not have been
    // stored, so it is reported as undelivered and the caller queues it.
    if !response.is_success() {
        return Err(Error::InvalidResponse(format!(
            "saving transaction returned status {}",
            response.status
        )));
    }

    serde_json::from_value(body)
        .map(CreateOutcome::Stored)
        .map_err(|error| Error::InvalidResponse(format!("could not decode transaction: {error}")))
}

/// Whether `value` counts as set: not null, false, zero or an empty string.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
