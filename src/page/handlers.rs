//! Route handlers for the server rendered budget page.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRequest;
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error, TransactionAction,
    page::{FormState, Ledger, view::dashboard_view, view::page_view},
    transaction::{create_transaction, get_transactions},
};

/// The state needed to display the page and handle its form.
#[derive(Debug, Clone)]
pub struct PageState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data posted by the add and subtract buttons.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The transaction name input.
    #[serde(default)]
    pub name: String,
    /// The amount input.
    #[serde(default)]
    pub amount: String,
    /// Which button was pressed.
    #[serde(default)]
    pub action: TransactionAction,
}

/// Display the budget page with every stored transaction.
pub async fn get_index_page(State(state): State<PageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let ledger = Ledger::new(get_transactions(&connection)?);

    Ok(page_view(&ledger, &FormState::default()).into_response())
}

/// Save the transaction from the page's form and return the updated dashboard.
///
/// If the name or amount is empty nothing is saved and the dashboard is
/// returned with the inputs kept and an error shown below the form.
///
/// HTMX requests get just the dashboard to swap in, plain form posts get the
/// whole page.
pub async fn submit_transaction_form(
    State(state): State<PageState>,
    HxRequest(is_htmx_request): HxRequest,
    Form(form): Form<TransactionForm>,
) -> Response {
    let mut form_state = FormState::new(&form.name, &form.amount);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match form_state.to_transaction(form.action, OffsetDateTime::now_utc()) {
        Ok(transaction) => match create_transaction(&transaction, &connection) {
            Ok(_) => form_state.clear(),
            Err(error) => {
                tracing::error!("could not create transaction: {error}");
                return error.into_response();
            }
        },
        Err(error) => {
            tracing::debug!("Invalid transaction form: {error}");
            form_state.set_error(&error);
        }
    }

    match get_transactions(&connection) {
        Ok(transactions) if is_htmx_request => {
            dashboard_view(&Ledger::new(transactions), &form_state).into_response()
        }
        Ok(transactions) => page_view(&Ledger::new(transactions), &form_state).into_response(),
        Err(error) => {
            tracing::error!("could not get transactions: {error}");
            error.into_response()
        }
    }
}
