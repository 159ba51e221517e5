//! Drives the budget page: loading, replaying queued writes and handling the
//! add and subtract buttons.

use maud::Markup;
use time::OffsetDateTime;

use crate::{
    Error, Transaction, TransactionAction,
    client::{
        fetch::Fetch,
        queue::{PendingQueue, PendingWriteId},
        remote::{CreateOutcome, RemoteStore},
    },
    page::{FormState, Ledger, page_view},
};

/// What happened when the page was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// How many transactions the server (or the cache) returned, or `None` if
    /// none could be fetched.
    pub fetched: Option<usize>,
    /// What happened to the queued writes.
    pub replay: ReplayReport,
}

/// What happened to the queued writes during a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayReport {
    /// There was nothing to send.
    Empty,
    /// The server stored this many queued transactions.
    Delivered(usize),
    /// This many transactions could not be delivered and stay queued.
    Deferred(usize),
}

/// What happened when the add or subtract button was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A field was empty or the amount was not a number. Nothing changed
    /// except the form's error message.
    Invalid,
    /// The server stored the transaction.
    Saved,
    /// The server refused the transaction. The form keeps its inputs.
    Rejected,
    /// The server could not be reached so the transaction was queued.
    Queued(PendingWriteId),
}

/// The state behind the budget page and the operations on it.
#[derive(Debug)]
pub struct PageController<F> {
    remote: RemoteStore<F>,
    queue: PendingQueue,
    ledger: Ledger,
    form: FormState,
}

impl<F: Fetch> PageController<F> {
    /// Create a controller with an empty ledger and form.
    ///
    /// Call [PageController::load] to fill the ledger.
    pub fn new(remote: RemoteStore<F>, queue: PendingQueue) -> Self {
        Self {
            remote,
            queue,
            ledger: Ledger::default(),
            form: FormState::default(),
        }
    }

    /// The transactions shown on the page.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The form inputs and error message.
    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// The form, for typing into it.
    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    /// The local write queue.
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// The server's API.
    pub fn remote(&self) -> &RemoteStore<F> {
        &self.remote
    }

    /// Render the whole page from the current state.
    pub fn render(&self) -> Markup {
        page_view(&self.ledger, &self.form)
    }

    /// Replace the ledger with the server's transactions, then replay any
    /// queued writes.
    ///
    /// If the transactions cannot be fetched the page starts out empty.
    ///
    /// # Errors
    /// Returns an error only if the local queue cannot be read or updated.
    pub async fn load(&mut self) -> Result<LoadReport, Error> {
        let fetched = match self.remote.list().await {
            Ok(transactions) => {
                let count = transactions.len();
                self.ledger = Ledger::new(transactions);
                Some(count)
            }
            Err(error) => {
                tracing::warn!("Could not load transactions: {error}");
                self.ledger = Ledger::default();
                None
            }
        };

        let replay = self.drain_and_replay().await?;

        Ok(LoadReport { fetched, replay })
    }

    /// Show the queued transactions on the page and send them to the server
    /// in one request.
    ///
    /// The queued records are deleted only once the server confirms it stored
    /// them. Otherwise they stay queued until the next replay.
    ///
    /// # Errors
    /// Returns an error only if the local queue cannot be read or updated.
    pub async fn drain_and_replay(&mut self) -> Result<ReplayReport, Error> {
        let claimed = self.queue.claim()?;

        if claimed.is_empty() {
            return Ok(ReplayReport::Empty);
        }

        let ids: Vec<PendingWriteId> = claimed.iter().map(|record| record.id).collect();
        let transactions: Vec<Transaction> = claimed
            .into_iter()
            .map(|record| record.transaction)
            .collect();

        for transaction in &transactions {
            self.ledger.prepend(transaction.clone());
        }

        match self.remote.create_bulk(&transactions).await {
            Ok(()) => {
                self.queue.acknowledge(&ids)?;
                tracing::info!("Delivered {} queued transactions", ids.len());
                Ok(ReplayReport::Delivered(ids.len()))
            }
            Err(error) => {
                self.queue.release(&ids)?;
                tracing::warn!("Could not deliver {} queued transactions: {error}", ids.len());
                Ok(ReplayReport::Deferred(ids.len()))
            }
        }
    }

    /// Handle a press of the add or subtract button, dated now.
    ///
    /// # Errors
    /// Returns an error only if the server could not be reached and the
    /// transaction could not be queued either.
    pub async fn submit(&mut self, action: TransactionAction) -> Result<SubmitOutcome, Error> {
        self.submit_at(action, OffsetDateTime::now_utc()).await
    }

    /// Handle a press of the add or subtract button for a transaction made at
    /// `date`.
    ///
    /// The transaction is shown on the page before the server is contacted.
    ///
    /// # Errors
    /// Returns an error only if the server could not be reached and the
    /// transaction could not be queued either.
    pub async fn submit_at(
        &mut self,
        action: TransactionAction,
        date: OffsetDateTime,
    ) -> Result<SubmitOutcome, Error> {
        let transaction = match self.form.to_transaction(action, date) {
            Ok(transaction) => transaction,
            Err(error) => {
                self.form.set_error(&error);
                return Ok(SubmitOutcome::Invalid);
            }
        };

        self.form.error = None;
        self.ledger.prepend(transaction.clone());

        match self.remote.create(&transaction).await {
            Ok(CreateOutcome::Stored(_)) => {
                self.form.clear();
                Ok(SubmitOutcome::Saved)
            }
            Ok(CreateOutcome::Rejected(errors)) => {
                tracing::debug!("Server rejected transaction: {errors}");
                self.form.set_error(&Error::MissingInformation);
                Ok(SubmitOutcome::Rejected)
            }
            Err(error @ (Error::Network(_) | Error::InvalidResponse(_))) => {
                tracing::info!("Could not save transaction, queuing it: {error}");
                let id = self.queue.enqueue(&transaction)?;
                self.form.clear();
                Ok(SubmitOutcome::Queued(id))
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use rusqlite::Connection;
    use serde_json::json;
    use time::macros::datetime;

    use crate::{
        Transaction, TransactionAction,
        client::{
            HttpFetch,
            cache::CacheStorage,
            db::initialize,
            fetch::FetchResponse,
            queue::PendingQueue,
            remote::RemoteStore,
            service_worker::ServiceWorker,
        },
        page::FormState,
        test_utils::{ScriptedFetch, SwitchableFetch, spawn_test_server},
    };

    use super::{LoadReport, PageController, ReplayReport, SubmitOutcome};

    const ORIGIN: &str = "http://localhost:3000";

    fn get_test_connection() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        Arc::new(Mutex::new(conn))
    }

    fn get_scripted_controller(network: ScriptedFetch) -> PageController<ScriptedFetch> {
        let queue = PendingQueue::new(get_test_connection()).unwrap();

        PageController::new(RemoteStore::new(network, ORIGIN), queue)
    }

    fn json_response(status: u16, body: serde_json::Value) -> FetchResponse {
        FetchResponse {
            status,
            content_type: Some("application/json".to_owned()),
            body: body.to_string().into_bytes(),
        }
    }

    #[tokio::test]
    async fn empty_field_does_not_touch_ledger_or_network() {
        let network = ScriptedFetch::online();
        let mut controller = get_scripted_controller(network.clone());
        *controller.form_mut() = FormState::new("Groceries", "");

        let outcome = controller.submit(TransactionAction::Add).await;

        assert_eq!(outcome, Ok(SubmitOutcome::Invalid));
        assert!(controller.ledger().is_empty());
        assert_eq!(controller.form().error.as_deref(), Some("Missing Information"));
        assert_eq!(controller.form().name, "Groceries");
        assert!(network.requests().is_empty());
    }

    #[tokio::test]
    async fn saved_transaction_is_first_row_and_last_chart_point() {
        let date = datetime!(2025-03-10 12:00 UTC);
        let stored = Transaction::new("Bonus", 25, date);
        let network = ScriptedFetch::online().with_response(
            "/api/transaction",
            json_response(200, serde_json::to_value(&stored).unwrap()),
        );
        let mut controller = get_scripted_controller(network);
        *controller.form_mut() = FormState::new("Bonus", "25");

        let outcome = controller.submit_at(TransactionAction::Add, date).await;

        assert_eq!(outcome, Ok(SubmitOutcome::Saved));
        assert_eq!(controller.ledger().transactions().first(), Some(&stored));
        assert_eq!(controller.form(), &FormState::default());
        let last_point = controller.ledger().running_totals().pop().unwrap();
        assert_eq!(last_point.total, controller.ledger().total());
    }

    #[tokio::test]
    async fn rejection_keeps_form_and_shows_error() {
        let network = ScriptedFetch::online().with_response(
            "/api/transaction",
            json_response(400, json!({ "errors": { "name": "name is required" } })),
        );
        let mut controller = get_scripted_controller(network);
        *controller.form_mut() = FormState::new("Groceries", "50");

        let outcome = controller.submit(TransactionAction::Subtract).await;

        assert_eq!(outcome, Ok(SubmitOutcome::Rejected));
        assert_eq!(controller.form().name, "Groceries");
        assert_eq!(controller.form().amount, "50");
        assert_eq!(controller.form().error.as_deref(), Some("Missing Information"));
        assert_eq!(controller.queue().is_empty(), Ok(true));
    }

    #[tokio::test]
    async fn network_failure_queues_and_clears_form() {
        let mut controller = get_scripted_controller(ScriptedFetch::offline());
        *controller.form_mut() = FormState::new("Groceries", "50");

        let outcome = controller
            .submit_at(TransactionAction::Subtract, datetime!(2025-03-09 18:00 UTC))
            .await;

        assert!(matches!(outcome, Ok(SubmitOutcome::Queued(_))));
        assert_eq!(controller.form(), &FormState::default());
        assert_eq!(controller.ledger().total(), -50);
        let queued = controller.queue().pending().unwrap();
        assert_eq!(
            queued[0].transaction,
            Transaction::new("Groceries", -50, datetime!(2025-03-09 18:00 UTC))
        );
    }

    #[tokio::test]
    async fn undecodable_response_is_queued() {
        let network = ScriptedFetch::online().with_response(
            "/api/transaction",
            FetchResponse {
                status: 502,
                content_type: Some("text/html".to_owned()),
                body: b"<h1>Bad Gateway</h1>".to_vec(),
            },
        );
        let mut controller = get_scripted_controller(network);
        *controller.form_mut() = FormState::new("Salary", "1000");

        let outcome = controller.submit(TransactionAction::Add).await;

        assert!(matches!(outcome, Ok(SubmitOutcome::Queued(_))));
        assert_eq!(controller.queue().len(), Ok(1));
    }

    #[tokio::test]
    async fn load_offline_starts_empty_and_keeps_queue() {
        let mut controller = get_scripted_controller(ScriptedFetch::offline());
        controller
            .queue()
            .enqueue(&Transaction::new("Salary", 1000, datetime!(2025-03-08 09:00 UTC)))
            .unwrap();

        let report = controller.load().await;

        assert_eq!(
            report,
            Ok(LoadReport {
                fetched: None,
                replay: ReplayReport::Deferred(1),
            })
        );
        assert_eq!(controller.ledger().total(), 1000);
        let queued = controller.queue().pending().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].attempts, 1);
    }

    #[tokio::test]
    async fn replayed_transactions_are_newest_first() {
        let network = ScriptedFetch::online()
            .with_response("/api/transaction", json_response(200, json!([])))
            .with_response("/api/transaction/bulk", json_response(200, json!([])));
        let mut controller = get_scripted_controller(network.clone());
        let older = Transaction::new("Salary", 1000, datetime!(2025-03-08 09:00 UTC));
        let newer = Transaction::new("Groceries", -50, datetime!(2025-03-09 18:00 UTC));
        controller.queue().enqueue(&older).unwrap();
        controller.queue().enqueue(&newer).unwrap();

        let report = controller.load().await.unwrap();

        assert_eq!(report.replay, ReplayReport::Delivered(2));
        assert_eq!(controller.ledger().transactions(), &[newer, older]);
        assert_eq!(controller.queue().is_empty(), Ok(true));
        let bulk = network
            .requests()
            .into_iter()
            .find(|request| request.path() == "/api/transaction/bulk")
            .expect("no bulk request was sent");
        let sent: Vec<Transaction> = serde_json::from_str(bulk.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test]
    async fn render_shows_current_state() {
        let network = ScriptedFetch::online().with_response(
            "/api/transaction",
            json_response(
                200,
                serde_json::to_value(vec![Transaction::new(
                    "Salary",
                    1000,
                    datetime!(2025-03-08 09:00 UTC),
                )])
                .unwrap(),
            ),
        );
        let mut controller = get_scripted_controller(network);
        controller.load().await.unwrap();

        let page = controller.render().into_string();

        assert!(page.contains(r#"<span id="total">1000</span>"#));
    }

    #[tokio::test]
    async fn offline_writes_reach_server_once_back_online() {
        let base_url = spawn_test_server().await;
        let network = SwitchableFetch::new(HttpFetch::new(Duration::from_secs(5), false).unwrap());
        let connection = get_test_connection();
        let worker = ServiceWorker::new(
            network.clone(),
            CacheStorage::new(connection.clone()),
            &base_url,
        )
        .with_manifest(vec!["/".to_owned()]);
        worker.register().await.unwrap();
        let mut controller = PageController::new(
            RemoteStore::new(worker, &base_url),
            PendingQueue::new(connection).unwrap(),
        );

        controller.load().await.unwrap();
        *controller.form_mut() = FormState::new("Salary", "1000");
        assert_eq!(
            controller.submit(TransactionAction::Add).await,
            Ok(SubmitOutcome::Saved)
        );

        // Refresh so the list is cached, then lose the network.
        controller.load().await.unwrap();
        network.set_online(false);
        *controller.form_mut() = FormState::new("Groceries", "50");
        let outcome = controller.submit(TransactionAction::Subtract).await;
        assert!(matches!(outcome, Ok(SubmitOutcome::Queued(_))));
        assert_eq!(controller.ledger().total(), 950);

        let report = controller.load().await.unwrap();
        assert_eq!(report.fetched, Some(1), "list should come from the cache");
        assert_eq!(report.replay, ReplayReport::Deferred(1));
        assert_eq!(controller.ledger().total(), 950);

        network.set_online(true);
        let report = controller.load().await.unwrap();
        assert_eq!(report.replay, ReplayReport::Delivered(1));
        assert_eq!(controller.queue().is_empty(), Ok(true));

        controller.load().await.unwrap();
        assert_eq!(controller.ledger().len(), 2);
        assert_eq!(controller.ledger().total(), 950);
        assert_eq!(controller.ledger().transactions()[0].name, "Groceries");
    }
}
