//! Command line and environment configuration for the client, and opening
//! the client from it.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::Args;
use rusqlite::Connection;

use crate::{
    Error,
    client::{
        cache::CacheStorage,
        controller::PageController,
        db::initialize,
        fetch::HttpFetch,
        queue::PendingQueue,
        remote::RemoteStore,
        service_worker::ServiceWorker,
    },
};

/// The page controller the command line client uses: the real network behind
/// the caching layer.
pub type Client = PageController<ServiceWorker<HttpFetch>>;

/// Where the client finds the server and keeps its local data.
#[derive(Args, Debug, Clone)]
pub struct ClientConfig {
    /// The base URL of the budget server.
    #[arg(long = "server", env = "BUDGET_SERVER", default_value = "http://127.0.0.1:3000")]
    pub server_url: String,

    /// File path to the local SQLite database holding queued writes and
    /// cached responses.
    #[arg(long = "data", env = "BUDGET_DATA", default_value = "budget-tracker.db")]
    pub data_path: PathBuf,

    /// How long to wait for the server before treating it as unreachable.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Ignore proxy settings from the environment.
    #[arg(long)]
    pub no_proxy: bool,
}

/// Open the local database, set up the caching layer and create the page
/// controller.
///
/// A failed install of the caching layer is logged and otherwise ignored:
/// the client still works, it just cannot serve anything offline yet.
///
/// # Errors
/// Returns an error if the local database cannot be opened or initialized,
/// or if the HTTP client cannot be built.
pub async fn open(config: &ClientConfig) -> Result<Client, Error> {
    let connection = Connection::open(&config.data_path)?;
    initialize(&connection)?;
    let connection = Arc::new(Mutex::new(connection));

    let network = HttpFetch::new(Duration::from_secs(config.timeout_secs), !config.no_proxy)?;
    let worker = ServiceWorker::new(
        network,
        CacheStorage::new(connection.clone()),
        &config.server_url,
    );

    if let Err(error) = worker.register().await {
        tracing::warn!("Could not install offline assets: {error}");
    }

    let queue = PendingQueue::new(connection)?;

    Ok(PageController::new(
        RemoteStore::new(worker, &config.server_url),
        queue,
    ))
}
