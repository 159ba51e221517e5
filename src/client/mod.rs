//! The offline capable client.
//!
//! [PageController] holds the page state and talks to the server through a
//! [ServiceWorker], which caches responses so the page can still load when
//! the network is down. Transactions that cannot be sent are kept in a
//! [PendingQueue] and replayed in bulk the next time the page loads.

mod cache;
mod config;
mod controller;
mod db;
mod fetch;
mod queue;
mod remote;
mod service_worker;

pub use cache::CacheStorage;
pub use config::{Client, ClientConfig, open};
pub use controller::{LoadReport, PageController, ReplayReport, SubmitOutcome};
pub use db::{CLIENT_SCHEMA_VERSION, initialize};
pub use fetch::{Fetch, FetchRequest, FetchResponse, HttpFetch};
pub use queue::{PendingQueue, PendingWrite, PendingWriteId, PendingWriteState};
pub use remote::{CreateOutcome, RemoteStore};
pub use service_worker::{
    CACHE_ALLOWLIST, DATA_CACHE, DEFAULT_MANIFEST, STATIC_CACHE, ServiceWorker,
};
