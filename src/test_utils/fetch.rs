use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::{
    AppState, Error, build_router,
    client::{Fetch, FetchRequest, FetchResponse},
};

/// A fake network that answers from a fixed table of responses keyed by path.
///
/// Clones share state, so a test can keep a handle and take the network
/// offline after handing a clone to the code under test.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedFetch {
    state: Arc<Mutex<ScriptedState>>,
}

#[derive(Debug)]
struct ScriptedState {
    online: bool,
    responses: HashMap<String, FetchResponse>,
    requests: Vec<FetchRequest>,
}

impl ScriptedFetch {
    pub(crate) fn online() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                online: true,
                responses: HashMap::new(),
                requests: Vec::new(),
            })),
        }
    }

    pub(crate) fn offline() -> Self {
        let fetch = Self::online();
        fetch.set_online(false);
        fetch
    }

    pub(crate) fn with_response(self, path: &str, response: FetchResponse) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(path.to_owned(), response);
        self
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.state.lock().unwrap().online = online;
    }

    /// Every request seen so far, including ones made while offline.
    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if !state.online {
            return Err(Error::Network("network is offline".to_owned()));
        }

        Ok(state
            .responses
            .get(&request.path())
            .cloned()
            .unwrap_or(FetchResponse {
                status: 404,
                content_type: None,
                body: Vec::new(),
            }))
    }
}

/// Wraps another transport with a switch for simulating loss of network.
#[derive(Debug, Clone)]
pub(crate) struct SwitchableFetch<F> {
    inner: F,
    online: Arc<AtomicBool>,
}

impl<F> SwitchableFetch<F> {
    pub(crate) fn new(inner: F) -> Self {
        Self {
            inner,
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl<F: Fetch> Fetch for SwitchableFetch<F> {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("network is offline".to_owned()));
        }

        self.inner.fetch(request).await
    }
}

/// Start the full server on a random local port with an in-memory database
/// and return its base URL.
pub(crate) async fn spawn_test_server() -> String {
    let conn = Connection::open_in_memory().expect("Could not open database");
    let state = AppState::new(conn).expect("Could not create app state");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind test server");
    let address = listener.local_addr().expect("Could not get local address");

    tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .await
            .expect("Test server failed");
    });

    format!("http://{address}")
}
