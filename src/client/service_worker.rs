//! A caching layer that sits between the client and the network.
//!
//! Once active, every request passes through [ServiceWorker::fetch]:
//! - API requests (any path containing `/api/`) go to the network first.
//!   Successful GET responses are copied into the data bucket, and a GET that
//!   fails at the network layer is answered from that bucket instead.
//! - Everything else is a static asset, served from the static bucket when it
//!   has a copy and from the network otherwise.
//!
//! Until [ServiceWorker::activate] has run, requests go straight to the
//! network.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::{
    Error,
    client::{
        cache::CacheStorage,
        fetch::{Fetch, FetchRequest, FetchResponse},
    },
};

/// The bucket holding the app shell.
pub const STATIC_CACHE: &str = "static-cache-v1";

/// The bucket holding copies of API responses.
pub const DATA_CACHE: &str = "data-cache-v1";

/// The buckets the current version uses. Activation deletes every other
/// bucket.
pub const CACHE_ALLOWLIST: [&str; 2] = [STATIC_CACHE, DATA_CACHE];

/// The paths stored in the static bucket on install.
pub const DEFAULT_MANIFEST: [&str; 3] = ["/", "/static/styles.css", "/static/manifest.webmanifest"];

const API_PATH_MARKER: &str = "/api/";

/// Intercepts requests and answers them from the network or the cache.
#[derive(Debug)]
pub struct ServiceWorker<F> {
    network: F,
    caches: CacheStorage,
    origin: String,
    manifest: Vec<String>,
    active: AtomicBool,
}

impl<F: Fetch> ServiceWorker<F> {
    /// Create an inactive worker for the server at `origin` that precaches
    /// [DEFAULT_MANIFEST].
    pub fn new(network: F, caches: CacheStorage, origin: &str) -> Self {
        Self {
            network,
            caches,
            origin: origin.trim_end_matches('/').to_owned(),
            manifest: DEFAULT_MANIFEST.iter().map(|path| path.to_string()).collect(),
            active: AtomicBool::new(false),
        }
    }

    /// Precache `manifest` instead of [DEFAULT_MANIFEST].
    pub fn with_manifest(mut self, manifest: Vec<String>) -> Self {
        self.manifest = manifest;
        self
    }

    /// The cache buckets this worker reads and writes.
    pub fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    /// Whether the worker is intercepting requests.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Fetch every path in the manifest and store the responses in the static
    /// bucket.
    ///
    /// Nothing is stored unless every asset was fetched successfully.
    ///
    /// # Errors
    /// Returns an error if any asset could not be fetched or stored.
    pub async fn install(&self) -> Result<usize, Error> {
        let mut entries = Vec::with_capacity(self.manifest.len());

        for path in &self.manifest {
            let url = format!("{}{path}", self.origin);
            let response = self.network.fetch(&FetchRequest::get(url)).await?;

            if !response.is_success() {
                return Err(Error::InvalidResponse(format!(
                    "precaching {path} returned status {}",
                    response.status
                )));
            }

            entries.push((path.clone(), response));
        }

        self.caches.put_all(STATIC_CACHE, &entries)?;
        tracing::info!("Installed {} assets into {STATIC_CACHE}", entries.len());

        Ok(entries.len())
    }

    /// Delete every bucket that is not in [CACHE_ALLOWLIST] and start
    /// intercepting requests.
    ///
    /// Returns the names of the deleted buckets.
    pub fn activate(&self) -> Result<Vec<String>, Error> {
        let mut removed = Vec::new();

        for name in self.caches.bucket_names()? {
            if !CACHE_ALLOWLIST.contains(&name.as_str()) {
                tracing::info!("Removing old cache {name}");
                self.caches.delete_bucket(&name)?;
                removed.push(name);
            }
        }

        self.active.store(true, Ordering::SeqCst);

        Ok(removed)
    }

    /// Install and then activate straight away.
    ///
    /// If install fails but an earlier install left the static bucket behind,
    /// the worker is still activated so that the earlier copy can be served.
    ///
    /// # Errors
    /// Returns the install error, or an error from activation.
    pub async fn register(&self) -> Result<(), Error> {
        match self.install().await {
            Ok(_) => {
                self.activate()?;
                Ok(())
            }
            Err(error) => {
                if self.caches.has_bucket(STATIC_CACHE)? {
                    tracing::warn!(
                        "Install failed, keeping the previously installed assets: {error}"
                    );
                    self.activate()?;
                }

                Err(error)
            }
        }
    }

    async fn fetch_data(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.caches.open_bucket(DATA_CACHE)?;

        match self.network.fetch(request).await {
            Ok(response) => {
                if request.is_read() && response.status == 200 {
                    if let Err(error) = self.caches.put(DATA_CACHE, &request.url, &response) {
                        tracing::warn!("Could not cache {}: {error}", request.url);
                    }
                }

                Ok(response)
            }
            Err(error) if request.is_read() => match self.caches.lookup(DATA_CACHE, &request.url) {
                Ok(Some(cached)) => {
                    tracing::info!("Network unavailable, serving {} from cache", request.url);
                    Ok(cached)
                }
                Ok(None) => Err(error),
                Err(cache_error) => {
                    tracing::warn!("Could not read cached {}: {cache_error}", request.url);
                    Err(error)
                }
            },
            Err(error) => Err(error),
        }
    }

    async fn fetch_static(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        if request.is_read() {
            if let Some(cached) = self.caches.lookup(STATIC_CACHE, &request.path())? {
                return Ok(cached);
            }
        }

        self.network.fetch(request).await
    }
}

#[async_trait]
impl<F: Fetch> Fetch for ServiceWorker<F> {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        if !self.is_active() {
            return self.network.fetch(request).await;
        }

        if request.path().contains(API_PATH_MARKER) {
            self.fetch_data(request).await
        } else {
            self.fetch_static(request).await
        }
    }
}
