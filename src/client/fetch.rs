//! The request/response seam every client network call goes through.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, Method, Url,
    header::{ACCEPT, CONTENT_TYPE},
};

use crate::Error;

/// An HTTP request issued by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL, e.g. `http://127.0.0.1:3000/api/transaction`.
    pub url: String,
    /// A JSON body, if any.
    pub body: Option<String>,
}

impl FetchRequest {
    /// A GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    /// A POST request for `url` with a JSON `body`.
    pub fn post_json(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }

    /// The path component of the URL, or the whole URL if it cannot be parsed.
    pub fn path(&self) -> String {
        Url::parse(&self.url)
            .map(|url| url.path().to_owned())
            .unwrap_or_else(|_| self.url.clone())
    }

    /// Whether this is a GET request, the only kind whose response may be
    /// cached.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }
}

/// An HTTP response, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// The response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can turn a request into a response.
///
/// An `Err` means the request never got a response: the server could not be
/// reached, the connection dropped or the request timed out. Error statuses
/// are returned as `Ok` responses.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Send `request` and wait for the whole response.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// The real network, backed by a [reqwest::Client].
#[derive(Debug, Clone)]
pub struct HttpFetch {
    client: Client,
}

impl HttpFetch {
    /// Create a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns [Error::Network] if the HTTP client cannot be built.
    pub fn new(timeout: Duration, use_system_proxy: bool) -> Result<Self, Error> {
        let mut builder = Client::builder().timeout(timeout);
        if !use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|error| Error::Network(error.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetch {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(ACCEPT, "application/json, text/html;q=0.9, */*;q=0.8");

        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().await.map_err(|error| {
            tracing::debug!("{} {} failed: {error}", request.method, request.url);
            Error::Network(error.to_string())
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|error| Error::Network(error.to_string()))?
            .to_vec();

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}
