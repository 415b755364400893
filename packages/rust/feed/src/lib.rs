//! Source feed fetching for linkpost.
//!
//! A feed turns an endpoint string into a [`Collection`] of bookmark records.
//! [`DropmarkFeed`] is the built-in implementation: it validates that the
//! endpoint is a Dropmark collection JSON URL and imports it over HTTP.

mod parser;

use std::time::Duration;

use async_trait::async_trait;
use linkpost_shared::{Collection, LinkpostError, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::parse_collection;

/// Default timeout in seconds for fetching a collection.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum response size we consider valid (20 MB).
const MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("linkpost/", env!("CARGO_PKG_VERSION"));

/// Host every Dropmark collection lives under.
const DROPMARK_HOST: &str = "dropmark.com";

// ---------------------------------------------------------------------------
// SourceFeed
// ---------------------------------------------------------------------------

/// Retrieves a record collection from an endpoint.
#[async_trait]
pub trait SourceFeed: Send + Sync {
    /// Check the endpoint's shape before any network access.
    fn validate_endpoint(&self, endpoint: &str) -> Result<()>;

    /// Fetch and parse the collection behind `endpoint`, reporting the
    /// download's bytes to `progress`.
    async fn fetch(&self, endpoint: &str, progress: &dyn FetchProgress) -> Result<Collection>;
}

/// Observes the bytes of a collection download.
pub trait FetchProgress: Send + Sync {
    /// `expected_bytes` is the response's content length, when the server sent one.
    fn start_download(&self, summary: &str, expected_bytes: Option<u64>);
    fn advance(&self, bytes: u64);
    fn finish_download(&self);
}

/// Ignores download progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn start_download(&self, _summary: &str, _expected_bytes: Option<u64>) {}
    fn advance(&self, _bytes: u64) {}
    fn finish_download(&self) {}
}

// ---------------------------------------------------------------------------
// Feed options
// ---------------------------------------------------------------------------

/// Configuration for the Dropmark feed.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// DropmarkFeed
// ---------------------------------------------------------------------------

/// Imports Dropmark collections (`https://<user>.dropmark.com/<id>.json`).
pub struct DropmarkFeed {
    client: Client,
    /// Accept any http(s) host (for integration tests with mock servers).
    allow_any_host: bool,
}

impl DropmarkFeed {
    /// Create a feed with the given options.
    pub fn new(opts: &FeedOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| LinkpostError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_any_host: false,
        })
    }

    /// Accept endpoints on any host (for integration tests).
    #[cfg(test)]
    fn allow_any_host(mut self) -> Self {
        self.allow_any_host = true;
        self
    }
}

#[async_trait]
impl SourceFeed for DropmarkFeed {
    fn validate_endpoint(&self, endpoint: &str) -> Result<()> {
        if self.allow_any_host {
            return check_endpoint_shape(endpoint, None);
        }
        check_endpoint_shape(endpoint, Some(DROPMARK_HOST))
    }

    #[instrument(skip(self, progress))]
    async fn fetch(&self, endpoint: &str, progress: &dyn FetchProgress) -> Result<Collection> {
        info!("importing collection");

        let body = fetch_body(&self.client, endpoint, progress).await?;
        let collection = parse_collection(endpoint, &body)?;

        info!(
            items = collection.len(),
            name = collection.name.as_deref().unwrap_or(""),
            "collection imported"
        );
        Ok(collection)
    }
}

/// Whether `endpoint` looks like a Dropmark collection API URL.
pub fn is_valid_api_endpoint(endpoint: &str) -> bool {
    check_endpoint_shape(endpoint, Some(DROPMARK_HOST)).is_ok()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate scheme, host, and `.json` path of an endpoint.
fn check_endpoint_shape(endpoint: &str, required_host: Option<&str>) -> Result<()> {
    let url = Url::parse(endpoint)
        .map_err(|e| LinkpostError::invalid_source(endpoint, format!("not a URL: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(LinkpostError::invalid_source(
            endpoint,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| LinkpostError::invalid_source(endpoint, "URL has no host"))?;

    if let Some(required) = required_host {
        let suffix = format!(".{required}");
        if host != required && !host.ends_with(&suffix) {
            return Err(LinkpostError::invalid_source(
                endpoint,
                format!("{host} is not a {required} host"),
            ));
        }
    }

    if !url.path().ends_with(".json") {
        return Err(LinkpostError::invalid_source(
            endpoint,
            "path must point at a .json collection",
        ));
    }

    Ok(())
}

/// Fetch the raw collection body chunk by chunk, reporting each chunk's size.
async fn fetch_body(client: &Client, url: &str, progress: &dyn FetchProgress) -> Result<String> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LinkpostError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LinkpostError::Network(format!("{url}: HTTP {status}")));
    }

    let expected = response.content_length();
    if let Some(len) = expected {
        if len > MAX_RESPONSE_SIZE {
            return Err(LinkpostError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    progress.start_download(&format!("Downloading Dropmark collection {url:?}"), expected);
    let body = read_chunks(&mut response, url, progress).await;
    progress.finish_download();
    let body = body?;

    debug!(bytes = body.len(), "collection body received");
    String::from_utf8(body).map_err(|e| LinkpostError::parse(format!("{url}: body is not UTF-8: {e}")))
}

async fn read_chunks(response: &mut reqwest::Response, url: &str, progress: &dyn FetchProgress) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| LinkpostError::Network(format!("{url}: failed to read body: {e}")))?
    {
        if (body.len() + chunk.len()) as u64 > MAX_RESPONSE_SIZE {
            return Err(LinkpostError::validation(format!(
                "{url}: response exceeds {MAX_RESPONSE_SIZE} bytes"
            )));
        }
        body.extend_from_slice(&chunk);
        progress.advance(chunk.len() as u64);
    }
    Ok(body)
}
