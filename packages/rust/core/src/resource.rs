//! Downloading remote images into the local image cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use linkpost_shared::{LinkpostError, Result};

/// Default timeout in seconds for image downloads.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum image size we are willing to cache (10 MB).
const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

const USER_AGENT: &str = concat!("linkpost/", env!("CARGO_PKG_VERSION"));

/// A remote resource cached on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedResource {
    pub local_path: PathBuf,
    /// URL pages use to reference the cached file.
    pub public_url: String,
    /// `true` when an earlier run had already cached the file.
    pub reused: bool,
}

/// Turns a remote reference into a locally cached, publicly referenceable file.
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    /// Cache `remote` as `<dest_dir>/<base_name>.<ext>`.
    async fn download(
        &self,
        remote: &str,
        dest_dir: &Path,
        base_name: &str,
        reference_url: &str,
    ) -> Result<DownloadedResource>;
}

/// Downloads over HTTP with `reqwest`.
pub struct HttpResourceFactory {
    client: Client,
}

impl HttpResourceFactory {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LinkpostError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFactory for HttpResourceFactory {
    #[instrument(skip(self, dest_dir, reference_url))]
    async fn download(
        &self,
        remote: &str,
        dest_dir: &Path,
        base_name: &str,
        reference_url: &str,
    ) -> Result<DownloadedResource> {
        let url = Url::parse(remote)
            .map_err(|e| LinkpostError::Download(format!("invalid resource URL {remote:?}: {e}")))?;

        if let Some(existing) = find_cached(dest_dir, base_name).await {
            debug!(path = %existing.display(), "resource already cached");
            return Ok(cached_resource(existing, reference_url, true));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LinkpostError::Download(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkpostError::Download(format!("GET {url}: HTTP {status}")));
        }
        if response.content_length().is_some_and(|len| len > MAX_IMAGE_SIZE) {
            return Err(LinkpostError::Download(format!(
                "GET {url}: larger than {MAX_IMAGE_SIZE} bytes"
            )));
        }

        let ext = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_for_content_type)
            .or_else(|| extension_from_path(&url))
            .unwrap_or_else(|| "img".to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LinkpostError::Download(format!("GET {url}: {e}")))?;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| LinkpostError::io(dest_dir, e))?;
        let path = dest_dir.join(format!("{base_name}.{ext}"));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| LinkpostError::io(&path, e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "resource downloaded");
        Ok(cached_resource(path, reference_url, false))
    }
}

fn cached_resource(path: PathBuf, reference_url: &str, reused: bool) -> DownloadedResource {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    DownloadedResource {
        public_url: format!("{}/{file_name}", reference_url.trim_end_matches('/')),
        local_path: path,
        reused,
    }
}

/// A file in `dir` whose stem is `base_name`, whatever its extension.
async fn find_cached(dir: &Path, base_name: &str) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.file_stem().is_some_and(|s| s == base_name) && path.is_file() {
            return Some(path);
        }
    }
    None
}

fn extension_for_content_type(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        _ => return None,
    };
    Some(ext.to_string())
}

fn extension_from_path(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}
