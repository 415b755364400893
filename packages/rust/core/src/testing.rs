//! In-memory collaborators for pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;
use uuid::Uuid;

use linkpost_feed::{FetchProgress, SourceFeed};
use linkpost_link::{DiscardReason, LinkResolver, Traversal, TraversedLink};
use linkpost_shared::{Collection, LinkpostError, Result, SourceRecord};

use crate::capabilities::{BasePath, PublishOption};
use crate::config::PipelineConfig;
use crate::content::ContentDocument;
use crate::report::{ErrorTally, ProgressReporter};
use crate::resource::{DownloadedResource, ResourceFactory};
use crate::store::{ContentStore, WriteOutcome, WriterIndexer};

pub(crate) const ENDPOINT: &str = "https://shah.dropmark.com/616548.json";

pub(crate) fn temp_base() -> (PathBuf, BasePath) {
    let root = std::env::temp_dir().join(format!("linkpost-test-{}", Uuid::now_v7()));
    (root.clone(), BasePath::new(root))
}

pub(crate) fn record(index: usize, name: &str, link: &str) -> SourceRecord {
    SourceRecord {
        index,
        name: name.to_string(),
        link: link.to_string(),
        description: format!("About {name}"),
        updated_at: "2024-05-01 09:30:00 UTC".to_string(),
        tags: vec!["rust".to_string()],
        thumbnail: None,
        body: String::new(),
        archetype: "link".to_string(),
    }
}

/// `n` records linking to `https://www.site{i}.com/post`.
pub(crate) fn records(n: usize) -> Vec<SourceRecord> {
    (0..n)
        .map(|i| record(i, &format!("Post {i}"), &format!("https://www.site{i}.com/post")))
        .collect()
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

pub(crate) struct StaticFeed {
    items: Vec<SourceRecord>,
    fail_fetch: bool,
}

impl StaticFeed {
    pub(crate) fn new(items: Vec<SourceRecord>) -> Self {
        Self {
            items,
            fail_fetch: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail_fetch: true,
        }
    }
}

#[async_trait]
impl SourceFeed for StaticFeed {
    fn validate_endpoint(&self, endpoint: &str) -> Result<()> {
        if endpoint.ends_with(".json") {
            Ok(())
        } else {
            Err(LinkpostError::invalid_source(endpoint, "not a collection JSON URL"))
        }
    }

    async fn fetch(&self, endpoint: &str, progress: &dyn FetchProgress) -> Result<Collection> {
        if self.fail_fetch {
            return Err(LinkpostError::Network("HTTP 503".into()));
        }
        // Pretend the collection arrived as one 64-byte-per-record payload.
        let bytes = 64 * self.items.len() as u64;
        progress.start_download("Downloading fixture", Some(bytes));
        progress.advance(bytes);
        progress.finish_download();
        Ok(Collection {
            endpoint: endpoint.to_string(),
            name: Some("fixture".into()),
            items: self.items.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Link resolver
// ---------------------------------------------------------------------------

/// Discards links containing `discard`, fails links containing `broken`,
/// retains everything else unchanged. Tracks the peak number of concurrent calls.
#[derive(Default)]
pub(crate) struct FakeResolver {
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeResolver {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkResolver for FakeResolver {
    async fn traverse(&self, raw: &str) -> Result<Traversal> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if raw.contains("discard") {
            return Ok(Traversal::Discard(DiscardReason::Ignored("discard".into())));
        }
        if raw.contains("broken") {
            return Err(LinkpostError::Link(format!("GET {raw}: HTTP 500")));
        }
        let url = Url::parse(raw).map_err(|e| LinkpostError::Link(e.to_string()))?;
        Ok(Traversal::Retain(TraversedLink::new(raw, Some(url))))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Keeps rendered documents in memory, keyed by target path.
#[derive(Default)]
pub(crate) struct MemoryStore {
    written: Mutex<Vec<(PathBuf, String)>>,
}

impl MemoryStore {
    pub(crate) fn documents(&self) -> Vec<(PathBuf, String)> {
        self.written.lock().clone()
    }

    pub(crate) fn document_named(&self, file_name: &str) -> Option<String> {
        self.written
            .lock()
            .iter()
            .find(|(p, _)| p.file_name().is_some_and(|n| n == file_name))
            .map(|(_, doc)| doc.clone())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn write(
        &self,
        config: &PipelineConfig,
        indexer: &dyn WriterIndexer,
        doc: &ContentDocument,
    ) -> Result<WriteOutcome> {
        let rendered = doc.render(config).await?;
        self.written.lock().push((indexer.target_path(doc), rendered));
        Ok(WriteOutcome::Written)
    }
}

impl PublishOption for MemoryStore {
    fn content_store(self: Arc<Self>) -> Option<Arc<dyn ContentStore>> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Pretends every download succeeds, unless the remote contains `missing`.
pub(crate) struct StubResources;

#[async_trait]
impl ResourceFactory for StubResources {
    async fn download(
        &self,
        remote: &str,
        dest_dir: &Path,
        base_name: &str,
        reference_url: &str,
    ) -> Result<DownloadedResource> {
        if remote.contains("missing") {
            return Err(LinkpostError::Download(format!("GET {remote}: HTTP 404")));
        }
        Ok(DownloadedResource {
            local_path: dest_dir.join(format!("{base_name}.png")),
            public_url: format!("{reference_url}/{base_name}.png"),
            reused: false,
        })
    }
}

impl PublishOption for StubResources {
    fn resource_factory(self: Arc<Self>) -> Option<Arc<dyn ResourceFactory>> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Records every reporter call.
#[derive(Default)]
pub(crate) struct CountingReporter {
    pub(crate) started: Mutex<Option<(String, usize)>>,
    pub(crate) completed: Mutex<Option<String>>,
    pub(crate) increments: AtomicUsize,
    pub(crate) warnings: Mutex<Vec<String>>,
    pub(crate) download: Mutex<Option<(String, Option<u64>)>>,
    pub(crate) bytes: AtomicU64,
    pub(crate) downloads_completed: AtomicUsize,
    tally: Mutex<ErrorTally>,
}

impl CountingReporter {
    pub(crate) fn with_budget(max_errors: usize) -> Self {
        Self {
            tally: Mutex::new(ErrorTally::new(max_errors)),
            ..Self::default()
        }
    }

    pub(crate) fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    pub(crate) fn errors(&self) -> usize {
        self.tally.lock().reported()
    }
}

impl ProgressReporter for CountingReporter {
    fn start_activity(&self, summary: &str, expected_items: usize) {
        *self.started.lock() = Some((summary.to_string(), expected_items));
    }

    fn increment(&self) {
        self.increments.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_by(&self, n: usize) {
        self.increments.fetch_add(n, Ordering::SeqCst);
    }

    fn complete_activity(&self, summary: &str) {
        *self.completed.lock() = Some(summary.to_string());
    }

    fn report_error(&self, _error: &LinkpostError) -> bool {
        self.tally.lock().record()
    }

    fn report_warning(&self, code: &str, message: &str) -> bool {
        self.warnings.lock().push(format!("{code} {message}"));
        true
    }

    fn max_errors_reached(&self) -> bool {
        self.tally.lock().exhausted()
    }

    fn start_byte_activity(&self, summary: &str, expected_bytes: Option<u64>) {
        *self.download.lock() = Some((summary.to_string(), expected_bytes));
    }

    fn increment_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::SeqCst);
    }

    fn complete_byte_activity(&self) {
        self.downloads_completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl PublishOption for CountingReporter {
    fn progress_reporter(self: Arc<Self>) -> Option<Arc<dyn ProgressReporter>> {
        Some(self)
    }
}
