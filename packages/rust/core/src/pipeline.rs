//! Publish orchestration: endpoint → collection → per-item transform → report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, mpsc};
use tracing::{info, instrument, warn};

use linkpost_feed::{FetchProgress, SourceFeed};
use linkpost_shared::{LinkpostError, Result, RunId, SourceRecord};

use crate::config::{ExecutionMode, PipelineConfig};
use crate::report::ProgressReporter;
use crate::transform::{ItemOutcome, transform_item};

/// What happens to a failed item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemErrorPolicy {
    /// Log the failure and carry on. The reporter never sees it.
    #[default]
    Discard,
    /// Forward the failure to the reporter and stop dispatching once its
    /// error budget is exhausted.
    Report,
}

/// Terminal status of one visited item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Published,
    Skipped,
    Failed,
}

/// Summary of a publish run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub run_id: RunId,
    pub endpoint: String,
    /// Records in the fetched collection.
    pub total: usize,
    /// Records dispatched and completed.
    pub visited: usize,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Indices in the order their work completed.
    pub completion_order: Vec<usize>,
    pub elapsed: Duration,
}

impl PublishReport {
    fn new(endpoint: &str, total: usize) -> Self {
        Self {
            run_id: RunId::new(),
            endpoint: endpoint.to_string(),
            total,
            visited: 0,
            published: 0,
            skipped: 0,
            failed: 0,
            completion_order: Vec::with_capacity(total),
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, index: usize, status: ItemStatus) {
        self.visited += 1;
        self.completion_order.push(index);
        match status {
            ItemStatus::Published => self.published += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
        }
    }
}

/// Forwards collection download bytes to the run's reporter.
struct DownloadProgress<'a>(&'a dyn ProgressReporter);

impl FetchProgress for DownloadProgress<'_> {
    fn start_download(&self, summary: &str, expected_bytes: Option<u64>) {
        self.0.start_byte_activity(summary, expected_bytes);
    }

    fn advance(&self, bytes: u64) {
        self.0.increment_bytes(bytes);
    }

    fn finish_download(&self) {
        self.0.complete_byte_activity();
    }
}

/// A finished unit of work.
#[derive(Debug)]
struct Completion {
    index: usize,
    status: ItemStatus,
}

/// Publishes a source collection as content documents.
pub struct Publisher {
    config: Arc<PipelineConfig>,
    feed: Arc<dyn SourceFeed>,
    item_errors: ItemErrorPolicy,
}

impl Publisher {
    pub fn new(config: PipelineConfig, feed: Arc<dyn SourceFeed>) -> Self {
        Self {
            config: Arc::new(config),
            feed,
            item_errors: ItemErrorPolicy::default(),
        }
    }

    pub fn with_item_error_policy(mut self, policy: ItemErrorPolicy) -> Self {
        self.item_errors = policy;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline against `endpoint`.
    ///
    /// Only an invalid endpoint or a failed fetch is an error. Per-item
    /// failures are handled by the [`ItemErrorPolicy`] and counted in the report.
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn publish(&self, endpoint: &str) -> Result<PublishReport> {
        let start = Instant::now();

        self.feed.validate_endpoint(endpoint)?;
        let reporter = self.config.reporter().clone();
        let collection = self
            .feed
            .fetch(endpoint, &DownloadProgress(reporter.as_ref()))
            .await
            .map_err(|e| LinkpostError::fetch(endpoint, e))?;

        let total = collection.len();
        let mut report = PublishReport::new(&collection.endpoint, total);
        info!(run_id = %report.run_id, total, mode = ?self.config.mode(), "starting publish run");

        reporter.start_activity(
            &format!("Publishing {total} Dropmark links from {:?}", collection.endpoint),
            total,
        );

        let ceiling = self.config.test_limiter().map(|t| t.stop_after_index());
        match self.config.mode() {
            ExecutionMode::Sequential => {
                self.run_sequential(collection.items, ceiling, &mut report).await;
            }
            ExecutionMode::Concurrent { workers } => {
                self.run_concurrent(collection.items, ceiling, workers, &mut report)
                    .await;
            }
        }

        reporter.complete_activity(&format!(
            "Published {total} Dropmark links from {:?}",
            collection.endpoint
        ));

        report.elapsed = start.elapsed();
        info!(
            run_id = %report.run_id,
            visited = report.visited,
            published = report.published,
            skipped = report.skipped,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "publish run complete"
        );
        Ok(report)
    }

    async fn run_sequential(&self, records: Vec<SourceRecord>, ceiling: Option<usize>, report: &mut PublishReport) {
        let reporter = self.config.reporter();
        for (index, record) in records.iter().enumerate() {
            if ceiling.is_some_and(|last| index > last) {
                break;
            }
            if should_stop(&self.config, self.item_errors) {
                break;
            }

            let status = run_item(&self.config, record, index, self.item_errors).await;
            reporter.increment();
            report.record(index, status);
        }
    }

    /// Bounded fan-out: a dispatcher walks the records in order, holding one
    /// semaphore permit per in-flight unit; completions arrive on a channel
    /// that closes once the dispatcher and every unit have finished.
    async fn run_concurrent(
        &self,
        records: Vec<SourceRecord>,
        ceiling: Option<usize>,
        workers: usize,
        report: &mut PublishReport,
    ) {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let config = self.config.clone();
        let policy = self.item_errors;

        let dispatcher = tokio::spawn(async move {
            for (index, record) in records.into_iter().enumerate() {
                if ceiling.is_some_and(|last| index > last) {
                    break;
                }
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                if should_stop(&config, policy) {
                    break;
                }

                let config = config.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let status = run_item(&config, &record, index, policy).await;
                    // The receiver outlives every unit; a send error means the run was abandoned.
                    let _ = tx.send(Completion { index, status });
                });
            }
        });

        let reporter = self.config.reporter();
        while let Some(done) = rx.recv().await {
            reporter.increment();
            report.record(done.index, done.status);
        }

        if let Err(e) = dispatcher.await {
            warn!(error = %e, "dispatcher task failed");
        }
    }
}

/// Under [`ItemErrorPolicy::Report`], stop dispatching once the budget is spent.
fn should_stop(config: &PipelineConfig, policy: ItemErrorPolicy) -> bool {
    if policy == ItemErrorPolicy::Report && config.reporter().max_errors_reached() {
        warn!(max_errors = config.max_errors(), "error budget exhausted; stopping dispatch");
        return true;
    }
    false
}

async fn run_item(config: &PipelineConfig, record: &SourceRecord, index: usize, policy: ItemErrorPolicy) -> ItemStatus {
    match transform_item(config, record, index).await {
        Ok(ItemOutcome::Published { .. }) => ItemStatus::Published,
        Ok(ItemOutcome::Skipped(reason)) => {
            info!(index, %reason, "item skipped");
            ItemStatus::Skipped
        }
        Err(e) => {
            match policy {
                ItemErrorPolicy::Discard => warn!(index, error = %e, "item failed"),
                ItemErrorPolicy::Report => {
                    config.reporter().report_error(&e);
                }
            }
            ItemStatus::Failed
        }
    }
}
