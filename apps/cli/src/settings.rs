//! Merging `publish` flags with the config file into pipeline option values.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};

use linkpost_core::{
    ContentLocator, ErrorBudget, ExecutionMode, ImagesLocator, ItemErrorPolicy, PublishOption, SilentProgress,
    SummaryProgress, TestLimiter,
};
use linkpost_link::SimulatedLinkScorer;
use linkpost_shared::{AppConfig, LinkpostError, Result};

use crate::progress::DisplayProgress;

/// Progress reporter selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReporterKind {
    Silent,
    Summary,
    Display,
}

/// Flags for `linkpost publish`.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct PublishArgs {
    /// Dropmark collection API endpoint (`https://<user>.dropmark.com/<id>.json`).
    pub endpoint: String,

    /// Site root that content and image paths are composed against.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Content destination relative to the site root.
    #[arg(long)]
    pub content_path: Option<String>,

    /// Image cache destination relative to the site root.
    #[arg(long, requires = "image_url")]
    pub image_path: Option<String>,

    /// URL prefix pages use to reference cached images.
    #[arg(long, requires = "image_path")]
    pub image_url: Option<String>,

    /// Maximum tolerated reported errors (0 = unlimited).
    #[arg(long)]
    pub max_errors: Option<usize>,

    /// Publish one item at a time.
    #[arg(long, conflicts_with = "concurrency")]
    pub sequential: bool,

    /// Worker ceiling for concurrent publishing.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Stop once the item index exceeds N (items 0..=N are published).
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Attach simulated link scores to every document.
    #[arg(long)]
    pub simulate_scores: bool,

    /// Forward per-item failures to the reporter and honour the error budget.
    #[arg(long)]
    pub report_item_errors: bool,

    /// Progress reporter.
    #[arg(long, value_enum)]
    pub reporter: Option<ReporterKind>,
}

/// Effective publish settings: flags over config file over defaults.
///
/// Offers the content locator, error budget, and (when set) images locator
/// and test limiter capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PublishSettings {
    pub base_dir: PathBuf,
    pub content_path: String,
    pub images: Option<(String, String)>,
    pub max_errors: usize,
    pub mode: ExecutionMode,
    pub reporter: ReporterKind,
    pub limit: Option<usize>,
    pub simulate_scores: bool,
    pub item_errors: ItemErrorPolicy,
}

impl PublishSettings {
    pub(crate) fn merge(args: &PublishArgs, config: &AppConfig) -> Result<Self> {
        let defaults = &config.defaults;

        let mode = if args.sequential {
            ExecutionMode::Sequential
        } else if let Some(workers) = args.concurrency {
            ExecutionMode::concurrent(workers)
        } else {
            match defaults.mode.as_str() {
                "sequential" => ExecutionMode::Sequential,
                "concurrent" => ExecutionMode::concurrent(defaults.concurrency),
                other => {
                    return Err(LinkpostError::config(format!(
                        "unknown mode {other:?}: expected \"sequential\" or \"concurrent\""
                    )));
                }
            }
        };

        let reporter = match args.reporter {
            Some(kind) => kind,
            None => ReporterKind::from_str(&defaults.reporter, true).map_err(|_| {
                LinkpostError::config(format!(
                    "unknown reporter {:?}: expected silent, summary, or display",
                    defaults.reporter
                ))
            })?,
        };

        let images = match (&args.image_path, &args.image_url) {
            (Some(path), Some(url)) => Some((path.clone(), url.clone())),
            _ => None,
        };

        Ok(Self {
            base_dir: args
                .base_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&defaults.base_dir)),
            content_path: args
                .content_path
                .clone()
                .unwrap_or_else(|| defaults.content_path.clone()),
            images,
            max_errors: args.max_errors.unwrap_or(defaults.max_errors),
            mode,
            reporter,
            limit: args.limit,
            simulate_scores: args.simulate_scores,
            item_errors: if args.report_item_errors {
                ItemErrorPolicy::Report
            } else {
                ItemErrorPolicy::Discard
            },
        })
    }

    /// Option values for the pipeline resolver.
    pub(crate) fn options(self: &Arc<Self>) -> Vec<Arc<dyn PublishOption>> {
        let reporter: Arc<dyn PublishOption> = match self.reporter {
            ReporterKind::Silent => Arc::new(SilentProgress),
            ReporterKind::Summary => Arc::new(SummaryProgress::new("", self.max_errors)),
            ReporterKind::Display => Arc::new(DisplayProgress::new("", self.max_errors)),
        };
        let mut options: Vec<Arc<dyn PublishOption>> = vec![self.clone(), reporter];

        // Without a test limit there is nothing to carry the flag, so use the scorer directly.
        if self.simulate_scores && self.limit.is_none() {
            options.push(Arc::new(SimulatedLinkScorer));
        }

        options
    }
}

impl ContentLocator for PublishSettings {
    fn content_path(&self) -> String {
        self.content_path.clone()
    }
}

impl ImagesLocator for PublishSettings {
    fn image_download_path(&self) -> String {
        self.images.as_ref().map(|(path, _)| path.clone()).unwrap_or_default()
    }

    fn image_reference_url(&self) -> String {
        self.images.as_ref().map(|(_, url)| url.clone()).unwrap_or_default()
    }
}

impl ErrorBudget for PublishSettings {
    fn max_errors(&self) -> usize {
        self.max_errors
    }
}

impl TestLimiter for PublishSettings {
    fn stop_after_index(&self) -> usize {
        self.limit.unwrap_or(usize::MAX)
    }

    fn simulate_link_scores(&self) -> bool {
        self.simulate_scores
    }
}

impl PublishOption for PublishSettings {
    fn as_content_locator(&self) -> Option<&dyn ContentLocator> {
        Some(self)
    }

    fn as_images_locator(&self) -> Option<&dyn ImagesLocator> {
        self.images.as_ref().map(|_| self as &dyn ImagesLocator)
    }

    fn as_error_budget(&self) -> Option<&dyn ErrorBudget> {
        Some(self)
    }

    fn test_limiter(self: Arc<Self>) -> Option<Arc<dyn TestLimiter>> {
        if self.limit.is_some() {
            Some(self)
        } else {
            None
        }
    }
}
