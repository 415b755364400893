//! Capabilities an option value may offer to the pipeline resolver.
//!
//! [`PublishOption`] carries one accessor per capability. Every accessor answers
//! "not offered" by default; a type opts in by overriding the accessor, and a
//! single value may offer any number of capabilities at once.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use linkpost_link::{LinkScorer, SimulatedLinkScorer};
use linkpost_shared::{LinkpostError, Result};

use crate::content::{ContentFactory, DefaultPropertiesFactory, MarkdownContentFactory, PropertiesFactory};
use crate::report::{ProgressReporter, SilentProgress, SummaryProgress};
use crate::resource::{HttpResourceFactory, ResourceFactory};
use crate::store::{ContentStore, FileStore};

// ---------------------------------------------------------------------------
// Value capabilities
// ---------------------------------------------------------------------------

/// Overrides the content destination, relative to the base path.
pub trait ContentLocator {
    fn content_path(&self) -> String;
}

/// Overrides the image cache destination and its public reference URL.
pub trait ImagesLocator {
    fn image_download_path(&self) -> String;
    fn image_reference_url(&self) -> String;
}

/// Overrides the error budget. 0 means unlimited.
pub trait ErrorBudget {
    fn max_errors(&self) -> usize;
}

/// Constrains a run for testing.
pub trait TestLimiter: Send + Sync {
    /// Dispatch stops once a record's zero-based index exceeds this value.
    fn stop_after_index(&self) -> usize;

    /// Attach simulated link scores even when no scorer is configured.
    fn simulate_link_scores(&self) -> bool;
}

// ---------------------------------------------------------------------------
// PublishOption
// ---------------------------------------------------------------------------

/// An option value passed to [`PipelineConfig::resolve`](crate::PipelineConfig::resolve).
pub trait PublishOption: Send + Sync {
    fn as_content_locator(&self) -> Option<&dyn ContentLocator> {
        None
    }

    fn as_images_locator(&self) -> Option<&dyn ImagesLocator> {
        None
    }

    fn as_error_budget(&self) -> Option<&dyn ErrorBudget> {
        None
    }

    fn progress_reporter(self: Arc<Self>) -> Option<Arc<dyn ProgressReporter>> {
        None
    }

    fn content_factory(self: Arc<Self>) -> Option<Arc<dyn ContentFactory>> {
        None
    }

    fn content_store(self: Arc<Self>) -> Option<Arc<dyn ContentStore>> {
        None
    }

    fn properties_factory(self: Arc<Self>) -> Option<Arc<dyn PropertiesFactory>> {
        None
    }

    fn resource_factory(self: Arc<Self>) -> Option<Arc<dyn ResourceFactory>> {
        None
    }

    fn link_scorer(self: Arc<Self>) -> Option<Arc<dyn LinkScorer>> {
        None
    }

    fn test_limiter(self: Arc<Self>) -> Option<Arc<dyn TestLimiter>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Single-capability option values
// ---------------------------------------------------------------------------

/// Content destination relative to the base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath(pub String);

impl ContentLocator for ContentPath {
    fn content_path(&self) -> String {
        self.0.clone()
    }
}

impl PublishOption for ContentPath {
    fn as_content_locator(&self) -> Option<&dyn ContentLocator> {
        Some(self)
    }
}

/// Image cache destination and the URL prefix pages use to reference it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePaths {
    pub download_path: String,
    pub reference_url: String,
}

impl ImagesLocator for ImagePaths {
    fn image_download_path(&self) -> String {
        self.download_path.clone()
    }

    fn image_reference_url(&self) -> String {
        self.reference_url.clone()
    }
}

impl PublishOption for ImagePaths {
    fn as_images_locator(&self) -> Option<&dyn ImagesLocator> {
        Some(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxErrors(pub usize);

impl ErrorBudget for MaxErrors {
    fn max_errors(&self) -> usize {
        self.0
    }
}

impl PublishOption for MaxErrors {
    fn as_error_budget(&self) -> Option<&dyn ErrorBudget> {
        Some(self)
    }
}

/// Caps a run at indices `0..=last_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestLimit {
    pub last_index: usize,
    pub simulate_scores: bool,
}

impl TestLimiter for TestLimit {
    fn stop_after_index(&self) -> usize {
        self.last_index
    }

    fn simulate_link_scores(&self) -> bool {
        self.simulate_scores
    }
}

impl PublishOption for TestLimit {
    fn test_limiter(self: Arc<Self>) -> Option<Arc<dyn TestLimiter>> {
        Some(self)
    }
}

// Built-in collaborators offer themselves as options.

impl PublishOption for SilentProgress {
    fn progress_reporter(self: Arc<Self>) -> Option<Arc<dyn ProgressReporter>> {
        Some(self)
    }
}

impl PublishOption for SummaryProgress {
    fn progress_reporter(self: Arc<Self>) -> Option<Arc<dyn ProgressReporter>> {
        Some(self)
    }
}

impl PublishOption for MarkdownContentFactory {
    fn content_factory(self: Arc<Self>) -> Option<Arc<dyn ContentFactory>> {
        Some(self)
    }
}

impl PublishOption for DefaultPropertiesFactory {
    fn properties_factory(self: Arc<Self>) -> Option<Arc<dyn PropertiesFactory>> {
        Some(self)
    }
}

impl PublishOption for FileStore {
    fn content_store(self: Arc<Self>) -> Option<Arc<dyn ContentStore>> {
        Some(self)
    }
}

impl PublishOption for HttpResourceFactory {
    fn resource_factory(self: Arc<Self>) -> Option<Arc<dyn ResourceFactory>> {
        Some(self)
    }
}

impl PublishOption for SimulatedLinkScorer {
    fn link_scorer(self: Arc<Self>) -> Option<Arc<dyn LinkScorer>> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// BasePath
// ---------------------------------------------------------------------------

/// Root directory that content and image destinations are composed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath {
    root: PathBuf,
}

impl BasePath {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `relative` onto the root and create the resulting directory.
    ///
    /// Absolute paths and paths with `..` components are rejected, as is a
    /// root that exists but is not a directory.
    pub fn compose_path(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        if rel.is_absolute() || rel.has_root() {
            return Err(LinkpostError::config(format!(
                "destination {relative:?} must be relative to {}",
                self.root.display()
            )));
        }
        if rel.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(LinkpostError::config(format!(
                "destination {relative:?} escapes {}",
                self.root.display()
            )));
        }
        if self.root.exists() && !self.root.is_dir() {
            return Err(LinkpostError::config(format!(
                "base path {} is not a directory",
                self.root.display()
            )));
        }

        let dir = self.root.join(rel);
        std::fs::create_dir_all(&dir).map_err(|e| {
            LinkpostError::config(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("linkpost-{tag}-{}", Uuid::now_v7()))
    }

    #[test]
    fn compose_creates_nested_dirs() {
        let root = temp_root("compose");
        let base = BasePath::new(&root);
        let dir = base.compose_path("content/post").unwrap();
        assert_eq!(dir, root.join("content/post"));
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn compose_rejects_escapes() {
        let base = BasePath::new(temp_root("escape"));
        assert!(matches!(base.compose_path("../outside"), Err(LinkpostError::Config { .. })));
        assert!(matches!(base.compose_path("/etc/linkpost"), Err(LinkpostError::Config { .. })));
    }

    #[test]
    fn compose_rejects_file_root() {
        let root = temp_root("file-root");
        std::fs::write(&root, b"not a dir").unwrap();
        let base = BasePath::new(&root);
        assert!(matches!(base.compose_path("content"), Err(LinkpostError::Config { .. })));
        let _ = std::fs::remove_file(&root);
    }

    #[test]
    fn one_value_may_offer_several_capabilities() {
        struct Everything;
        impl ErrorBudget for Everything {
            fn max_errors(&self) -> usize {
                3
            }
        }
        impl ContentLocator for Everything {
            fn content_path(&self) -> String {
                "content/links".into()
            }
        }
        impl PublishOption for Everything {
            fn as_error_budget(&self) -> Option<&dyn ErrorBudget> {
                Some(self)
            }
            fn as_content_locator(&self) -> Option<&dyn ContentLocator> {
                Some(self)
            }
        }

        let opt: Arc<dyn PublishOption> = Arc::new(Everything);
        assert_eq!(opt.as_error_budget().map(|b| b.max_errors()), Some(3));
        assert_eq!(opt.as_content_locator().map(|c| c.content_path()).as_deref(), Some("content/links"));
        assert!(opt.as_images_locator().is_none());
        assert!(opt.clone().progress_reporter().is_none());
    }

    #[test]
    fn service_accessors_return_self() {
        let opt: Arc<dyn PublishOption> = Arc::new(SilentProgress);
        assert!(opt.clone().progress_reporter().is_some());
        assert!(opt.clone().content_store().is_none());

        let opt: Arc<dyn PublishOption> = Arc::new(TestLimit {
            last_index: 4,
            simulate_scores: true,
        });
        let limiter = opt.test_limiter().unwrap();
        assert_eq!(limiter.stop_after_index(), 4);
        assert!(limiter.simulate_link_scores());
    }
}
