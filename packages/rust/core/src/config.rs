//! Pipeline configuration, resolved from option values.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use linkpost_link::{LinkResolver, LinkScorer};
use linkpost_shared::{DEFAULT_CONTENT_PATH, DEFAULT_MAX_ERRORS, Result};

use crate::capabilities::{BasePath, PublishOption, TestLimiter};
use crate::content::{ContentDocument, ContentFactory, MarkdownContentFactory, PropertiesFactory};
use crate::report::{ProgressReporter, SummaryProgress};
use crate::resource::{HttpResourceFactory, ResourceFactory};
use crate::store::{ContentStore, FileStore, WriterIndexer};

/// Prefix under `static/` for cached images, and the matching URL root.
const IMAGE_PATH_PREFIX: &str = "img";

/// How records are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One record at a time, in collection order.
    Sequential,
    /// A pool of at most `workers` concurrent units of work.
    Concurrent { workers: usize },
}

impl ExecutionMode {
    /// A concurrent mode with at least one worker.
    pub fn concurrent(workers: usize) -> Self {
        ExecutionMode::Concurrent {
            workers: workers.max(1),
        }
    }
}

/// Fully resolved, immutable configuration for one publish run.
pub struct PipelineConfig {
    mode: ExecutionMode,
    content_dir: PathBuf,
    image_dir: PathBuf,
    image_reference_url: String,
    max_errors: usize,
    link_resolver: Arc<dyn LinkResolver>,
    reporter: Arc<dyn ProgressReporter>,
    content_factory: Arc<dyn ContentFactory>,
    properties_factory: Arc<dyn PropertiesFactory>,
    store: Arc<dyn ContentStore>,
    resource_factory: Arc<dyn ResourceFactory>,
    link_scorer: Option<Arc<dyn LinkScorer>>,
    test_limiter: Option<Arc<dyn TestLimiter>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("mode", &self.mode)
            .field("content_dir", &self.content_dir)
            .field("image_dir", &self.image_dir)
            .field("image_reference_url", &self.image_reference_url)
            .field("max_errors", &self.max_errors)
            .field("link_scorer", &self.link_scorer.is_some())
            .field("test_limiter", &self.test_limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineConfig {
    /// Build a configuration by probing every option against every capability.
    ///
    /// For each capability the last option offering it wins. Capabilities no
    /// option offers fall back to defaults. Fails with a config error when a
    /// destination cannot be composed under `base`.
    pub fn resolve(
        mode: ExecutionMode,
        link_resolver: Arc<dyn LinkResolver>,
        base: &BasePath,
        options: &[Arc<dyn PublishOption>],
    ) -> Result<Self> {
        let mut content_path = None;
        let mut images = None;
        let mut max_errors = None;
        let mut reporter = None;
        let mut content_factory = None;
        let mut store = None;
        let mut properties_factory = None;
        let mut resource_factory = None;
        let mut link_scorer = None;
        let mut test_limiter = None;

        for option in options {
            if let Some(locator) = option.as_content_locator() {
                content_path = Some(locator.content_path());
            }
            if let Some(locator) = option.as_images_locator() {
                images = Some((locator.image_download_path(), locator.image_reference_url()));
            }
            if let Some(budget) = option.as_error_budget() {
                max_errors = Some(budget.max_errors());
            }
            if let Some(r) = option.clone().progress_reporter() {
                reporter = Some(r);
            }
            if let Some(f) = option.clone().content_factory() {
                content_factory = Some(f);
            }
            if let Some(s) = option.clone().content_store() {
                store = Some(s);
            }
            if let Some(f) = option.clone().properties_factory() {
                properties_factory = Some(f);
            }
            if let Some(f) = option.clone().resource_factory() {
                resource_factory = Some(f);
            }
            if let Some(s) = option.clone().link_scorer() {
                link_scorer = Some(s);
            }
            if let Some(t) = option.clone().test_limiter() {
                test_limiter = Some(t);
            }
        }

        let content_path = content_path.unwrap_or_else(|| DEFAULT_CONTENT_PATH.to_string());
        let content_dir = base.compose_path(&content_path)?;

        // The image cache defaults to the default content path's mirror, even
        // when the content path itself was overridden.
        let (image_path, image_reference_url) = images.unwrap_or_else(|| {
            (
                format!("static/{IMAGE_PATH_PREFIX}/{DEFAULT_CONTENT_PATH}"),
                format!("/{IMAGE_PATH_PREFIX}/{DEFAULT_CONTENT_PATH}"),
            )
        });
        let image_dir = base.compose_path(&image_path)?;

        let max_errors = max_errors.unwrap_or(DEFAULT_MAX_ERRORS);
        let reporter: Arc<dyn ProgressReporter> =
            reporter.unwrap_or_else(|| Arc::new(SummaryProgress::new("", max_errors)));
        let content_factory: Arc<dyn ContentFactory> =
            content_factory.unwrap_or_else(|| Arc::new(MarkdownContentFactory));
        let properties_factory =
            properties_factory.unwrap_or_else(|| content_factory.properties_factory());
        let store: Arc<dyn ContentStore> = store.unwrap_or_else(|| Arc::new(FileStore::new()));
        let resource_factory: Arc<dyn ResourceFactory> = match resource_factory {
            Some(f) => f,
            None => Arc::new(HttpResourceFactory::new()?),
        };

        debug!(
            content_dir = %content_dir.display(),
            image_dir = %image_dir.display(),
            %image_reference_url,
            max_errors,
            ?mode,
            "pipeline configuration resolved"
        );

        Ok(Self {
            mode,
            content_dir,
            image_dir,
            image_reference_url,
            max_errors,
            link_resolver,
            reporter,
            content_factory,
            properties_factory,
            store,
            resource_factory,
            link_scorer,
            test_limiter,
        })
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// URL prefix under which cached images are published.
    pub fn image_reference_url(&self) -> &str {
        &self.image_reference_url
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    pub fn link_resolver(&self) -> &Arc<dyn LinkResolver> {
        &self.link_resolver
    }

    pub fn reporter(&self) -> &Arc<dyn ProgressReporter> {
        &self.reporter
    }

    pub fn content_factory(&self) -> &Arc<dyn ContentFactory> {
        &self.content_factory
    }

    pub fn properties_factory(&self) -> &Arc<dyn PropertiesFactory> {
        &self.properties_factory
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn resource_factory(&self) -> &Arc<dyn ResourceFactory> {
        &self.resource_factory
    }

    pub fn link_scorer(&self) -> Option<&Arc<dyn LinkScorer>> {
        self.link_scorer.as_ref()
    }

    pub fn test_limiter(&self) -> Option<&Arc<dyn TestLimiter>> {
        self.test_limiter.as_ref()
    }
}

impl WriterIndexer for PipelineConfig {
    fn primary_key(&self, doc: &ContentDocument) -> String {
        doc.slug.clone()
    }

    fn target_path(&self, doc: &ContentDocument) -> PathBuf {
        self.content_dir.join(format!("{}.md", self.primary_key(doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{ContentPath, ImagePaths, MaxErrors, TestLimit};
    use crate::content::FrontMatter;
    use crate::report::SilentProgress;
    use crate::testing::{FakeResolver, temp_base};
    use linkpost_link::SimulatedLinkScorer;
    use linkpost_shared::LinkpostError;

    fn resolve(options: &[Arc<dyn PublishOption>]) -> (PathBuf, Result<PipelineConfig>) {
        let (root, base) = temp_base();
        let config = PipelineConfig::resolve(
            ExecutionMode::Sequential,
            Arc::new(FakeResolver::default()),
            &base,
            options,
        );
        (root, config)
    }

    #[test]
    fn defaults_apply_without_options() {
        let (root, config) = resolve(&[]);
        let config = config.unwrap();
        assert_eq!(config.content_dir(), root.join("content/post"));
        assert_eq!(config.image_dir(), root.join("static/img/content/post"));
        assert_eq!(config.image_reference_url(), "/img/content/post");
        assert_eq!(config.max_errors(), DEFAULT_MAX_ERRORS);
        assert!(config.link_scorer().is_none());
        assert!(config.test_limiter().is_none());
        assert!(config.content_dir().is_dir());
        assert!(config.image_dir().is_dir());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn later_error_budget_wins() {
        let (root, config) = resolve(&[Arc::new(MaxErrors(3)), Arc::new(MaxErrors(7))]);
        assert_eq!(config.unwrap().max_errors(), 7);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn overrides_are_applied() {
        let (root, config) = resolve(&[
            Arc::new(ContentPath("content/links".into())),
            Arc::new(ImagePaths {
                download_path: "static/thumbs".into(),
                reference_url: "https://cdn.example.com/thumbs".into(),
            }),
            Arc::new(SilentProgress),
            Arc::new(SimulatedLinkScorer),
            Arc::new(TestLimit {
                last_index: 2,
                simulate_scores: false,
            }),
        ]);
        let config = config.unwrap();
        assert_eq!(config.content_dir(), root.join("content/links"));
        assert_eq!(config.image_dir(), root.join("static/thumbs"));
        assert_eq!(config.image_reference_url(), "https://cdn.example.com/thumbs");
        assert!(config.link_scorer().is_some());
        assert_eq!(config.test_limiter().map(|t| t.stop_after_index()), Some(2));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn image_default_ignores_content_override() {
        let (root, config) = resolve(&[Arc::new(ContentPath("content/links".into()))]);
        let config = config.unwrap();
        assert_eq!(config.content_dir(), root.join("content/links"));
        assert_eq!(config.image_dir(), root.join("static/img/content/post"));
        assert_eq!(config.image_reference_url(), "/img/content/post");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn bad_content_path_is_config_error() {
        let (_root, config) = resolve(&[Arc::new(ContentPath("../escape".into()))]);
        assert!(matches!(config, Err(LinkpostError::Config { .. })));
    }

    #[test]
    fn indexer_targets_slug_file_in_content_dir() {
        let (root, config) = resolve(&[]);
        let config = config.unwrap();
        let doc = ContentDocument {
            slug: "rust-lang-announcing".into(),
            front_matter: FrontMatter::new(),
            body: String::new(),
        };
        assert_eq!(config.primary_key(&doc), "rust-lang-announcing");
        assert_eq!(
            config.target_path(&doc),
            root.join("content/post/rust-lang-announcing.md")
        );
        let _ = std::fs::remove_dir_all(&root);
    }
}
