//! Persisting rendered content documents.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use linkpost_shared::{LinkpostError, Result};

use crate::config::PipelineConfig;
use crate::content::ContentDocument;

/// Names where a document is written.
pub trait WriterIndexer: Send + Sync {
    fn primary_key(&self, doc: &ContentDocument) -> String;
    fn target_path(&self, doc: &ContentDocument) -> PathBuf;
}

/// What a store did with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The target already held identical content.
    Unchanged,
}

/// Persists documents.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn write(
        &self,
        config: &PipelineConfig,
        indexer: &dyn WriterIndexer,
        doc: &ContentDocument,
    ) -> Result<WriteOutcome>;
}

/// Writes each document to the file the indexer names.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentStore for FileStore {
    #[instrument(skip_all, fields(slug = %doc.slug))]
    async fn write(
        &self,
        config: &PipelineConfig,
        indexer: &dyn WriterIndexer,
        doc: &ContentDocument,
    ) -> Result<WriteOutcome> {
        let rendered = doc.render(config).await?;
        let path = indexer.target_path(doc);

        if let Ok(existing) = tokio::fs::read(&path).await {
            if content_hash(&existing) == content_hash(rendered.as_bytes()) {
                debug!(path = %path.display(), "content unchanged; skipping write");
                return Ok(WriteOutcome::Unchanged);
            }
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LinkpostError::io(parent, e))?;
        }
        tokio::fs::write(&path, rendered.as_bytes())
            .await
            .map_err(|e| LinkpostError::io(&path, e))?;

        debug!(path = %path.display(), bytes = rendered.len(), "document written");
        Ok(WriteOutcome::Written)
    }
}

/// SHA-256 hex digest of a rendered document.
fn content_hash(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::capabilities::PublishOption;
    use crate::config::ExecutionMode;
    use crate::content::FrontMatter;
    use crate::testing::{FakeResolver, temp_base};

    fn doc(title: &str) -> ContentDocument {
        let mut fm = FrontMatter::new();
        fm.add("title", title);
        ContentDocument {
            slug: "example-post".into(),
            front_matter: fm,
            body: "Body text.\n".into(),
        }
    }

    #[tokio::test]
    async fn writes_then_skips_identical_content() {
        let (root, base) = temp_base();
        let options: Vec<Arc<dyn PublishOption>> = vec![];
        let config = PipelineConfig::resolve(
            ExecutionMode::Sequential,
            Arc::new(FakeResolver::default()),
            &base,
            &options,
        )
        .unwrap();
        let store = FileStore::new();

        let first = store.write(&config, &config, &doc("Example")).await.unwrap();
        assert_eq!(first, WriteOutcome::Written);
        let path = config.content_dir().join("example-post.md");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "---\ntitle: \"Example\"\n---\n\nBody text.\n");

        let second = store.write(&config, &config, &doc("Example")).await.unwrap();
        assert_eq!(second, WriteOutcome::Unchanged);

        let third = store.write(&config, &config, &doc("Changed")).await.unwrap();
        assert_eq!(third, WriteOutcome::Written);
        assert!(std::fs::read_to_string(&path).unwrap().contains("Changed"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = content_hash(b"abc");
        assert_eq!(h.len(), 64);
        assert!(h.starts_with("ba7816bf"));
    }
}
