//! Deferred front matter properties rendered at write time.

use async_trait::async_trait;
use tracing::warn;
use url::Url;

use linkpost_link::{LinkScorer, SimulatedLinkScorer};
use linkpost_markdown::Value;
use linkpost_shared::Result;

use crate::config::PipelineConfig;
use crate::content::Property;

/// The record's tags as a list.
#[derive(Debug, Clone)]
pub struct TagsProperty {
    key: String,
    tags: Vec<String>,
}

impl TagsProperty {
    pub fn new(key: impl Into<String>, tags: &[String]) -> Self {
        let tags = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Self { key: key.into(), tags }
    }
}

#[async_trait]
impl Property for TagsProperty {
    fn key(&self) -> &str {
        &self.key
    }

    async fn render(&self, _config: &PipelineConfig) -> Result<Option<Value>> {
        Ok(Some(Value::List(self.tags.clone())))
    }
}

/// A remote image cached under the configured image directory.
///
/// Renders the public URL of the cached copy. When the download fails a
/// warning is reported and the remote URL is used instead.
#[derive(Debug, Clone)]
pub struct DownloadedResourceProperty {
    key: String,
    remote: String,
    base_name: String,
}

impl DownloadedResourceProperty {
    pub fn new(key: impl Into<String>, remote: impl Into<String>, base_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            remote: remote.into(),
            base_name: base_name.into(),
        }
    }
}

#[async_trait]
impl Property for DownloadedResourceProperty {
    fn key(&self) -> &str {
        &self.key
    }

    async fn render(&self, config: &PipelineConfig) -> Result<Option<Value>> {
        if self.remote.trim().is_empty() {
            return Ok(None);
        }

        let downloaded = config
            .resource_factory()
            .download(
                &self.remote,
                config.image_dir(),
                &self.base_name,
                config.image_reference_url(),
            )
            .await;

        match downloaded {
            Ok(resource) => Ok(Some(Value::Text(resource.public_url))),
            Err(e) => {
                warn!(remote = %self.remote, error = %e, "image download failed; keeping remote URL");
                config
                    .reporter()
                    .report_warning("IMAGE_DOWNLOAD", &format!("{}: {e}", self.remote));
                Ok(Some(Value::Text(self.remote.clone())))
            }
        }
    }
}

/// Share counts for the final link, from the configured scorer.
///
/// Falls back to simulated scores when the test limiter asks for them and
/// no scorer is configured. Omitted when neither applies or scoring fails.
#[derive(Debug, Clone)]
pub struct LinkScoresProperty {
    key: String,
    url: Url,
}

impl LinkScoresProperty {
    pub fn new(key: impl Into<String>, url: Url) -> Self {
        Self { key: key.into(), url }
    }
}

#[async_trait]
impl Property for LinkScoresProperty {
    fn key(&self) -> &str {
        &self.key
    }

    async fn render(&self, config: &PipelineConfig) -> Result<Option<Value>> {
        let scored = match config.link_scorer() {
            Some(scorer) => scorer.score(&self.url).await,
            None if config.test_limiter().is_some_and(|t| t.simulate_link_scores()) => {
                SimulatedLinkScorer.score(&self.url).await
            }
            None => return Ok(None),
        };

        let (scores, simulated) = match scored {
            Ok(s) => s,
            Err(e) => {
                warn!(url = %self.url, error = %e, "link scoring failed");
                config
                    .reporter()
                    .report_warning("LINK_SCORE", &format!("{}: {e}", self.url));
                return Ok(None);
            }
        };

        let as_int = |n: u64| Value::Integer(i64::try_from(n).unwrap_or(i64::MAX));
        Ok(Some(Value::Map(vec![
            ("facebook".to_string(), as_int(scores.facebook_shares)),
            ("linkedin".to_string(), as_int(scores.linkedin_shares)),
            ("pinterest".to_string(), as_int(scores.pinterest_pins)),
            ("total".to_string(), as_int(scores.total())),
            ("simulated".to_string(), Value::Bool(simulated)),
        ])))
    }
}
