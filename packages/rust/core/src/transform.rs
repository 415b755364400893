//! Turning one source record into one published document.

use tracing::{debug, instrument};

use linkpost_link::{DiscardReason, Traversal, simplified_hostname, simplified_hostname_without_tld};
use linkpost_markdown::{remove_piped_suffix, slugify};
use linkpost_shared::{LinkpostError, Result, SourceRecord};

use crate::config::PipelineConfig;
use crate::content::FrontMatter;
use crate::properties::{DownloadedResourceProperty, LinkScoresProperty, TagsProperty};
use crate::store::WriteOutcome;

/// Why a record produced no document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The link resolver discarded the record's link.
    Discarded(DiscardReason),
    /// The content factory declined to produce a document.
    Declined,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Discarded(reason) => write!(f, "link discarded: {reason}"),
            SkipReason::Declined => f.write_str("content factory declined"),
        }
    }
}

/// Result of transforming one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Published { slug: String, outcome: WriteOutcome },
    Skipped(SkipReason),
}

/// Build `<host without tld>-<name>` and slugify it.
pub fn derive_slug(final_url: &url::Url, name: &str) -> String {
    slugify(&format!("{}-{name}", simplified_hostname_without_tld(final_url)))
}

/// Traverse the record's link, assemble its front matter, and persist the document.
///
/// Failures are wrapped with the record's index. A discarded link or a
/// declined document is a skip, not an error.
#[instrument(skip_all, fields(index = index, link = %record.link))]
pub async fn transform_item(config: &PipelineConfig, record: &SourceRecord, index: usize) -> Result<ItemOutcome> {
    publish_record(config, record)
        .await
        .map_err(|e| LinkpostError::item(index, e))
}

async fn publish_record(config: &PipelineConfig, record: &SourceRecord) -> Result<ItemOutcome> {
    let traversed = match config.link_resolver().traverse(&record.link).await? {
        Traversal::Retain(link) => link,
        Traversal::Discard(reason) => {
            debug!(%reason, "link discarded");
            return Ok(ItemOutcome::Skipped(SkipReason::Discarded(reason)));
        }
    };
    let final_url = traversed.final_url()?.clone();

    let slug = derive_slug(&final_url, &record.name);

    let mut fm: FrontMatter = config.properties_factory().empty();
    fm.add("archetype", record.archetype.as_str());
    fm.add("title", remove_piped_suffix(&record.name));
    fm.add("description", record.description.as_str());
    fm.add("slug", slug.as_str());
    fm.add_parsed("date", &record.updated_at);
    fm.add("link", final_url.to_string());
    fm.add("untraversedLink", record.link.as_str());
    fm.add("linkBrand", simplified_hostname(&final_url));
    fm.add_property(TagsProperty::new("categories", &record.tags));
    if let Some(thumbnail) = record.thumbnail.as_deref().filter(|t| !t.trim().is_empty()) {
        fm.add_property(DownloadedResourceProperty::new("featuredImage", thumbnail, slug.as_str()));
    }
    let wants_scores = config.link_scorer().is_some()
        || config.test_limiter().is_some_and(|t| t.simulate_link_scores());
    if wants_scores {
        fm.add_property(LinkScoresProperty::new("linkScores", final_url.clone()));
    }

    let Some(doc) = config.content_factory().new_document(&slug, fm, &record.body)? else {
        debug!(%slug, "content factory declined document");
        return Ok(ItemOutcome::Skipped(SkipReason::Declined));
    };

    let outcome = config.store().write(config, config, &doc).await?;
    debug!(%slug, ?outcome, "item published");

    Ok(ItemOutcome::Published { slug, outcome })
}
