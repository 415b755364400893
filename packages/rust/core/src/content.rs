//! Front matter model, content documents, and the factories that create them.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use linkpost_markdown::{Value, compose_document, convert_body, parse_scalar};
use linkpost_shared::Result;

use crate::config::PipelineConfig;

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// A front matter value that is computed when the document is written.
///
/// Returning `None` omits the key from the rendered front matter.
#[async_trait]
pub trait Property: Send + Sync {
    fn key(&self) -> &str;

    async fn render(&self, config: &PipelineConfig) -> Result<Option<Value>>;
}

/// One front matter entry: a ready value or a deferred property.
pub enum Entry {
    Value(Value),
    Property(Box<dyn Property>),
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Entry::Property(p) => f.debug_tuple("Property").field(&p.key()).finish(),
        }
    }
}

/// Ordered front matter for one document.
///
/// Adding a key that already exists replaces its entry in place.
#[derive(Debug, Default)]
pub struct FrontMatter {
    entries: Vec<(String, Entry)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(key, Entry::Value(value.into()));
    }

    /// Add `raw` as the most specific scalar it parses as (date, number, bool, text).
    pub fn add_parsed(&mut self, key: &str, raw: &str) {
        self.insert(key, Entry::Value(parse_scalar(raw)));
    }

    pub fn add_property(&mut self, property: impl Property + 'static) {
        let key = property.key().to_string();
        self.insert(&key, Entry::Property(Box::new(property)));
    }

    fn insert(&mut self, key: &str, entry: Entry) {
        match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => self.entries[pos].1 = entry,
            None => self.entries.push((key.to_string(), entry)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    /// The text stored under `key`, if it is a plain text value.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Entry::Value(Value::Text(s))) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every deferred property, in order.
    pub async fn render(&self, config: &PipelineConfig) -> Result<Vec<(String, Value)>> {
        let mut rendered = Vec::with_capacity(self.entries.len());
        for (key, entry) in &self.entries {
            match entry {
                Entry::Value(v) => rendered.push((key.clone(), v.clone())),
                Entry::Property(p) => {
                    if let Some(v) = p.render(config).await? {
                        rendered.push((key.clone(), v));
                    }
                }
            }
        }
        Ok(rendered)
    }
}

/// Creates empty front matter sets.
pub trait PropertiesFactory: Send + Sync {
    fn empty(&self) -> FrontMatter;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPropertiesFactory;

impl PropertiesFactory for DefaultPropertiesFactory {
    fn empty(&self) -> FrontMatter {
        FrontMatter::new()
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// One output document: slug, front matter, and Markdown body.
#[derive(Debug)]
pub struct ContentDocument {
    pub slug: String,
    pub front_matter: FrontMatter,
    pub body: String,
}

impl ContentDocument {
    /// Render the complete Markdown file, resolving deferred properties.
    pub async fn render(&self, config: &PipelineConfig) -> Result<String> {
        let entries = self.front_matter.render(config).await?;
        Ok(compose_document(&entries, &self.body))
    }
}

/// Builds documents from assembled front matter.
pub trait ContentFactory: Send + Sync {
    /// `Ok(None)` means the factory declined to produce a document.
    fn new_document(&self, slug: &str, front_matter: FrontMatter, body: &str) -> Result<Option<ContentDocument>>;

    fn properties_factory(&self) -> Arc<dyn PropertiesFactory>;
}

/// Produces Markdown documents, converting HTML bodies.
///
/// Declines records whose slug is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownContentFactory;

impl ContentFactory for MarkdownContentFactory {
    fn new_document(&self, slug: &str, front_matter: FrontMatter, body: &str) -> Result<Option<ContentDocument>> {
        if slug.is_empty() {
            debug!("empty slug; declining document");
            return Ok(None);
        }

        let base_url = front_matter.text("link").and_then(|l| Url::parse(l).ok());
        let body = convert_body(body, base_url.as_ref())?;

        Ok(Some(ContentDocument {
            slug: slug.to_string(),
            front_matter,
            body,
        }))
    }

    fn properties_factory(&self) -> Arc<dyn PropertiesFactory> {
        Arc::new(DefaultPropertiesFactory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_insertion_order_and_replaces_in_place() {
        let mut fm = FrontMatter::new();
        fm.add("title", "One");
        fm.add("slug", "one");
        fm.add("title", "Two");
        assert_eq!(fm.keys().collect::<Vec<_>>(), vec!["title", "slug"]);
        assert_eq!(fm.text("title"), Some("Two"));
    }

    #[test]
    fn add_parsed_detects_dates() {
        let mut fm = FrontMatter::new();
        fm.add_parsed("date", "2023-11-02 08:15:00 UTC");
        fm.add_parsed("count", "12");
        assert!(matches!(fm.get("date"), Some(Entry::Value(Value::Date(_)))));
        assert!(matches!(fm.get("count"), Some(Entry::Value(Value::Integer(12)))));
    }

    #[test]
    fn factory_declines_empty_slug() {
        let doc = MarkdownContentFactory
            .new_document("", FrontMatter::new(), "body")
            .unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn factory_resolves_body_links_against_link() {
        let mut fm = FrontMatter::new();
        fm.add("link", "https://example.com/articles/a");
        let doc = MarkdownContentFactory
            .new_document("example-a", fm, "<p>See <a href=\"b\">B</a></p>")
            .unwrap()
            .unwrap();
        assert_eq!(doc.slug, "example-a");
        assert!(doc.body.contains("[B](https://example.com/articles/b)"));
    }
}
