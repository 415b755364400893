//! Dropmark collection JSON → [`Collection`].

use serde::Deserialize;

use linkpost_shared::{Collection, LinkpostError, Result, SourceRecord};

/// Archetype given to items whose feed entry has no `type`.
const DEFAULT_ARCHETYPE: &str = "link";

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    tags: Vec<RawTag>,
}

#[derive(Debug, Deserialize)]
struct RawTag {
    name: String,
}

/// Parse a Dropmark collection document.
///
/// Items keep their feed order and are numbered from zero.
pub fn parse_collection(endpoint: &str, body: &str) -> Result<Collection> {
    let raw: RawCollection = serde_json::from_str(body)
        .map_err(|e| LinkpostError::parse(format!("invalid Dropmark collection: {e}")))?;

    let items = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| SourceRecord {
            index,
            name: item.name.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            description: item.description.unwrap_or_default(),
            updated_at: item.updated_at.unwrap_or_default(),
            tags: item.tags.into_iter().map(|t| t.name).collect(),
            thumbnail: item.thumbnail.filter(|t| !t.trim().is_empty()),
            body: item.content.unwrap_or_default(),
            archetype: item
                .kind
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| DEFAULT_ARCHETYPE.to_string()),
        })
        .collect();

    Ok(Collection {
        endpoint: endpoint.to_string(),
        name: raw.name,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "Reading list",
        "items": [
            {
                "name": "Fearless Concurrency | The Rust Blog",
                "link": "https://blog.rust-lang.org/2015/04/10/Fearless-Concurrency.html",
                "description": "Ownership and concurrency",
                "content": "<p>Notes</p>",
                "updated_at": "2019-03-10 17:45:02 UTC",
                "thumbnail": "https://cdn.example.com/thumb.png",
                "type": "link",
                "tags": [{"name": "rust"}, {"name": "concurrency"}]
            },
            {
                "name": "Untyped",
                "link": "https://example.com/",
                "thumbnail": ""
            }
        ]
    }"#;

    #[test]
    fn parses_items_in_order() {
        let coll = parse_collection("https://shah.dropmark.com/1.json", SAMPLE).unwrap();
        assert_eq!(coll.name.as_deref(), Some("Reading list"));
        assert_eq!(coll.len(), 2);
        assert_eq!(coll.items[0].index, 0);
        assert_eq!(coll.items[1].index, 1);
        assert_eq!(coll.items[0].tags, vec!["rust", "concurrency"]);
        assert_eq!(coll.items[0].body, "<p>Notes</p>");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let coll = parse_collection("e", SAMPLE).unwrap();
        let item = &coll.items[1];
        assert_eq!(item.archetype, "link");
        assert!(item.thumbnail.is_none());
        assert!(item.description.is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_collection("e", "{ not json").unwrap_err();
        assert!(err.to_string().contains("invalid Dropmark collection"));
    }
}
