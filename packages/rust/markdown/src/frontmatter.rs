//! YAML front matter values and rendering.
//!
//! Front matter is rendered by hand rather than through a YAML serializer so
//! that key order is exactly the insertion order and strings are always quoted.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// A front matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<FixedOffset>),
    List(Vec<String>),
    Map(Vec<(String, Value)>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Interpret a raw string as the most specific value it parses as.
///
/// Dates are tried first (RFC 3339, Dropmark's `YYYY-MM-DD HH:MM:SS UTC`,
/// the same with a numeric offset, and a bare date), then integers, floats,
/// and booleans. Anything else is kept as text.
pub fn parse_scalar(raw: &str) -> Value {
    let s = raw.trim();

    if let Some(date) = parse_date(s) {
        return Value::Date(date);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Integer(n);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Text(raw.to_string()),
    }
}

/// Parse the date formats seen in bookmark feeds.
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Some(naive) = s.strip_suffix(" UTC") {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S") {
            return Some(Utc.from_utc_datetime(&dt).fixed_offset());
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = d.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).fixed_offset());
    }
    None
}

/// Render ordered key/value pairs as a `---` delimited YAML block.
pub fn render_front_matter(entries: &[(String, Value)]) -> String {
    let mut out = String::from("---\n");
    render_map(&mut out, entries, 0);
    out.push_str("---\n");
    out
}

/// Join rendered front matter and a body into a complete document.
pub fn compose_document(entries: &[(String, Value)], body: &str) -> String {
    let front_matter = render_front_matter(entries);
    if body.is_empty() {
        front_matter
    } else {
        format!("{front_matter}\n{body}")
    }
}

fn render_map(out: &mut String, entries: &[(String, Value)], depth: usize) {
    let indent = "  ".repeat(depth);
    for (key, value) in entries {
        match value {
            Value::List(items) if items.is_empty() => {
                out.push_str(&format!("{indent}{key}: []\n"));
            }
            Value::List(items) => {
                out.push_str(&format!("{indent}{key}:\n"));
                for item in items {
                    out.push_str(&format!("{indent}  - {}\n", quote(item)));
                }
            }
            Value::Map(inner) if inner.is_empty() => {
                out.push_str(&format!("{indent}{key}: {{}}\n"));
            }
            Value::Map(inner) => {
                out.push_str(&format!("{indent}{key}:\n"));
                render_map(out, inner, depth + 1);
            }
            scalar => {
                out.push_str(&format!("{indent}{key}: {}\n", render_scalar(scalar)));
            }
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Text(s) => quote(s),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Date(d) => d.to_rfc3339(),
        Value::List(_) | Value::Map(_) => String::new(),
    }
}

/// Double-quote a YAML string, escaping backslashes, quotes and control characters.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: Value) -> (String, Value) {
        (key.to_string(), value)
    }

    #[test]
    fn scalars_parse_most_specific_first() {
        assert_eq!(parse_scalar("42"), Value::Integer(42));
        assert_eq!(parse_scalar("4.5"), Value::Float(4.5));
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("hello"), Value::Text("hello".into()));
        assert!(matches!(parse_scalar("2024-03-01 12:30:00 UTC"), Value::Date(_)));
        assert!(matches!(parse_scalar("2024-03-01T12:30:00+02:00"), Value::Date(_)));
        assert!(matches!(parse_scalar("2024-03-01"), Value::Date(_)));
    }

    #[test]
    fn dropmark_dates_are_utc() {
        let d = parse_date("2024-03-01 12:30:00 UTC").unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn renders_in_insertion_order() {
        let fm = render_front_matter(&[
            entry("title", "Zeta".into()),
            entry("archetype", "link".into()),
            entry("count", Value::Integer(3)),
        ]);
        assert_eq!(fm, "---\ntitle: \"Zeta\"\narchetype: \"link\"\ncount: 3\n---\n");
    }

    #[test]
    fn strings_are_escaped() {
        let fm = render_front_matter(&[entry("title", "Say \"hi\"\nnow".into())]);
        assert!(fm.contains(r#"title: "Say \"hi\"\nnow""#));
    }

    #[test]
    fn lists_and_maps() {
        let fm = render_front_matter(&[
            entry("categories", Value::List(vec!["rust".into(), "async".into()])),
            entry("none", Value::List(vec![])),
            entry(
                "linkScores",
                Value::Map(vec![entry("total", Value::Integer(7)), entry("simulated", Value::Bool(true))]),
            ),
        ]);
        assert!(fm.contains("categories:\n  - \"rust\"\n  - \"async\"\n"));
        assert!(fm.contains("none: []\n"));
        assert!(fm.contains("linkScores:\n  total: 7\n  simulated: true\n"));
    }

    #[test]
    fn document_joins_front_matter_and_body() {
        let doc = compose_document(&[entry("slug", "a".into())], "Body\n");
        assert_eq!(doc, "---\nslug: \"a\"\n---\n\nBody\n");
        assert_eq!(compose_document(&[], ""), "---\n---\n");
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(quote("a\u{1b}[31mb"), "\"a\\u001B[31mb\"");
        assert_eq!(quote("nul\0end"), "\"nul\\u0000end\"");
        assert_eq!(quote("del\u{7f}"), "\"del\\u007F\"");
        assert_eq!(quote("tab\there"), "\"tab\\there\"");
        assert!(!quote("bell\u{7}").chars().any(char::is_control));
    }
}
