//! Markdown helpers for published link posts.
//!
//! Converts bookmark bodies (often HTML snippets) to Markdown using the `htmd`
//! crate, runs a series of cleanup passes, and renders YAML front matter.

mod cleanup;
pub mod frontmatter;
pub mod text;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use linkpost_shared::{LinkpostError, Result};

pub use frontmatter::{Value, compose_document, parse_date, parse_scalar, render_front_matter};
pub use text::{remove_piped_suffix, slugify};

// ---------------------------------------------------------------------------
// Body conversion
// ---------------------------------------------------------------------------

/// Convert a bookmark body to clean Markdown.
///
/// Bodies that look like HTML go through `htmd` first; plain text and
/// Markdown bodies only get the cleanup passes. Relative links are resolved
/// against `base_url` when one is given.
#[instrument(skip(body), fields(len = body.len()))]
pub fn convert_body(body: &str, base_url: Option<&Url>) -> Result<String> {
    if body.trim().is_empty() {
        return Ok(String::new());
    }

    let markdown = if looks_like_html(body) {
        let html = preprocess_tables(body);
        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
            .build();
        let converted = converter
            .convert(&html)
            .map_err(|e| LinkpostError::Conversion(format!("htmd conversion failed: {e}")))?;
        debug!(raw_len = converted.len(), "htmd conversion complete");
        converted
    } else {
        body.to_string()
    };

    Ok(cleanup::run_pipeline(&markdown, base_url))
}

/// Whether `body` contains block or inline HTML tags.
fn looks_like_html(body: &str) -> bool {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)<(?:p|div|br|a|ul|ol|li|h[1-6]|em|strong|b|i|img|table|blockquote|pre|code|span)\b[^>]*>")
            .expect("valid regex")
    });
    TAG_RE.is_match(body)
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Replace HTML `<table>` elements with Markdown tables before `htmd` runs.
fn preprocess_tables(html: &str) -> String {
    let Ok(table_sel) = Selector::parse("table") else {
        return html.to_string();
    };
    let doc = Html::parse_fragment(html);
    if doc.select(&table_sel).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table in doc.select(&table_sel) {
        result = result.replacen(&table.html(), &table_to_markdown(&table), 1);
    }
    result
}

fn table_to_markdown(table: &ElementRef) -> String {
    let (Ok(tr_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return String::new();
    };

    let mut rows: Vec<Vec<String>> = table
        .select(&tr_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().replace('|', "\\|"))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if cols == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(cols, String::new());
    }

    let mut md = String::from("\n\n");
    let mut push_row = |cells: &[String]| {
        md.push_str("| ");
        md.push_str(&cells.join(" | "));
        md.push_str(" |\n");
    };
    push_row(&rows[0]);
    push_row(&vec!["---".to_string(); cols]);
    for row in &rows[1..] {
        push_row(row);
    }
    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
