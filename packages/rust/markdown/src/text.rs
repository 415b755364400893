//! Title and slug text transforms.

/// Remove a trailing ` | Site Name` suffix from a title.
///
/// Only the last ` | ` separator counts, so a bare `|` inside a word is
/// kept. Titles without a separator, or with nothing before it, are
/// returned unchanged.
pub fn remove_piped_suffix(title: &str) -> String {
    match title.rsplit_once(" | ") {
        Some((head, _suffix)) if !head.trim().is_empty() => head.trim_end().to_string(),
        _ => title.to_string(),
    }
}

/// Lower-case `text` and turn every run of whitespace or punctuation into one hyphen.
///
/// The result never starts or ends with a hyphen and contains no whitespace
/// or upper-case letters.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piped_suffix_removed() {
        assert_eq!(remove_piped_suffix("Fearless Concurrency | The Rust Blog"), "Fearless Concurrency");
        assert_eq!(remove_piped_suffix("A | B | C"), "A | B");
    }

    #[test]
    fn title_without_pipe_unchanged() {
        assert_eq!(remove_piped_suffix("Plain Title"), "Plain Title");
        assert_eq!(remove_piped_suffix("| Only Suffix"), "| Only Suffix");
        assert_eq!(remove_piped_suffix("  Plain Title "), "  Plain Title ");
        assert_eq!(remove_piped_suffix(" | Only Suffix"), " | Only Suffix");
    }

    #[test]
    fn bare_pipe_is_not_a_separator() {
        assert_eq!(remove_piped_suffix("AT&T|Verizon"), "AT&T|Verizon");
        assert_eq!(remove_piped_suffix("a|b | Site"), "a|b");
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("nytimes-Why Rust?  It's Fast!"), "nytimes-why-rust-it-s-fast");
        assert_eq!(slugify("  --Hello, World--  "), "hello-world");
    }

    #[test]
    fn slugify_is_idempotent() {
        let once = slugify("Blog.Rust-Lang - Announcing Rust 1.85");
        assert_eq!(slugify(&once), once);
        assert!(!once.chars().any(|c| c.is_whitespace() || c.is_uppercase()));
    }

    #[test]
    fn slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Ünïcode Straße"), "ünïcode-straße");
    }
}
