//! Hostname simplification used for slugs and link "brands".

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// `www.`, `www2.`, `www03.` style prefixes.
static WWW_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^www\d*\.").expect("valid regex"));

/// Host without any `www`-style prefix, e.g. `www.nytimes.com` → `nytimes.com`.
///
/// Returns an empty string for URLs without a host.
pub fn simplified_hostname(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    WWW_PREFIX_RE.replace(&host, "").into_owned()
}

/// Simplified host with the top-level domain dropped, e.g. `www.nytimes.com` → `nytimes`.
///
/// Only the last label is removed, so `news.bbc.co.uk` becomes `news.bbc.co`.
pub fn simplified_hostname_without_tld(url: &Url) -> String {
    let host = simplified_hostname(url);
    match host.rsplit_once('.') {
        Some((rest, _tld)) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}
