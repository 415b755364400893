//! HTTP link traversal.
//!
//! The resolver decides whether a bookmarked link is worth keeping, follows
//! redirects (including one HTML meta-refresh hop), and reports the final URL.

use std::net::IpAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use linkpost_shared::{LinkpostError, LinksConfig, Result};

/// User-Agent string for traversal requests.
const USER_AGENT: &str = concat!("linkpost/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Traversal results
// ---------------------------------------------------------------------------

/// Why a link was dropped without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Not an http(s) link.
    UnsupportedScheme(String),
    /// Loopback, private, or otherwise internal target.
    PrivateTarget,
    /// Matched a configured ignore pattern.
    Ignored(String),
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported scheme {scheme:?}"),
            Self::PrivateTarget => write!(f, "private or local target"),
            Self::Ignored(pattern) => write!(f, "matches ignore pattern {pattern:?}"),
        }
    }
}

/// A link that survived traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversedLink {
    original: String,
    final_url: Option<Url>,
}

impl TraversedLink {
    pub fn new(original: impl Into<String>, final_url: Option<Url>) -> Self {
        Self {
            original: original.into(),
            final_url,
        }
    }

    /// The link as it was bookmarked.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The canonical, redirect-terminal URL.
    pub fn final_url(&self) -> Result<&Url> {
        self.final_url.as_ref().ok_or_else(|| {
            LinkpostError::Link(format!("no final URL resolved for {}", self.original))
        })
    }
}

/// Retain/discard decision for one link.
#[derive(Debug, Clone, PartialEq)]
pub enum Traversal {
    Retain(TraversedLink),
    Discard(DiscardReason),
}

impl Traversal {
    pub fn is_retained(&self) -> bool {
        matches!(self, Self::Retain(_))
    }
}

/// Resolves raw bookmarked links.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn traverse(&self, raw: &str) -> Result<Traversal>;
}

// ---------------------------------------------------------------------------
// HttpLinkResolver
// ---------------------------------------------------------------------------

/// Runtime link traversal options, usually built from `[links]` config.
#[derive(Debug, Clone)]
pub struct LinkOptions {
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub ignore_patterns: Vec<String>,
    pub strip_tracking_params: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self::from(&LinksConfig::default())
    }
}

impl From<&LinksConfig> for LinkOptions {
    fn from(config: &LinksConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            max_redirects: config.max_redirects,
            ignore_patterns: config.ignore_patterns.clone(),
            strip_tracking_params: config.strip_tracking_params,
        }
    }
}

/// Traverses links over HTTP.
pub struct HttpLinkResolver {
    client: Client,
    ignore: Vec<Regex>,
    strip_tracking_params: bool,
    /// Hosts exempt from the private-target rule (mock servers in tests).
    trusted_hosts: Arc<Vec<String>>,
}

impl HttpLinkResolver {
    /// Create a resolver; fails if an ignore pattern is not a valid regex.
    pub fn new(opts: &LinkOptions) -> Result<Self> {
        Self::build(opts, Vec::new())
    }

    /// A resolver that treats `host` as public (for integration tests).
    #[cfg(test)]
    fn trusting(opts: &LinkOptions, host: &str) -> Result<Self> {
        Self::build(opts, vec![host.to_string()])
    }

    fn build(opts: &LinkOptions, trusted_hosts: Vec<String>) -> Result<Self> {
        let trusted_hosts = Arc::new(trusted_hosts);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy(opts.max_redirects, trusted_hosts.clone()))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| LinkpostError::Network(format!("failed to build HTTP client: {e}")))?;

        let ignore = opts
            .ignore_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    LinkpostError::config(format!("invalid link ignore pattern {p:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            client,
            ignore,
            strip_tracking_params: opts.strip_tracking_params,
            trusted_hosts,
        })
    }

    /// Pre-flight checks that need no network access.
    fn screen(&self, url: &Url) -> Option<DiscardReason> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Some(DiscardReason::UnsupportedScheme(other.to_string())),
        }

        if let Some(pattern) = self.ignore.iter().find(|re| re.is_match(url.as_str())) {
            return Some(DiscardReason::Ignored(pattern.as_str().to_string()));
        }

        if is_untrusted_private(url, &self.trusted_hosts) {
            return Some(DiscardReason::PrivateTarget);
        }

        None
    }

    /// GET `url`, returning the redirect-terminal URL and an HTML body if any.
    ///
    /// A redirect the policy refused to follow ends the walk: its `Location`
    /// becomes the terminal URL, unrequested.
    async fn fetch(&self, url: &Url) -> Result<(Url, Option<String>)> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| LinkpostError::Link(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| response.url().join(loc).ok())
                .ok_or_else(|| LinkpostError::Link(format!("{url}: HTTP {status} without a usable Location")))?;
            return Ok((location, None));
        }
        if !status.is_success() {
            return Err(LinkpostError::Link(format!("{url}: HTTP {status}")));
        }

        let terminal = response.url().clone();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html"));

        if !is_html {
            return Ok((terminal, None));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LinkpostError::Link(format!("{url}: body read failed: {e}")))?;
        Ok((terminal, Some(body)))
    }
}

#[async_trait]
impl LinkResolver for HttpLinkResolver {
    #[instrument(skip(self))]
    async fn traverse(&self, raw: &str) -> Result<Traversal> {
        let url = Url::parse(raw.trim())
            .map_err(|e| LinkpostError::Link(format!("unparsable link {raw:?}: {e}")))?;

        if let Some(reason) = self.screen(&url) {
            debug!(%url, %reason, "discarding link");
            return Ok(Traversal::Discard(reason));
        }

        let (mut terminal, body) = self.fetch(&url).await?;
        if is_untrusted_private(&terminal, &self.trusted_hosts) {
            debug!(%url, %terminal, "redirected to a private target, discarding link");
            return Ok(Traversal::Discard(DiscardReason::PrivateTarget));
        }

        if let Some(target) = body.as_deref().and_then(|b| meta_refresh_target(b, &terminal)) {
            if is_untrusted_private(&target, &self.trusted_hosts) {
                debug!(%url, %target, "meta refresh points at a private target, discarding link");
                return Ok(Traversal::Discard(DiscardReason::PrivateTarget));
            }
            debug!(from = %terminal, to = %target, "following meta refresh");
            terminal = match self.fetch(&target).await {
                Ok((resolved, _)) if is_untrusted_private(&resolved, &self.trusted_hosts) => {
                    return Ok(Traversal::Discard(DiscardReason::PrivateTarget));
                }
                Ok((resolved, _)) => resolved,
                Err(e) => {
                    warn!(%target, error = %e, "meta refresh target unreachable, keeping it as final");
                    target
                }
            };
        }

        if self.strip_tracking_params {
            terminal = strip_tracking_params(&terminal);
        }

        Ok(Traversal::Retain(TraversedLink::new(raw, Some(terminal))))
    }
}

// ---------------------------------------------------------------------------
// HTML helpers
// ---------------------------------------------------------------------------

/// Find a `<meta http-equiv="refresh" content="0; url=...">` target.
fn meta_refresh_target(html: &str, base: &Url) -> Option<Url> {
    static META_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("meta[http-equiv]").expect("valid selector"));
    static URL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?i)url\s*=\s*['"]?([^'"\s]+)"#).expect("valid regex"));

    let doc = Html::parse_document(html);
    let content = doc.select(&META_SEL).find_map(|el| {
        let equiv = el.value().attr("http-equiv")?;
        if equiv.eq_ignore_ascii_case("refresh") {
            el.value().attr("content")
        } else {
            None
        }
    })?;

    let href = URL_RE.captures(content)?.get(1)?.as_str();
    base.join(href).ok()
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// Remove `utm_*` query parameters, dropping the query entirely if it empties.
pub fn strip_tracking_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// Follow up to `max` redirects, stopping short of any untrusted private host.
fn redirect_policy(max: usize, trusted_hosts: Arc<Vec<String>>) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max {
            attempt.error(format!("too many redirects (max {max})"))
        } else if is_untrusted_private(attempt.url(), &trusted_hosts) {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

fn is_untrusted_private(url: &Url, trusted_hosts: &[String]) -> bool {
    let trusted = url
        .host_str()
        .is_some_and(|host| trusted_hosts.iter().any(|t| t == host));
    !trusted && is_private_target(url)
}

/// Check if a URL targets a loopback, private, or local-only host.
fn is_private_target(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
