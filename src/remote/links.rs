// SPDX-License-Identifier: MPL-2.0

//! Link detection and preview resolution for post text.
//!
//! Only the first URL in a post gets a preview. Resolution is pluggable:
//! [`StaticPreviewResolver`] answers from fixed strings and never touches the
//! network, [`HttpPreviewResolver`] reads Open Graph tags from the page.

use crate::config::{LINK_FETCH_TIMEOUT, USER_AGENT};
use crate::remote::LinkPreview;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub const WIKIPEDIA_TITLE: &str = "Wikipedia - The Free Encyclopedia";
pub const WIKIPEDIA_DESCRIPTION: &str =
    "Wikipedia is a free online encyclopedia, created and edited by volunteers around the world.";
pub const WIKIPEDIA_IMAGE: &str =
    "https://upload.wikimedia.org/wikipedia/commons/6/63/Wikipedia-logo.png";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>\[\]\{}|\\^`\x00-\x1f\x7f]+").unwrap());

/// Trim trailing punctuation that is likely sentence-ending, not part of the URL.
fn trim_url_trailing(url: &str) -> &str {
    url.trim_end_matches(|c| matches!(c, '.' | ',' | ';' | '!' | '?' | ')'))
}

/// First http(s) URL in `text`, if any.
pub fn extract_first_url(text: &str) -> Option<&str> {
    URL_RE
        .find(text)
        .map(|m| trim_url_trailing(m.as_str()))
        .filter(|u| Url::parse(u).is_ok())
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

fn is_wikipedia(host: &str) -> bool {
    host == "wikipedia.org" || host.ends_with(".wikipedia.org")
}

#[async_trait]
pub trait LinkPreviewResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Option<LinkPreview>;
}

/// Offline resolver: a fixed card for Wikipedia, a host-only card otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPreviewResolver;

impl StaticPreviewResolver {
    pub fn preview(url: &str) -> Option<LinkPreview> {
        let host = host_of(url)?;
        if is_wikipedia(&host) {
            return Some(LinkPreview {
                url: url.to_string(),
                title: WIKIPEDIA_TITLE.to_string(),
                description: WIKIPEDIA_DESCRIPTION.to_string(),
                image: Some(WIKIPEDIA_IMAGE.to_string()),
            });
        }

        Some(LinkPreview {
            url: url.to_string(),
            title: host,
            description: String::new(),
            image: None,
        })
    }
}

#[async_trait]
impl LinkPreviewResolver for StaticPreviewResolver {
    async fn resolve(&self, url: &str) -> Option<LinkPreview> {
        Self::preview(url)
    }
}

// ─── Open Graph metadata fetching ───

static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+(?:property|name)="og:title"\s+content="([^"]*)"#).unwrap()
});

static OG_DESC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+(?:property|name)="og:description"\s+content="([^"]*)"#).unwrap()
});

static OG_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+(?:property|name)="og:image"\s+content="([^"]*)"#).unwrap()
});

// Reversed attribute order (content before property)
static OG_TITLE_RE2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+content="([^"]*)"\s+(?:property|name)="og:title""#).unwrap()
});

static OG_DESC_RE2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+content="([^"]*)"\s+(?:property|name)="og:description""#).unwrap()
});

static OG_IMAGE_RE2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+content="([^"]*)"\s+(?:property|name)="og:image""#).unwrap()
});

static HTML_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title[^>]*>([^<]*)</title>").unwrap());

fn capture(html: &str, primary: &Regex, reversed: &Regex) -> Option<String> {
    primary
        .captures(html)
        .or_else(|| reversed.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| html_decode(m.as_str()))
}

/// Pull a preview card out of a fetched HTML page.
pub fn parse_open_graph(url: &str, html: &str) -> LinkPreview {
    let title = capture(html, &OG_TITLE_RE, &OG_TITLE_RE2)
        .or_else(|| {
            HTML_TITLE_RE
                .captures(html)
                .and_then(|c| c.get(1))
                .map(|m| html_decode(m.as_str().trim()))
        })
        .filter(|t| !t.is_empty())
        .or_else(|| host_of(url))
        .unwrap_or_default();

    LinkPreview {
        url: url.to_string(),
        title,
        description: capture(html, &OG_DESC_RE, &OG_DESC_RE2).unwrap_or_default(),
        image: capture(html, &OG_IMAGE_RE, &OG_IMAGE_RE2),
    }
}

/// Basic HTML entity decoding for OG metadata values.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
}

/// Fetches the page and reads its Open Graph tags. Wikipedia links keep
/// the fixed card so they render the same online and offline.
pub struct HttpPreviewResolver {
    client: reqwest::Client,
}

impl HttpPreviewResolver {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(LINK_FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<LinkPreview, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let final_url = response.url().to_string();
        let html = response.text().await?;
        Ok(parse_open_graph(&final_url, &html))
    }
}

#[async_trait]
impl LinkPreviewResolver for HttpPreviewResolver {
    async fn resolve(&self, url: &str) -> Option<LinkPreview> {
        if host_of(url).is_some_and(|h| is_wikipedia(&h)) {
            return StaticPreviewResolver::preview(url);
        }

        match self.fetch(url).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                tracing::debug!(url, error = %e, "link preview fetch failed");
                StaticPreviewResolver::preview(url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_has_no_url() {
        assert_eq!(extract_first_url("Hello world, no links here"), None);
    }

    #[test]
    fn test_extracts_url_mid_sentence() {
        assert_eq!(
            extract_first_url("Check https://wikipedia.org/x out"),
            Some("https://wikipedia.org/x")
        );
    }

    #[test]
    fn test_only_first_url_is_used() {
        assert_eq!(
            extract_first_url("a http://one.example/a then https://two.example/b"),
            Some("http://one.example/a")
        );
    }

    #[test]
    fn test_trailing_punctuation_trimmed() {
        assert_eq!(
            extract_first_url("Visit https://example.com."),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_wikipedia_gets_fixed_title() {
        let url = extract_first_url("Check https://wikipedia.org/x out").unwrap();
        let preview = StaticPreviewResolver.resolve(url).await.unwrap();
        assert_eq!(preview.url, "https://wikipedia.org/x");
        assert_eq!(preview.title, WIKIPEDIA_TITLE);
        assert_eq!(preview.image.as_deref(), Some(WIKIPEDIA_IMAGE));
    }

    #[tokio::test]
    async fn test_language_subdomain_counts_as_wikipedia() {
        let preview = StaticPreviewResolver
            .resolve("https://en.wikipedia.org/wiki/Rust")
            .await
            .unwrap();
        assert_eq!(preview.title, WIKIPEDIA_TITLE);
    }

    #[tokio::test]
    async fn test_other_hosts_use_bare_host() {
        let preview = StaticPreviewResolver
            .resolve("https://www.example.org/page")
            .await
            .unwrap();
        assert_eq!(preview.title, "example.org");
        assert!(preview.image.is_none());
    }

    #[test]
    fn test_open_graph_parsing_both_orders() {
        let html = r#"<html><head>
            <meta property="og:title" content="Free books &amp; more">
            <meta content="Pick up today" name="og:description">
            <meta property="og:image" content="https://img.example/a.png">
            </head></html>"#;
        let preview = parse_open_graph("https://example.com", html);
        assert_eq!(preview.title, "Free books & more");
        assert_eq!(preview.description, "Pick up today");
        assert_eq!(preview.image.as_deref(), Some("https://img.example/a.png"));
    }

    #[test]
    fn test_open_graph_falls_back_to_title_tag_then_host() {
        let preview = parse_open_graph("https://example.com/a", "<title> Plain </title>");
        assert_eq!(preview.title, "Plain");

        let preview = parse_open_graph("https://example.com/a", "<p>nothing</p>");
        assert_eq!(preview.title, "example.com");
    }
}
