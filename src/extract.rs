// src/extract.rs
// =============================================================================
// This module extracts same-domain links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Is tolerant: broken markup still parses, we just find fewer links
// - Supports CSS selectors for finding elements
//
// And the `url` crate to:
// - Resolve relative, protocol-relative and fragment-only references
// - Compare each link's host against the crawl domain
//
// Links are normalized by dropping the fragment, so "/page#a" and "/page#b"
// are the same page as far as the crawler is concerned.
// =============================================================================

use std::collections::BTreeSet;
use std::sync::OnceLock;

use scraper::{Html, Selector};
use url::Url;

// Every element that carries a navigable hyperlink
const LINK_SELECTOR: &str = "a[href], area[href]";

fn link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    // The selector is a constant and known to be valid
    SELECTOR.get_or_init(|| Selector::parse(LINK_SELECTOR).expect("valid link selector"))
}

// Extracts links that stay inside one domain
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    domain: String,
}

impl LinkExtractor {
    // `domain` is compared against each link's authority (see `authority`)
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    // Returns the unique, absolute, same-domain http(s) links of a page
    //
    // Example:
    //   html = "<a href='/docs'>Docs</a><a href='https://other.test/'>x</a>"
    //   page_url = "https://ex.test/page"
    //   result = {"https://ex.test/docs"}
    pub fn extract_links(&self, html: &str, page_url: &Url) -> BTreeSet<Url> {
        let document = Html::parse_document(html);

        document
            .select(link_selector())
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(page_url, href))
            .filter(|link| self.is_same_domain(link))
            .collect()
    }

    fn is_same_domain(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && authority(url).as_deref() == Some(self.domain.as_str())
    }
}

// Host plus explicit port, e.g. "ex.test" or "127.0.0.1:8080"
//
// Returns None for URLs without a host (mailto:, data:, ...)
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

// Puts a URL into the form stored in the visited set and in results
pub fn normalize(url: &mut Url) {
    url.set_fragment(None);
}

// Resolves a (possibly relative) href against the page it appears on
//
// Examples, with base = "https://ex.test/page/":
//   "/docs"            -> https://ex.test/docs
//   "../other"         -> https://ex.test/other
//   "//ex.test/x"      -> https://ex.test/x
//   "#section"         -> https://ex.test/page/ (the page itself)
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    normalize(&mut resolved);
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    fn links(extractor: &LinkExtractor, html: &str, page_url: &str) -> Vec<String> {
        extractor
            .extract_links(html, &page(page_url))
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_duplicates_collapse_and_other_hosts_dropped() {
        let html = r#"
            <a href="/a">A</a>
            <a href="/a">A again</a>
            <a href="https://other.test/x">Elsewhere</a>
        "#;
        let extractor = LinkExtractor::new("ex.test");
        assert_eq!(
            links(&extractor, html, "https://ex.test/"),
            vec!["https://ex.test/a"]
        );
    }

    #[test]
    fn test_resolves_relative_and_protocol_relative() {
        let html = r#"
            <a href="../about">About</a>
            <a href="//ex.test/docs">Docs</a>
            <a href="https://ex.test/abs">Abs</a>
        "#;
        let extractor = LinkExtractor::new("ex.test");
        assert_eq!(
            links(&extractor, html, "https://ex.test/page/sub"),
            vec![
                "https://ex.test/about",
                "https://ex.test/abs",
                "https://ex.test/docs",
            ]
        );
    }

    #[test]
    fn test_fragment_only_resolves_to_page_itself() {
        let html = r##"<a href="#section">Jump</a>"##;
        let extractor = LinkExtractor::new("ex.test");
        assert_eq!(
            links(&extractor, html, "https://ex.test/page"),
            vec!["https://ex.test/page"]
        );
    }

    #[test]
    fn test_skips_mailto_and_javascript() {
        let html = r#"
            <a href="mailto:test@ex.test">Email</a>
            <a href="javascript:void(0)">Nothing</a>
            <a href="">Empty</a>
        "#;
        let extractor = LinkExtractor::new("ex.test");
        assert!(links(&extractor, html, "https://ex.test/").is_empty());
    }

    #[test]
    fn test_area_elements_count_as_links() {
        let html = r#"<map><area href="/region" alt="r"></map>"#;
        let extractor = LinkExtractor::new("ex.test");
        assert_eq!(
            links(&extractor, html, "https://ex.test/"),
            vec!["https://ex.test/region"]
        );
    }

    #[test]
    fn test_port_is_part_of_the_domain() {
        let html = r#"
            <a href="http://127.0.0.1:9000/same">Same</a>
            <a href="http://127.0.0.1:9001/other">Other port</a>
        "#;
        let extractor = LinkExtractor::new("127.0.0.1:9000");
        assert_eq!(
            links(&extractor, html, "http://127.0.0.1:9000/"),
            vec!["http://127.0.0.1:9000/same"]
        );
    }

    #[test]
    fn test_malformed_html_does_not_fail() {
        let html = "<html><body><a href='/ok'>ok<div><<<a href=";
        let extractor = LinkExtractor::new("ex.test");
        let found = links(&extractor, html, "https://ex.test/");
        assert!(found.iter().all(|l| l.starts_with("https://ex.test/")));
        assert!(links(&extractor, "", "https://ex.test/").is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = r#"<a href="/b">b</a><a href="/a">a</a><a href="/b#x">b</a>"#;
        let extractor = LinkExtractor::new("ex.test");
        let base = page("https://ex.test/");
        assert_eq!(
            extractor.extract_links(html, &base),
            extractor.extract_links(html, &base)
        );
    }
}
