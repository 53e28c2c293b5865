//! HTML parser for extracting links and the page title
//!
//! Only `<a href>` anchors are followed. Every href is resolved against the
//! page URL, normalized, run through the [`LinkFilter`], and deduplicated in
//! document order.

use crate::url::{resolve_link, LinkFilter};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A candidate link and the page it was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub url: Url,
    pub source: String,
}

/// Title of an HTML document, trimmed; `None` when missing or blank
pub fn page_title(html: &str) -> Option<String> {
    extract_title(&Html::parse_document(html))
}

/// Extracts, filters and deduplicates the candidate links of a page
///
/// # Arguments
///
/// * `html` - The page HTML
/// * `page_url` - The page's own URL, used as resolution base and as source
/// * `filter` - Link policy relative to the crawl root
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` with a non-empty href
///
/// **Exclude:**
/// - `javascript:` hrefs
/// - Anything that does not resolve to an HTTP(S) URL with a host
/// - Anything the filter rejects
///
/// # Returns
///
/// Each accepted URL exactly once, in the order it first appeared.
///
/// # Example
///
/// ```
/// use site_crawl_engine::crawler::collect_candidates;
/// use site_crawl_engine::url::LinkFilter;
/// use site_crawl_engine::CrawlConfig;
/// use url::Url;
///
/// let root = Url::parse("https://example.com/").unwrap();
/// let filter = LinkFilter::new(root.clone(), &CrawlConfig::default());
/// let html = r#"<a href="/">Home</a><a href="/page/">Page</a><a href="/page">Again</a>"#;
/// let records = collect_candidates(html, &root, &filter);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].url.as_str(), "https://example.com/page");
/// ```
pub fn collect_candidates(html: &str, page_url: &Url, filter: &LinkFilter) -> Vec<LinkRecord> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for url in extract_links(&document, page_url) {
        if let Err(reason) = filter.check(&url) {
            tracing::trace!("Dropping {} ({:?})", url, reason);
            continue;
        }
        if seen.insert(url.as_str().to_string()) {
            records.push(LinkRecord {
                url,
                source: page_url.to_string(),
            });
        }
    }

    tracing::debug!(
        "Found {} candidate links on {}",
        records.len(),
        page_url
    );
    records
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all valid anchor links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| {
            let href = href.trim();
            if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
                return None;
            }
            resolve_link(href, base_url).ok()
        })
        .collect()
}
