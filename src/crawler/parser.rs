//! HTML parser for extracting links from directory listings

use crate::url::bad_anchor;
use scraper::{Html, Selector};
use url::Url;

/// Extracts the links a directory listing points at
///
/// # Link Extraction Rules
///
/// - every `<a href>` in document order
/// - anchors rejected by [`bad_anchor`] are skipped (parent directory, sort
///   links, fragments, absolute-root paths)
/// - the rest are resolved against `base_url`
/// - links that leave the base origin (scheme, host and port) are dropped
/// - duplicates are kept
///
/// # Arguments
///
/// * `base_url` - The final URL of the listing, after redirects
/// * `html` - The HTML content of the listing
///
/// # Returns
///
/// Absolute URLs in the order they appear on the page
///
/// # Example
///
/// ```
/// use opendir_dl::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<a href="../">Parent</a><a href="file.txt">file.txt</a>"#;
/// let base_url = Url::parse("http://example.com/pub/").unwrap();
/// assert_eq!(parse_links(&base_url, html), vec!["http://example.com/pub/file.txt"]);
/// ```
pub fn parse_links(base_url: &Url, html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves one href, returning None if it must not be followed
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if bad_anchor(href) {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;

    if absolute_url.origin() != base_url.origin() {
        return None;
    }

    Some(absolute_url.to_string())
}
