/// Anchors generated by autoindex servers that must never be followed
const STATIC_ANCHORS: &[&str] = &[
    "../",
    "/",
    "?C=N;O=D",
    "?C=M;O=A",
    "?C=S;O=A",
    "?C=D;O=A",
];

/// Determines whether an anchor on a directory listing should be skipped
///
/// Skipped anchors:
/// - the parent directory (`../`) and the site root (`/`)
/// - column sort links and any other query-only link (`?C=N;O=D`)
/// - fragments (`#top`)
/// - absolute-root paths (`/icons/blank.gif`), which escape the crawl root
/// - empty hrefs and `javascript:` / `mailto:` pseudo links
///
/// # Examples
///
/// ```
/// use opendir_dl::url::bad_anchor;
///
/// assert!(bad_anchor("../"));
/// assert!(bad_anchor("?C=N;O=D"));
/// assert!(!bad_anchor("file.txt"));
/// ```
pub fn bad_anchor(href: &str) -> bool {
    let href = href.trim();

    if href.is_empty() || STATIC_ANCHORS.contains(&href) {
        return true;
    }

    if href.starts_with('#') || href.starts_with('/') || href.starts_with('?') {
        return true;
    }

    let lower = href.to_ascii_lowercase();
    lower.starts_with("javascript:") || lower.starts_with("mailto:")
}
