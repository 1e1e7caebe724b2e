use url::Url;

/// Extracts the domain from a URL string
///
/// This function retrieves the host portion of a URL, without any port, and
/// converts it to lowercase. Returns `None` if the string is not a URL or the
/// URL has no host.
///
/// # Examples
///
/// ```
/// use opendir_dl::url::url_to_domain;
///
/// assert_eq!(url_to_domain("https://example.com/path"), Some("example.com".to_string()));
/// assert_eq!(url_to_domain("http://EXAMPLE.COM:8080/"), Some("example.com".to_string()));
/// assert_eq!(url_to_domain("not a url"), None);
/// ```
pub fn url_to_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
