use url::Url;

/// Name used when a URL has no trailing path segment
pub const DEFAULT_FILENAME: &str = "index.html";

/// Derives a local file name from a URL
///
/// Takes the last path segment and percent-decodes it. An empty segment
/// (a URL ending in `/`) yields `index.html`. Strings that don't parse as a
/// URL fall back to whatever follows their last `/`.
///
/// # Examples
///
/// ```
/// use opendir_dl::url::url_to_filename;
///
/// assert_eq!(url_to_filename("http://localhost/file%20name.txt"), "file name.txt");
/// assert_eq!(url_to_filename("http://localhost/"), "index.html");
/// ```
pub fn url_to_filename(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .to_string(),
        Err(_) => {
            let without_query = url.split(['?', '#']).next().unwrap_or("");
            without_query.rsplit('/').next().unwrap_or("").to_string()
        }
    };

    let decoded = match urlencoding::decode(&segment) {
        Ok(cow) => cow.into_owned(),
        Err(_) => {
            let bytes = urlencoding::decode_binary(segment.as_bytes());
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };

    if decoded.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        decoded
    }
}
