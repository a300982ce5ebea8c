//! Base URL parsing and href resolution

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an origin URL and checks that it can anchor relative links
pub fn parse_base(base_url: &str) -> UrlResult<Url> {
    let url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.cannot_be_a_base() {
        return Err(UrlError::CannotBeBase(base_url.to_string()));
    }

    Ok(url)
}

/// Resolves an href found in a document to an absolute URL
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - hrefs that do not resolve to an HTTP(S) URL
///
/// # Examples
///
/// ```
/// use classifieds_harvest::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://m.example.com").unwrap();
/// let url = resolve_href(&base, "/moskva/item_1").unwrap();
/// assert_eq!(url.as_str(), "https://m.example.com/moskva/item_1");
/// ```
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
