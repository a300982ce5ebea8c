//! Seed URL and phone endpoint construction

use crate::url::resolve::parse_base;
use crate::{UrlError, UrlResult};
use url::Url;

/// Query marker that makes the phone-reveal endpoint answer with JSON
const ASYNC_MARKER: &str = "async";

/// Builds the first listing page URL for a search
///
/// Shape: `{base}/{location}[/{category}]?q={query}`. Segments and the
/// query are percent-encoded.
///
/// # Examples
///
/// ```
/// use classifieds_harvest::url::build_seed_url;
///
/// let url = build_seed_url("https://m.example.com", "moskva", Some("rabota"), "rust dev").unwrap();
/// assert_eq!(url.as_str(), "https://m.example.com/moskva/rabota?q=rust+dev");
/// ```
pub fn build_seed_url(
    base_url: &str,
    location: &str,
    category: Option<&str>,
    query: &str,
) -> UrlResult<Url> {
    let mut url = parse_base(base_url)?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| UrlError::CannotBeBase(base_url.to_string()))?;
        segments.pop_if_empty().push(location);
        if let Some(category) = category {
            segments.push(category);
        }
    }

    url.query_pairs_mut().clear().append_pair("q", query);

    Ok(url)
}

/// Builds the JSON phone endpoint URL for a reveal control's href
///
/// The href is resolved against the base and the `async` marker is
/// appended to its query.
///
/// # Examples
///
/// ```
/// use classifieds_harvest::url::phone_endpoint_url;
/// use url::Url;
///
/// let base = Url::parse("https://m.example.com").unwrap();
/// let url = phone_endpoint_url(&base, "/moskva/phone/42").unwrap();
/// assert_eq!(url.as_str(), "https://m.example.com/moskva/phone/42?async");
/// ```
pub fn phone_endpoint_url(base: &Url, reveal_href: &str) -> UrlResult<Url> {
    let mut url = base
        .join(reveal_href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", reveal_href, e)))?;

    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, ASYNC_MARKER),
        _ => ASYNC_MARKER.to_string(),
    };
    url.set_query(Some(&query));

    Ok(url)
}
