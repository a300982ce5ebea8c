//! Item stubs and the enriched records they become

use url::Url;

/// An item discovered on a listing page, pending enrichment
///
/// Owned by exactly one enrichment task. Converting it into an
/// [`EnrichedRecord`] consumes it, so no mutation is possible after the
/// hand-off to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStub {
    pub title: String,

    /// Listing-page location, replaced by the detail-page address
    pub location_hint: String,

    pub detail_url: Url,
}

impl ItemStub {
    pub fn new(title: String, location_hint: String, detail_url: Url) -> Self {
        Self {
            title,
            location_hint,
            detail_url,
        }
    }

    /// Applies the detail-page address
    ///
    /// With `fallback` set, a missing address keeps the listing hint;
    /// otherwise the hint is cleared (last write wins).
    pub fn apply_address(&mut self, address: Option<String>, fallback: bool) {
        match address {
            Some(address) => self.location_hint = address,
            None if fallback => {}
            None => self.location_hint.clear(),
        }
    }

    /// Completes the stub with its resolved phone number
    pub fn into_record(self, phone: String) -> EnrichedRecord {
        EnrichedRecord {
            title: self.title,
            location: self.location_hint,
            phone,
            url: self.detail_url.to_string(),
        }
    }
}

/// A fully populated item ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub title: String,
    pub location: String,
    pub phone: String,
    pub url: String,
}

impl EnrichedRecord {
    /// Row in output column order: title, location, phone, url
    pub fn to_row(&self) -> [&str; 4] {
        [
            self.title.as_str(),
            self.location.as_str(),
            self.phone.as_str(),
            self.url.as_str(),
        ]
    }
}
