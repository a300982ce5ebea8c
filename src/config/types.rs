use serde::Deserialize;
use std::path::PathBuf;

/// Origin crawled when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://m.avito.ru";

/// Location segment meaning "no regional filter"
pub const DEFAULT_LOCATION: &str = "rossiya";

/// Main configuration structure for Classifieds-Harvest
///
/// Every section is optional in the TOML file; command-line flags are
/// layered on top before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to search for and where
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Origin of the listing site (scheme + host)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Free-text search query
    pub query: String,

    /// Regional path segment
    pub location: String,

    /// Optional category path segment
    pub category: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query: String::new(),
            location: DEFAULT_LOCATION.to_string(),
            category: None,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of items to enrich (0 = unlimited)
    #[serde(rename = "max-items")]
    pub max_items: u64,

    /// Minimum pause between outbound requests in milliseconds (0 = unthrottled)
    #[serde(rename = "pause-ms")]
    pub pause_ms: u64,

    /// Maximum number of enrichment tasks alive at once
    #[serde(rename = "max-concurrent-enrichments")]
    pub max_concurrent_enrichments: usize,

    /// Keep the listing-page location when the detail page has no address
    #[serde(rename = "location-fallback")]
    pub location_fallback: bool,

    /// Stop the whole crawl on the first ban signal
    #[serde(rename = "abort-on-ban")]
    pub abort_on_ban: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_items: 1,
            pause_ms: 0,
            max_concurrent_enrichments: 16,
            location_fallback: true,
            abort_on_ban: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version` or `CrawlerName/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// CSS selectors used to query listing and detail documents
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// Anchor pointing at the next listing page
    pub next_page: String,

    /// Results-category label; its absence marks a degraded page
    pub category: String,

    /// Total-count label shown next to the category
    pub total_count: String,

    /// One listing entry
    pub item: String,

    /// Link from a listing entry to its detail page
    pub item_link: String,

    /// Title text inside a listing entry
    pub item_title: String,

    /// Location hint inside a listing entry
    pub item_location: String,

    /// Address text on the detail page
    pub detail_address: String,

    /// "Reveal phone number" control on the detail page
    pub phone_reveal: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            next_page: ".page-next a".to_string(),
            category: ".nav-helper-header".to_string(),
            total_count: ".nav-helper-text".to_string(),
            item: ".b-item".to_string(),
            item_link: ".item-link".to_string(),
            item_title: ".header-text".to_string(),
            item_location: ".info-location".to_string(),
            detail_address: ".avito-address-text".to_string(),
            phone_reveal: ".action-show-number".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV file; standard output when absent
    #[serde(rename = "csv-path")]
    pub csv_path: Option<PathBuf>,
}
