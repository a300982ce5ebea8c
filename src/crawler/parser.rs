//! HTML parser for listing and detail documents
//!
//! This module evaluates the configured selectors against fetched pages:
//! - Listing pages: item entries, next-page link, category and count labels
//! - Detail pages: address text and phone-reveal controls
//!
//! Parsed documents are dropped before returning so results can cross
//! `.await` points.

use crate::config::SelectorConfig;
use crate::url::resolve_href;
use crate::{ConfigError, ConfigResult};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled selectors shared by every crawl task
#[derive(Debug, Clone)]
pub struct PageSelectors {
    next_page: Selector,
    category: Selector,
    total_count: Selector,
    item: Selector,
    item_link: Selector,
    item_title: Selector,
    item_location: Selector,
    detail_address: Selector,
    phone_reveal: Selector,
}

impl PageSelectors {
    /// Compiles every configured selector
    ///
    /// # Returns
    ///
    /// * `Ok(PageSelectors)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - The first selector that failed
    pub fn compile(config: &SelectorConfig) -> ConfigResult<Self> {
        Ok(Self {
            next_page: compile_selector(&config.next_page)?,
            category: compile_selector(&config.category)?,
            total_count: compile_selector(&config.total_count)?,
            item: compile_selector(&config.item)?,
            item_link: compile_selector(&config.item_link)?,
            item_title: compile_selector(&config.item_title)?,
            item_location: compile_selector(&config.item_location)?,
            detail_address: compile_selector(&config.detail_address)?,
            phone_reveal: compile_selector(&config.phone_reveal)?,
        })
    }
}

fn compile_selector(selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// One entry found on a listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    /// Entry title text
    pub title: String,

    /// Location text shown on the listing
    pub location_hint: String,

    /// Absolute detail-page URL; None when the link is missing or unusable
    pub detail_url: Option<Url>,
}

/// Extracted information from a listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Absolute URL of the next listing page, if any
    pub next_page: Option<Url>,

    /// Results-category label; None or empty on degraded pages
    pub category: Option<String>,

    /// Total-count label as displayed
    pub total_count: Option<String>,

    /// Entries in document order
    pub entries: Vec<ListingEntry>,
}

impl ListingPage {
    /// A page without a category label is what the origin serves to
    /// blocked clients
    pub fn looks_degraded(&self) -> bool {
        self.category.as_deref().map_or(true, str::is_empty)
    }
}

/// Extracted information from a detail page
#[derive(Debug, Clone, Default)]
pub struct DetailPage {
    /// Trimmed address text; None when the element is missing or blank
    pub address: Option<String>,

    /// Raw hrefs of every phone-reveal control, in document order
    pub phone_reveal_hrefs: Vec<String>,
}

/// Parses a listing page
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
/// * `selectors` - The compiled selectors
///
/// # Example
///
/// ```
/// use classifieds_harvest::config::SelectorConfig;
/// use classifieds_harvest::crawler::{parse_listing, PageSelectors};
/// use url::Url;
///
/// let selectors = PageSelectors::compile(&SelectorConfig::default()).unwrap();
/// let html = r#"<div class="nav-helper-header">Laptops</div>
///     <div class="b-item"><a class="item-link" href="/moskva/mac_1"></a>
///     <span class="header-text">MacBook</span></div>"#;
/// let base = Url::parse("https://m.example.com").unwrap();
/// let page = parse_listing(html, &base, &selectors);
/// assert_eq!(page.entries.len(), 1);
/// assert!(page.next_page.is_none());
/// ```
pub fn parse_listing(html: &str, base_url: &Url, selectors: &PageSelectors) -> ListingPage {
    let document = Html::parse_document(html);

    let next_page = document
        .select(&selectors.next_page)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_href(base_url, href));

    let category = first_text(&document, &selectors.category);
    let total_count = first_text(&document, &selectors.total_count);

    let entries = document
        .select(&selectors.item)
        .map(|item| parse_entry(item, base_url, selectors))
        .collect();

    ListingPage {
        next_page,
        category,
        total_count,
        entries,
    }
}

fn parse_entry(item: ElementRef<'_>, base_url: &Url, selectors: &PageSelectors) -> ListingEntry {
    let detail_url = item
        .select(&selectors.item_link)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve_href(base_url, href));

    ListingEntry {
        title: first_text_in(item, &selectors.item_title).unwrap_or_default(),
        location_hint: first_text_in(item, &selectors.item_location).unwrap_or_default(),
        detail_url,
    }
}

/// Parses an item detail page
pub fn parse_detail(html: &str, selectors: &PageSelectors) -> DetailPage {
    let document = Html::parse_document(html);

    let address = first_text(&document, &selectors.detail_address).filter(|a| !a.is_empty());

    let phone_reveal_hrefs = document
        .select(&selectors.phone_reveal)
        .filter_map(|control| control.value().attr("href"))
        .map(str::to_string)
        .collect();

    DetailPage {
        address,
        phone_reveal_hrefs,
    }
}

/// Trimmed text of the first match in the document
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

/// Trimmed text of the first match below an element
fn first_text_in(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|found| found.text().collect::<String>().trim().to_string())
}
