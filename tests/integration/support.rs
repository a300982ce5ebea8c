//! Page fixtures and helpers shared by the integration tests

use classifieds_harvest::config::Config;
use classifieds_harvest::output::{OutputError, OutputResult, RecordSink};
use classifieds_harvest::EnrichedRecord;
use std::sync::{mpsc, Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One listing entry as it appears on a listing page
pub struct Entry {
    pub title: String,
    pub location: String,
    pub href: Option<String>,
}

impl Entry {
    pub fn new(title: &str, href: &str) -> Self {
        Self {
            title: title.to_string(),
            location: "Москва".to_string(),
            href: Some(href.to_string()),
        }
    }

    /// Entry linking to `/item/{id}`
    pub fn numbered(id: u32) -> Self {
        Self::new(&format!("Item {}", id), &format!("/item/{}", id))
    }
}

/// Creates a test configuration pointing at the mock server
pub fn create_test_config(base_url: &str, max_items: u64) -> Config {
    let mut config = Config::default();
    config.search.base_url = base_url.to_string();
    config.search.query = "macbook".to_string();
    config.crawler.max_items = max_items;
    config.crawler.pause_ms = 0;
    config.crawler.max_concurrent_enrichments = 4;
    config.user_agent.crawler_name = "TestHarvester".to_string();
    config.user_agent.crawler_version = "1.0.0".to_string();
    config
}

/// Renders a listing page in the default markup
pub fn listing_page(category: Option<&str>, entries: &[Entry], next: Option<&str>) -> String {
    let mut html = String::from("<html><body>");

    if let Some(category) = category {
        html.push_str(&format!(
            r#"<div class="nav-helper-header">{}</div><div class="nav-helper-text">{} объявлений</div>"#,
            category,
            entries.len()
        ));
    }

    for entry in entries {
        html.push_str(r#"<article class="b-item">"#);
        match &entry.href {
            Some(href) => html.push_str(&format!(
                r#"<a class="item-link" href="{}"><span class="header-text">{}</span></a>"#,
                href, entry.title
            )),
            None => html.push_str(&format!(r#"<span class="header-text">{}</span>"#, entry.title)),
        }
        html.push_str(&format!(
            r#"<div class="info-location">{}</div></article>"#,
            entry.location
        ));
    }

    if let Some(next) = next {
        html.push_str(&format!(
            r#"<div class="page-next"><a href="{}">Дальше</a></div>"#,
            next
        ));
    }

    html.push_str("</body></html>");
    html
}

/// Renders a detail page with an optional address and phone-reveal control
pub fn detail_page(address: Option<&str>, phone_href: Option<&str>) -> String {
    let mut html = String::from("<html><body><h1>Item</h1>");
    if let Some(address) = address {
        html.push_str(&format!(
            r#"<div class="avito-address-text"> {} </div>"#,
            address
        ));
    }
    if let Some(href) = phone_href {
        html.push_str(&format!(
            r#"<a class="action-show-number" href="{}">Показать телефон</a>"#,
            href
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Renders the JSON answer of the phone endpoint
pub fn phone_json(phone: &str) -> String {
    format!(r#"{{"phone": "{}"}}"#, phone)
}

/// Mounts a 200 HTML response for a path
pub async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts a bare status response for a path
pub async fn mount_status(server: &MockServer, at: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Mounts one item: detail page at `/item/{id}` and phone at `/phone/{id}`
pub async fn mount_item(server: &MockServer, id: u32, address: &str, phone: &str) {
    let phone_path = format!("/phone/{}", id);
    mount_page(
        server,
        &format!("/item/{}", id),
        detail_page(Some(address), Some(&phone_path)),
    )
    .await;
    mount_page(server, &phone_path, phone_json(phone)).await;
}

/// Counts requests received for an exact path
pub async fn requests_to(server: &MockServer, at: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == at)
        .count()
}

/// Counts requests received for every path under a prefix
pub async fn requests_under(server: &MockServer, prefix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path().starts_with(prefix))
        .count()
}

/// Sink collecting records in memory
#[derive(Clone, Default)]
pub struct CollectingSink {
    pub records: Arc<Mutex<Vec<EnrichedRecord>>>,
}

impl CollectingSink {
    /// Records sorted by URL; arrival order depends on task scheduling
    pub fn sorted(&self) -> Vec<EnrichedRecord> {
        let mut records = self.records.lock().unwrap().clone();
        records.sort_by(|a, b| a.url.cmp(&b.url));
        records
    }
}

impl RecordSink for CollectingSink {
    fn write_record(&mut self, record: &EnrichedRecord) -> OutputResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

/// Sink that holds every row until the test lets it through
pub struct GatedSink {
    pub received: Arc<Mutex<Vec<EnrichedRecord>>>,
    gate: mpsc::Receiver<()>,
}

impl GatedSink {
    /// Returns the sink and the sender that releases one row per message
    pub fn new() -> (Self, mpsc::Sender<()>) {
        let (open, gate) = mpsc::channel();
        let sink = Self {
            received: Arc::default(),
            gate,
        };
        (sink, open)
    }
}

impl RecordSink for GatedSink {
    fn write_record(&mut self, record: &EnrichedRecord) -> OutputResult<()> {
        self.received.lock().unwrap().push(record.clone());
        self.gate
            .recv()
            .map_err(|_| OutputError::Write("gate closed".to_string()))
    }

    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
