//! Detail enricher
//!
//! One enrichment task per listing entry: fetch the detail page, take the
//! address, resolve the phone behind the reveal control and hand the
//! completed record to the sink. Every exit path returns an
//! [`EnrichOutcome`], which is how the orchestrator counts completions.

use crate::crawler::ban::BanSignal;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::governor::RateGovernor;
use crate::crawler::item::{EnrichedRecord, ItemStub};
use crate::crawler::parser::{parse_detail, PageSelectors};
use crate::crawler::phone::PhoneResolver;
use crate::url::phone_endpoint_url;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// How one enrichment task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichOutcome {
    /// A record was handed to the sink
    Emitted,

    /// The detail page had no phone-reveal control
    NoPhoneControl,

    /// The endpoint answered without a phone number
    ///
    /// Such an item is dropped instead of being written with an empty
    /// phone column, so every row carries a number.
    EmptyPhone,

    /// The detail page could not be fetched
    DetailFailed,

    /// Every phone lookup failed
    PhoneFailed,

    /// The detail page or phone endpoint signalled a ban
    Banned,

    /// The crawl was aborted before this item was processed
    Cancelled,

    /// The sink stopped receiving before the record could be sent
    SinkClosed,
}

impl EnrichOutcome {
    /// Returns true if the item produced an output row
    pub fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted)
    }
}

/// Enriches item stubs with detail-page data and phone numbers
#[derive(Debug)]
pub struct DetailEnricher {
    client: Client,
    governor: Arc<RateGovernor>,
    selectors: Arc<PageSelectors>,
    resolver: PhoneResolver,
    base_url: Url,
    location_fallback: bool,
    ban: Arc<BanSignal>,
}

impl DetailEnricher {
    pub fn new(
        client: Client,
        governor: Arc<RateGovernor>,
        selectors: Arc<PageSelectors>,
        base_url: Url,
        location_fallback: bool,
        ban: Arc<BanSignal>,
    ) -> Self {
        let resolver = PhoneResolver::new(client.clone(), Arc::clone(&governor));
        Self {
            client,
            governor,
            selectors,
            resolver,
            base_url,
            location_fallback,
            ban,
        }
    }

    /// Enriches one stub and sends at most one record
    ///
    /// The send blocks while the sink is busy, which is the only
    /// backpressure in the pipeline.
    pub async fn enrich(
        &self,
        mut stub: ItemStub,
        records: &mpsc::Sender<EnrichedRecord>,
    ) -> EnrichOutcome {
        tokio::select! {
            biased;
            _ = self.ban.aborted() => {
                tracing::debug!("Skipping {} after crawl abort", stub.detail_url);
                return EnrichOutcome::Cancelled;
            }
            _ = self.governor.acquire() => {}
        }

        let detail_url = stub.detail_url.clone();
        let body = match fetch_page(&self.client, detail_url.as_str())
            .await
            .into_body(detail_url.as_str())
        {
            Ok(body) => body,
            Err(e) if e.is_ban() => {
                self.ban.raise(detail_url.as_str(), "detail");
                return EnrichOutcome::Banned;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch detail page {}: {}", detail_url, e);
                return EnrichOutcome::DetailFailed;
            }
        };

        let detail = parse_detail(&body, &self.selectors);
        stub.apply_address(detail.address, self.location_fallback);

        if detail.phone_reveal_hrefs.is_empty() {
            tracing::debug!("No phone-reveal control on {}", detail_url);
            return EnrichOutcome::NoPhoneControl;
        }

        let mut outcome = EnrichOutcome::PhoneFailed;

        // The first control that yields a number wins
        for href in &detail.phone_reveal_hrefs {
            if self.ban.is_aborted() {
                return EnrichOutcome::Cancelled;
            }

            let endpoint = match phone_endpoint_url(&self.base_url, href) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    tracing::warn!("Unusable phone link '{}' on {}: {}", href, detail_url, e);
                    continue;
                }
            };
            tracing::debug!("Found phone link: {}", endpoint);

            match self.resolver.resolve(&endpoint, &detail_url).await {
                Ok(phone) if !phone.is_empty() => {
                    let record = stub.into_record(phone);
                    return match records.send(record).await {
                        Ok(()) => EnrichOutcome::Emitted,
                        Err(_) => {
                            tracing::warn!("Sink closed before record for {} was sent", detail_url);
                            EnrichOutcome::SinkClosed
                        }
                    };
                }
                Ok(_) => {
                    tracing::warn!("Phone endpoint {} returned no number", endpoint);
                    outcome = EnrichOutcome::EmptyPhone;
                }
                Err(e) if e.is_ban() => {
                    self.ban.raise(endpoint.as_str(), "phone");
                    return EnrichOutcome::Banned;
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve phone for {}: {}", detail_url, e);
                    outcome = EnrichOutcome::PhoneFailed;
                }
            }
        }

        outcome
    }
}
