//! Phone resolver for the JSON reveal endpoint
//!
//! The endpoint answers with a flat JSON object; the number lives under
//! the `phone` key. HTTP 403 is reported as a ban, distinct from every
//! other failure.

use crate::crawler::governor::RateGovernor;
use crate::HarvestError;
use reqwest::header::REFERER;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// JSON key holding the revealed number
const PHONE_KEY: &str = "phone";

/// Resolves hidden phone numbers through the reveal endpoint
#[derive(Debug, Clone)]
pub struct PhoneResolver {
    client: Client,
    governor: Arc<RateGovernor>,
}

impl PhoneResolver {
    pub fn new(client: Client, governor: Arc<RateGovernor>) -> Self {
        Self { client, governor }
    }

    /// Fetches the phone number behind one reveal control
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The phone endpoint URL (with the async marker)
    /// * `referer` - The detail page the control was found on
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The phone number; empty when the key is absent
    /// * `Err(HarvestError::Banned)` - The endpoint answered 403
    /// * `Err(HarvestError)` - Transport or decode failure
    pub async fn resolve(&self, endpoint: &Url, referer: &Url) -> Result<String, HarvestError> {
        tracing::debug!("Resolving phone via {}", endpoint);

        self.governor.acquire().await;

        let response = self
            .client
            .get(endpoint.clone())
            .header(REFERER, referer.as_str())
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| HarvestError::Http {
                url: endpoint.to_string(),
                source,
            })?;

        if status == StatusCode::FORBIDDEN {
            return Err(HarvestError::Banned {
                url: endpoint.to_string(),
            });
        }

        let phone = decode_phone(&body).map_err(|source| HarvestError::Json {
            url: endpoint.to_string(),
            source,
        })?;

        tracing::debug!("Phone number for {}: {:?}", referer, phone);
        Ok(phone)
    }
}

/// Reads the phone entry from a JSON object body
///
/// A missing key yields an empty string; a non-object body or a
/// non-string phone value is a decode error.
fn decode_phone(body: &[u8]) -> Result<String, serde_json::Error> {
    let mut payload: HashMap<String, Value> = serde_json::from_slice(body)?;

    match payload.remove(PHONE_KEY) {
        Some(value) => serde_json::from_value(value),
        None => Ok(String::new()),
    }
}
