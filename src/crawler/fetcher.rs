//! HTTP fetcher implementation
//!
//! This module handles the HTML page requests of the crawler:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests for listing and detail pages
//! - Error classification (ban, HTTP status, network)
//!
//! No retries and no per-request timeout are applied.

use crate::config::UserAgentConfig;
use crate::HarvestError;
use reqwest::{Client, StatusCode};

/// Result of a page fetch
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Page body content
        body: String,
    },

    /// The origin refused us (HTTP 403)
    Forbidden,

    /// Any other non-success HTTP status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, reset, body read failure)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Converts the result into the page body or a crate error
    pub fn into_body(self, url: &str) -> Result<String, HarvestError> {
        match self {
            Self::Success { body } => Ok(body),
            Self::Forbidden => Err(HarvestError::Banned {
                url: url.to_string(),
            }),
            Self::HttpError { status_code } => Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status_code,
            }),
            Self::NetworkError { error } => Err(HarvestError::Network {
                url: url.to_string(),
                message: error,
            }),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use classifieds_harvest::config::UserAgentConfig;
/// use classifieds_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches an HTML page
///
/// # Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | Success |
/// | HTTP 403 | Forbidden |
/// | Other HTTP status | HttpError |
/// | Transport or body error | NetworkError |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_page(client: &Client, url: &str) -> FetchResult {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();

            if status == StatusCode::FORBIDDEN {
                return FetchResult::Forbidden;
            }

            if !status.is_success() {
                return FetchResult::HttpError {
                    status_code: status.as_u16(),
                };
            }

            match response.text().await {
                Ok(body) => FetchResult::Success { body },
                Err(e) => FetchResult::NetworkError {
                    error: e.to_string(),
                },
            }
        }
        Err(e) => {
            let error = if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            FetchResult::NetworkError { error }
        }
    }
}
