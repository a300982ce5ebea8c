//! Classifieds-Harvest: a concurrent listing crawler
//!
//! This crate walks a paginated classifieds listing, enriches every item with
//! its detail-page location and hidden contact phone, and streams the
//! enriched records into a CSV sink.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Classifieds-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The origin has blocked this client (HTTP 403 or a degraded page)
    #[error("Client appears to be banned by the origin (at {url})")]
    Banned { url: String },

    #[error("Invalid phone payload from {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PipelineState,
        to: state::PipelineState,
    },

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl HarvestError {
    /// Returns true if this error signals that the origin blocked us
    pub fn is_ban(&self) -> bool {
        matches!(self, Self::Banned { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL cannot be used as a base: {0}")]
    CannotBeBase(String),
}

/// Result type alias for Classifieds-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, EnrichedRecord, ItemStub};
pub use output::CrawlSummary;
pub use state::{PipelineState, WalkOutcome};
