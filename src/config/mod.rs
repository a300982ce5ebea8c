//! Configuration module for Classifieds-Harvest
//!
//! Configuration comes from an optional TOML file with command-line flags
//! layered on top, and is validated once before the crawl starts.
//!
//! # Example
//!
//! ```no_run
//! use classifieds_harvest::config::{resolve_config, ConfigOverrides};
//! use std::path::Path;
//!
//! let overrides = ConfigOverrides {
//!     query: Some("macbook".to_string()),
//!     ..Default::default()
//! };
//! let (config, _hash) = resolve_config(Some(Path::new("harvest.toml")), overrides).unwrap();
//! println!("Item cap: {}", config.crawler.max_items);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SearchConfig, SelectorConfig, UserAgentConfig,
    DEFAULT_BASE_URL, DEFAULT_LOCATION,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, resolve_config, ConfigOverrides,
};
pub use validation::validate;
