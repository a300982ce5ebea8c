use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Values supplied on the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub query: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub base_url: Option<String>,
    pub csv_path: Option<PathBuf>,
    pub max_items: Option<u64>,
    pub pause_ms: Option<u64>,
    pub max_concurrent_enrichments: Option<usize>,
    pub abort_on_ban: Option<bool>,
}

/// Loads and parses a configuration file from the given path
///
/// The file is not validated here: required values such as the search
/// query may still arrive from the command line.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully parsed configuration
/// * `Err(ConfigError)` - Failed to read or parse the file
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Layers command-line values over a loaded configuration
pub fn apply_overrides(config: &mut Config, overrides: ConfigOverrides) {
    if let Some(query) = overrides.query {
        config.search.query = query;
    }
    if let Some(location) = overrides.location {
        config.search.location = location;
    }
    if let Some(category) = overrides.category {
        // An empty flag clears a category set in the file
        config.search.category = Some(category).filter(|c| !c.is_empty());
    }
    if let Some(base_url) = overrides.base_url {
        config.search.base_url = base_url;
    }
    if let Some(csv_path) = overrides.csv_path {
        config.output.csv_path = Some(csv_path);
    }
    if let Some(max_items) = overrides.max_items {
        config.crawler.max_items = max_items;
    }
    if let Some(pause_ms) = overrides.pause_ms {
        config.crawler.pause_ms = pause_ms;
    }
    if let Some(limit) = overrides.max_concurrent_enrichments {
        config.crawler.max_concurrent_enrichments = limit;
    }
    if let Some(abort_on_ban) = overrides.abort_on_ban {
        config.crawler.abort_on_ban = abort_on_ban;
    }
}

/// Builds the effective configuration for a run
///
/// Loads the optional file, applies overrides and validates the result.
///
/// # Returns
///
/// * `Ok((Config, Option<String>))` - The validated configuration and the
///   hash of the file it came from, if any
/// * `Err(ConfigError)` - Loading or validation failed
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> ConfigResult<(Config, Option<String>)> {
    let (mut config, hash) = match path {
        Some(path) => (load_config(path)?, Some(compute_config_hash(path)?)),
        None => (Config::default(), None),
    };

    apply_overrides(&mut config, overrides);
    validate(&config)?;

    Ok((config, hash))
}
