use crate::config::types::{Config, CrawlerConfig, OutputConfig, SearchConfig};
use crate::crawler::PageSelectors;
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Upper bound on concurrently alive enrichment tasks
const MAX_ENRICHMENT_LIMIT: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    // Compiling the selectors is the validation
    PageSelectors::compile(&config.selectors)?;
    Ok(())
}

/// Validates the search parameters
fn validate_search_config(config: &SearchConfig) -> ConfigResult<()> {
    if config.query.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search query cannot be empty".to_string(),
        ));
    }

    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    validate_path_segment("location", &config.location)?;

    if let Some(category) = &config.category {
        validate_path_segment("category", category)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.max_concurrent_enrichments < 1
        || config.max_concurrent_enrichments > MAX_ENRICHMENT_LIMIT
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_enrichments must be between 1 and {}, got {}",
            MAX_ENRICHMENT_LIMIT, config.max_concurrent_enrichments
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if let Some(path) = &config.csv_path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "csv_path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// A path segment must be non-empty and must not contain separators
fn validate_path_segment(name: &str, segment: &str) -> ConfigResult<()> {
    if segment.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    if segment.contains('/') || segment.contains('?') || segment.contains('#') {
        return Err(ConfigError::Validation(format!(
            "{} must be a single path segment, got '{}'",
            name, segment
        )));
    }

    Ok(())
}
