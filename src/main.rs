//! Classifieds-Harvest main entry point
//!
//! This is the command-line interface for the Classifieds-Harvest listing crawler.

use anyhow::Context;
use clap::Parser;
use classifieds_harvest::config::{resolve_config, ConfigOverrides};
use classifieds_harvest::crawler::Coordinator;
use classifieds_harvest::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Classifieds-Harvest: a concurrent listing crawler
///
/// Walks a paginated classifieds search, enriches every listing with the
/// address and contact phone from its detail page, and writes the results
/// as CSV (title, location, phone, url).
#[derive(Parser, Debug)]
#[command(name = "classifieds-harvest")]
#[command(version)]
#[command(about = "A concurrent classifieds listing crawler", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Search query
    #[arg(short = 'q', long)]
    query: Option<String>,

    /// Location path segment ("rossiya" searches everywhere)
    #[arg(short = 'l', long)]
    location: Option<String>,

    /// Category path segment
    #[arg(short = 'c', long)]
    category: Option<String>,

    /// Write CSV to this file instead of standard output
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Maximum number of items to enrich (0 = unlimited)
    #[arg(short = 'm', long = "max")]
    max_items: Option<u64>,

    /// Pause between requests in milliseconds (0 = unthrottled)
    #[arg(short = 'p', long = "pause")]
    pause_ms: Option<u64>,

    /// Site root to crawl
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum number of enrichment tasks alive at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop the whole crawl at the first ban signal
    #[arg(long)]
    abort_on_ban: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            query: self.query.clone(),
            location: self.location.clone(),
            category: self.category.clone(),
            base_url: self.base_url.clone(),
            csv_path: self.csv.clone(),
            max_items: self.max_items,
            pause_ms: self.pause_ms,
            max_concurrent_enrichments: self.concurrency,
            // Only an explicit flag overrides the file
            abort_on_ban: self.abort_on_ban.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let (config, config_hash) = resolve_config(cli.config.as_deref(), cli.overrides())
        .context("Failed to load configuration")?;
    if let Some(hash) = config_hash {
        tracing::info!("Configuration loaded successfully (hash: {})", hash);
    }

    tracing::info!(
        "Searching '{}' in {}{}",
        config.search.query,
        config.search.location,
        config
            .search
            .category
            .as_deref()
            .map(|c| format!("/{}", c))
            .unwrap_or_default()
    );

    let mut coordinator = Coordinator::new(config).context("Failed to set up the crawler")?;
    let summary = coordinator.run().await.context("Crawl failed")?;

    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        // Only show errors
        "error"
    } else {
        match verbose {
            0 => "classifieds_harvest=info,warn",
            1 => "classifieds_harvest=debug,info",
            2 => "classifieds_harvest=trace,debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
