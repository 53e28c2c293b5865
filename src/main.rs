//! Site Crawl main entry point
//!
//! This is the command-line interface for the site crawl engine.

use anyhow::Context;
use clap::Parser;
use site_crawl_engine::browser::ChromiumDriver;
use site_crawl_engine::config::{load_config_with_hash, CrawlConfig};
use site_crawl_engine::output::{print_summary, save_screenshots, write_result_json};
use site_crawl_engine::Crawler;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site Crawl: a bounded, browser-driven website crawler
///
/// Fetches a homepage in headless Chrome, samples the pages it links to by
/// depth, fetches those under a concurrency limit and time budget, and
/// writes the result as JSON.
#[derive(Parser, Debug)]
#[command(name = "site-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, browser-driven website crawler", long_about = None)]
struct Cli {
    /// Homepage URL to start from
    #[arg(value_name = "URL")]
    url: String,

    /// Path to a JSON or TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the JSON result here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save captured screenshots into this directory
    #[arg(long, value_name = "DIR")]
    screenshots_dir: Option<PathBuf>,

    /// Crawl these pages instead of sampling the homepage's links
    #[arg(long, value_name = "URL", num_args = 1..)]
    pages: Vec<String>,

    /// Seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => load_configuration(path),
        None => {
            tracing::info!("No configuration file given, using defaults");
            CrawlConfig::default()
        }
    };
    if cli.headed {
        config.launch.headless = false;
    }

    handle_crawl(&cli, config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_crawl_engine=info,warn"),
            1 => EnvFilter::new("site_crawl_engine=debug,info"),
            2 => EnvFilter::new("site_crawl_engine=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, falling back to defaults when it is unusable
fn load_configuration(path: &Path) -> CrawlConfig {
    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load configuration ({}), using defaults", e);
            CrawlConfig::default()
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: CrawlConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Max pages: {}, concurrency: {}, time budget: {}ms",
        config.max_total_pages,
        config.max_concurrent_pages,
        config.max_crawl_time_ms
    );

    let format = config.capture.format;
    let driver = ChromiumDriver::launch(&config.launch)
        .await
        .context("Failed to launch browser")?;

    let mut crawler = Crawler::new(config);
    if let Some(seed) = cli.seed {
        crawler = crawler.with_seed(seed);
    }

    let result = if cli.pages.is_empty() {
        crawler.run(&cli.url, Box::new(driver)).await
    } else {
        tracing::info!("Crawling {} explicit pages", cli.pages.len());
        crawler.crawl_pages(&cli.url, &cli.pages, Box::new(driver)).await
    }
    .with_context(|| format!("Crawl of {} failed", cli.url))?;

    write_result_json(&result, cli.output.as_deref()).context("Failed to write crawl result")?;

    if let Some(dir) = &cli.screenshots_dir {
        save_screenshots(&result, dir, format).context("Failed to save screenshots")?;
    }

    if cli.output.is_some() && !cli.quiet {
        print_summary(&result);
    }

    Ok(())
}
