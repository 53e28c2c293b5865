//! Site Crawl Engine: a bounded, browser-driven website crawler
//!
//! This crate discovers a website's page graph from its homepage, samples which
//! pages to visit per depth tier, fetches them through one shared headless
//! browser with isolated per-page contexts, and returns a partially-tolerant
//! [`CrawlResult`] for downstream analysis.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid crawl root: {0}")]
    InvalidRoot(#[from] UrlError),

    #[error("Homepage fetch failed for {url}: {reason}")]
    RootFetch { url: String, reason: String },

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::CrawlConfig;
#[cfg(feature = "chromium")]
pub use crawler::crawl_site;
pub use crawler::{CrawlMetadata, CrawlResult, Crawler, FailedPage, FetchTask, PageFetchResult};
pub use url::{categorize, normalize_link, DepthTier};
