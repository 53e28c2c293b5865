//! Configuration module for the crawl engine
//!
//! This module resolves caller overrides (a JSON or TOML document) against the
//! built-in defaults into one immutable, validated [`CrawlConfig`].
//!
//! # Example
//!
//! ```no_run
//! use site_crawl_engine::config::load_config_or_default;
//! use std::path::Path;
//!
//! let config = load_config_or_default(Path::new("crawl.json"));
//! println!("Crawl budget: {}ms", config.max_crawl_time_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CaptureConfig, ConfigDocument, CrawlConfig, ImageFormat, LaunchConfig, TierPolicy,
    DEFAULT_MOBILE_USER_AGENT, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_or_default, load_config_with_hash, resolve,
};
