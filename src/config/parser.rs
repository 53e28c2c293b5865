use crate::config::types::{ConfigDocument, CrawlConfig, TierPolicy, TierSection};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and resolves a configuration file from the given path
///
/// Files ending in `.toml` are parsed as TOML; everything else as JSON. Both
/// use the same `crawling.*` layout. Missing options keep their defaults.
///
/// # Arguments
///
/// * `path` - Path to the configuration document
///
/// # Returns
///
/// * `Ok(CrawlConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_crawl_engine::config::load_config;
///
/// let config = load_config(Path::new("crawl.json")).unwrap();
/// println!("Concurrency: {}", config.max_concurrent_pages);
/// ```
pub fn load_config(path: &Path) -> Result<CrawlConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let document = if is_toml(path) {
        toml::from_str::<ConfigDocument>(&content)?
    } else {
        serde_json::from_str::<ConfigDocument>(&content)?
    };

    resolve(&CrawlConfig::default(), &document)
}

/// Loads a configuration file, falling back to the built-in defaults
///
/// A missing, unreadable, unparseable or invalid document never fails the
/// crawl; the problem is logged and [`CrawlConfig::default`] is used instead.
pub fn load_config_or_default(path: &Path) -> CrawlConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                "Could not load configuration from {} ({}), using defaults",
                path.display(),
                e
            );
            CrawlConfig::default()
        }
    }
}

/// Merges an override document onto a base configuration and validates it
///
/// Only options present in `overrides` replace the corresponding value in
/// `defaults`. The result is always complete; validation failures are
/// returned as [`ConfigError::Validation`].
pub fn resolve(defaults: &CrawlConfig, overrides: &ConfigDocument) -> Result<CrawlConfig, ConfigError> {
    let mut config = defaults.clone();
    let crawling = &overrides.crawling;

    if let Some(tier) = &crawling.depth.level_1 {
        apply_tier(&mut config.level_1, tier);
    }
    if let Some(tier) = &crawling.depth.level_2_plus {
        apply_tier(&mut config.level_2_plus, tier);
    }

    let timeouts = &crawling.timeouts;
    if let Some(ms) = timeouts.page_load_timeout {
        config.page_load_timeout_ms = ms;
    }
    if let Some(idle) = timeouts.wait_for_network_idle {
        config.wait_for_network_idle = idle;
    }
    if let Some(ms) = timeouts.max_crawl_time {
        config.max_crawl_time_ms = ms;
    }

    let limits = &crawling.limits;
    if let Some(total) = limits.max_total_pages {
        config.max_total_pages = total;
    }
    if let Some(concurrent) = limits.max_concurrent_pages {
        config.max_concurrent_pages = concurrent;
    }

    let filters = &crawling.filters;
    if let Some(same_domain) = filters.same_domain_only {
        config.same_domain_only = same_domain;
    }
    if let Some(patterns) = &filters.exclude_patterns {
        config.exclude_patterns = patterns.iter().map(|p| p.trim().to_lowercase()).collect();
    }
    if let Some(types) = &filters.exclude_file_types {
        config.exclude_file_types = types.iter().map(|t| normalize_extension(t)).collect();
    }

    let capture = &crawling.capture;
    if let Some(screenshots) = capture.screenshots {
        config.capture.screenshots = screenshots;
    }
    if let Some(mobile) = capture.mobile {
        config.capture.mobile = mobile;
    }
    if let Some(format) = capture.format {
        config.capture.format = format;
    }
    if let Some(quality) = capture.quality {
        config.capture.quality = quality;
    }
    if let Some(full_page) = capture.full_page {
        config.capture.full_page = full_page;
    }

    if let Some(enabled) = crawling.detection.bot_protection {
        config.detect_bot_protection = enabled;
    }

    let browser = &crawling.browser;
    if let Some(headless) = browser.headless {
        config.launch.headless = headless;
    }
    if let Some(path) = &browser.executable_path {
        config.launch.executable_path = Some(path.clone());
    }
    if let Some(ua) = &browser.user_agent {
        config.launch.user_agent = ua.clone();
    }
    if let Some(ua) = &browser.mobile_user_agent {
        config.launch.mobile_user_agent = ua.clone();
    }

    validate(&config)?;

    Ok(config)
}

fn apply_tier(policy: &mut TierPolicy, section: &TierSection) {
    if let Some(rate) = section.sample_rate {
        policy.sample_rate = rate;
    }
    if let Some(max) = section.max_pages {
        policy.max_pages = max;
    }
}

/// Lowercases an extension and gives it a leading dot (`PDF` -> `.pdf`)
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at crawl start so results can be traced back to the exact
/// configuration that produced them.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(CrawlConfig, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
