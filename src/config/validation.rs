use crate::config::types::{CaptureConfig, CrawlConfig, LaunchConfig, TierPolicy};
use crate::ConfigError;

/// Upper bound on concurrently open browser contexts
const MAX_CONCURRENT_PAGES: usize = 50;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_limits(config)?;
    validate_timeouts(config)?;
    validate_tier("level_1", &config.level_1)?;
    validate_tier("level_2_plus", &config.level_2_plus)?;
    validate_filters(config)?;
    validate_capture(&config.capture)?;
    validate_launch(&config.launch)?;
    Ok(())
}

fn validate_limits(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > MAX_CONCURRENT_PAGES {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and {}, got {}",
            MAX_CONCURRENT_PAGES, config.max_concurrent_pages
        )));
    }

    if config.max_total_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_total_pages must be >= 1, got {}",
            config.max_total_pages
        )));
    }

    Ok(())
}

fn validate_timeouts(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.page_load_timeout_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "page_load_timeout must be >= 1ms, got {}ms",
            config.page_load_timeout_ms
        )));
    }

    if config.max_crawl_time_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "max_crawl_time must be >= 1ms, got {}ms",
            config.max_crawl_time_ms
        )));
    }

    Ok(())
}

fn validate_tier(name: &str, policy: &TierPolicy) -> Result<(), ConfigError> {
    if !policy.sample_rate.is_finite() || !(0.0..=1.0).contains(&policy.sample_rate) {
        return Err(ConfigError::Validation(format!(
            "{}.sample_rate must be between 0 and 1, got {}",
            name, policy.sample_rate
        )));
    }

    Ok(())
}

fn validate_filters(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.exclude_patterns.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::Validation(
            "exclude_patterns cannot contain empty entries".to_string(),
        ));
    }

    for ext in &config.exclude_file_types {
        if ext.len() < 2 || !ext.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "exclude_file_types entries must look like '.pdf', got '{}'",
                ext
            )));
        }
    }

    Ok(())
}

fn validate_capture(capture: &CaptureConfig) -> Result<(), ConfigError> {
    if capture.quality < 1 || capture.quality > 100 {
        return Err(ConfigError::Validation(format!(
            "capture.quality must be between 1 and 100, got {}",
            capture.quality
        )));
    }

    Ok(())
}

fn validate_launch(launch: &LaunchConfig) -> Result<(), ConfigError> {
    if launch.user_agent.trim().is_empty() || launch.mobile_user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "browser user agents cannot be empty".to_string(),
        ));
    }

    Ok(())
}
