use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fully-resolved crawl configuration
///
/// Built once per crawl invocation by [`resolve`](crate::config::resolve) and
/// never mutated afterwards. Every component receives it by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlConfig {
    /// Hard cap on fetched pages, homepage included
    pub max_total_pages: usize,

    /// Maximum number of fetches (and open browser contexts) at once
    pub max_concurrent_pages: usize,

    /// Whole-crawl wall-clock budget (milliseconds)
    pub max_crawl_time_ms: u64,

    /// Per-attempt navigation timeout (milliseconds)
    pub page_load_timeout_ms: u64,

    /// Prefer network-idle as the primary settle condition
    pub wait_for_network_idle: bool,

    /// Sampling policy for links one path segment below the root
    pub level_1: TierPolicy,

    /// Sampling policy for every other discovered link
    pub level_2_plus: TierPolicy,

    /// Drop links whose host differs from the crawl root's host
    pub same_domain_only: bool,

    /// Lowercase substrings that exclude a link
    pub exclude_patterns: Vec<String>,

    /// File extensions (with leading dot, lowercase) that exclude a link
    pub exclude_file_types: Vec<String>,

    /// Screenshot capture settings
    pub capture: CaptureConfig,

    /// Run the bot-protection detector on every fetched page
    pub detect_bot_protection: bool,

    /// Browser launch settings
    pub launch: LaunchConfig,
}

/// Per-tier sampling policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPolicy {
    /// Probability (0..=1) that a single link is retained
    pub sample_rate: f64,

    /// Hard cap on retained links after sampling
    pub max_pages: usize,
}

/// Screenshot capture settings
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub screenshots: bool,
    pub mobile: bool,
    pub format: ImageFormat,
    pub quality: u8,
    pub full_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchConfig {
    pub headless: bool,
    pub executable_path: Option<PathBuf>,
    pub user_agent: String,
    pub mobile_user_agent: String,
}

impl CrawlConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn max_crawl_time(&self) -> Duration {
        Duration::from_millis(self.max_crawl_time_ms)
    }
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub const DEFAULT_MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1";

const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "/cart",
    "/checkout",
    "/wp-admin",
    "/wp-login",
    "/login",
    "/logout",
    "/account",
    "/my-account",
    "?s=",
    "/feed",
    "/wp-json",
    "/xmlrpc",
];

const DEFAULT_EXCLUDE_FILE_TYPES: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".zip", ".rar", ".mp3",
    ".mp4", ".avi", ".mov", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".css", ".js",
    ".xml", ".json",
];

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_total_pages: 30,
            max_concurrent_pages: 3,
            max_crawl_time_ms: 120_000,
            page_load_timeout_ms: 30_000,
            wait_for_network_idle: true,
            level_1: TierPolicy {
                sample_rate: 1.0,
                max_pages: 20,
            },
            level_2_plus: TierPolicy {
                sample_rate: 0.5,
                max_pages: 10,
            },
            same_domain_only: true,
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            exclude_file_types: DEFAULT_EXCLUDE_FILE_TYPES
                .iter()
                .map(|e| e.to_string())
                .collect(),
            capture: CaptureConfig {
                screenshots: true,
                mobile: false,
                format: ImageFormat::Jpeg,
                quality: 80,
                full_page: true,
            },
            detect_bot_protection: true,
            launch: LaunchConfig::default(),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            mobile_user_agent: DEFAULT_MOBILE_USER_AGENT.to_string(),
        }
    }
}

/// Raw configuration document as read from JSON or TOML
///
/// Every field is optional; anything missing keeps its default. Unknown keys
/// are ignored so newer documents still load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub crawling: CrawlingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlingSection {
    #[serde(default)]
    pub depth: DepthSection,
    #[serde(default)]
    pub timeouts: TimeoutsSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub filters: FiltersSection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub detection: DetectionSection,
    #[serde(default)]
    pub browser: BrowserSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepthSection {
    pub level_1: Option<TierSection>,
    pub level_2_plus: Option<TierSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TierSection {
    pub sample_rate: Option<f64>,
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeoutsSection {
    pub page_load_timeout: Option<u64>,
    pub wait_for_network_idle: Option<bool>,
    pub max_crawl_time: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitsSection {
    pub max_total_pages: Option<usize>,
    pub max_concurrent_pages: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersSection {
    pub same_domain_only: Option<bool>,
    pub exclude_patterns: Option<Vec<String>>,
    pub exclude_file_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureSection {
    pub screenshots: Option<bool>,
    pub mobile: Option<bool>,
    pub format: Option<ImageFormat>,
    pub quality: Option<u8>,
    pub full_page: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionSection {
    pub bot_protection: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserSection {
    pub headless: Option<bool>,
    pub executable_path: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub mobile_user_agent: Option<String>,
}
