//! Data model of a crawl run
//!
//! Everything here is a plain value: tasks are built before any fetch starts,
//! fetch outcomes are moved into the aggregator, and the final
//! [`CrawlResult`] is never mutated after assembly.

use crate::browser::{BrowserError, WaitUntil};
use crate::config::TierPolicy;
use crate::crawler::bot_detection::BotDetection;
use crate::url::DepthTier;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One queued unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTask {
    pub url: String,

    /// 0 for the homepage, 1 for Level1, 2 for Level2Plus
    pub depth: u8,

    pub discovered_from: Option<String>,
}

impl FetchTask {
    /// The crawl root
    pub fn root(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            discovered_from: None,
        }
    }

    /// A link found on `source`
    pub fn discovered(url: impl Into<String>, tier: DepthTier, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: tier.level(),
            discovered_from: Some(source.into()),
        }
    }
}

/// Screenshot bytes captured for a page
///
/// Not part of the JSON output; the CLI writes them as separate files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screenshots {
    pub desktop: Option<Vec<u8>>,
    pub mobile: Option<Vec<u8>>,
}

impl Screenshots {
    pub fn is_empty(&self) -> bool {
        self.desktop.is_none() && self.mobile.is_none()
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFetchResult {
    /// Final URL after redirects
    pub url: String,

    /// URL the task asked for
    pub requested_url: String,

    pub html: String,
    pub depth: u8,
    pub load_time_ms: u64,
    pub discovered_from: Option<String>,
    pub success: bool,
    pub error: Option<String>,

    /// Settle condition that finally succeeded
    pub strategy: Option<WaitUntil>,

    /// Main-document HTTP status
    pub status: Option<u16>,

    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_detection: Option<BotDetection>,

    #[serde(skip)]
    pub screenshots: Screenshots,
}

/// Why a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Every settle condition timed out
    Timeout,
    /// DNS, TLS, refused or aborted navigation
    Navigation,
    /// Response present but not OK
    HttpStatus,
    /// Challenge, block or rate-limit page
    BotProtected,
    /// The browser process went away
    BrowserCrashed,
    /// Any other browser-layer error
    Browser,
}

impl From<&BrowserError> for FailureKind {
    fn from(e: &BrowserError) -> Self {
        match e {
            BrowserError::Timeout { .. } => Self::Timeout,
            BrowserError::Navigation(_) => Self::Navigation,
            BrowserError::Disconnected(_) => Self::BrowserCrashed,
            BrowserError::Protocol(_) | BrowserError::Launch(_) => Self::Browser,
        }
    }
}

/// A failed fetch, as produced by a worker
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub url: String,
    pub error: String,
    pub kind: FailureKind,
    pub depth: u8,
    pub load_time_ms: u64,
    pub indicators: Vec<String>,
    pub bot_detection: Option<BotDetection>,
}

impl FetchFailure {
    pub fn new(task: &FetchTask, kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            url: task.url.clone(),
            error: error.into(),
            kind,
            depth: task.depth,
            load_time_ms: 0,
            indicators: Vec::new(),
            bot_detection: None,
        }
    }

    pub fn from_browser_error(task: &FetchTask, error: &BrowserError) -> Self {
        Self::new(task, FailureKind::from(error), error.to_string())
    }
}

/// Tagged outcome of one fetch
pub type FetchOutcome = std::result::Result<PageFetchResult, FetchFailure>;

/// Failure entry in the crawl metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPage {
    pub url: String,
    pub error: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indicators: Vec<String>,
}

impl From<FetchFailure> for FailedPage {
    fn from(failure: FetchFailure) -> Self {
        Self {
            url: failure.url,
            error: failure.error,
            kind: failure.kind,
            indicators: failure.indicators,
        }
    }
}

/// Tier policies in effect for a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRates {
    pub level1: TierPolicy,
    pub level2_plus: TierPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlMetadata {
    /// Pages in the result, homepage included
    pub total_pages_crawled: usize,

    /// Candidate links after filtering and deduplication, before sampling
    pub total_links_found: usize,

    pub crawl_time_ms: u64,
    pub sample_rates_used: SampleRates,
    pub failed_pages: Vec<FailedPage>,

    /// Scheduling stopped because the time budget ran out
    pub timed_out: bool,

    /// Scheduling stopped because the browser went away
    pub browser_crashed: bool,

    /// Tasks in the queue after sampling
    pub queued_pages: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Complete output of one crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub homepage: PageFetchResult,
    pub pages: Vec<PageFetchResult>,
    pub metadata: CrawlMetadata,
}

impl CrawlResult {
    /// True when nothing failed and nothing was cut short
    pub fn is_complete(&self) -> bool {
        self.metadata.failed_pages.is_empty()
            && !self.metadata.timed_out
            && !self.metadata.browser_crashed
    }

    /// Homepage followed by every sub-page, in queue order
    pub fn all_pages(&self) -> impl Iterator<Item = &PageFetchResult> {
        std::iter::once(&self.homepage).chain(self.pages.iter())
    }
}
