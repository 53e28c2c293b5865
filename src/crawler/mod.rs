//! Crawler module for discovering and fetching a site's pages
//!
//! This module contains the core crawling logic, including:
//! - HTML parsing and link extraction
//! - Per-tier sampling of discovered links
//! - Navigation with settle-condition fallback
//! - Bot-protection detection
//! - Batch scheduling under a concurrency limit and time budget
//! - Result aggregation and overall crawl coordination

mod aggregator;
mod bot_detection;
mod coordinator;
mod fetcher;
mod navigation;
mod parser;
mod sampler;
mod scheduler;
mod types;

pub use aggregator::{aggregate, RunSummary};
pub use bot_detection::{detect_bot_protection, BotDetection, CONFIDENCE_THRESHOLD};
#[cfg(feature = "chromium")]
pub use coordinator::crawl_site;
pub use coordinator::Crawler;
pub use fetcher::fetch_page;
pub use navigation::{Navigated, NavigationEngine};
pub use parser::{collect_candidates, page_title, LinkRecord};
pub use sampler::{build_queue, build_unsampled_queue, partition_by_tier, sample};
pub use scheduler::{BatchScheduler, ScheduleReport};
pub use types::{
    CrawlMetadata, CrawlResult, FailedPage, FailureKind, FetchFailure, FetchOutcome, FetchTask,
    PageFetchResult, SampleRates, Screenshots,
};
