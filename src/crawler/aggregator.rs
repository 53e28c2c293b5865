//! Result aggregation
//!
//! Merges the homepage and the scheduler's outcomes into one [`CrawlResult`].
//! Queue order is preserved. Successes that landed on an already-seen final
//! URL (usually through a redirect) are dropped, and failures for URLs that
//! also appear as pages are dropped, so `pages` and `failedPages` never
//! overlap.

use crate::config::CrawlConfig;
use crate::crawler::scheduler::ScheduleReport;
use crate::crawler::types::{
    CrawlMetadata, CrawlResult, FailedPage, PageFetchResult, SampleRates,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;

/// Run-level facts the aggregator stamps into the metadata
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total_links_found: usize,
    pub queued_pages: usize,
    pub crawl_time: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Assembles the final result
///
/// # Arguments
///
/// * `homepage` - The successfully fetched crawl root
/// * `report` - Everything the scheduler ran
/// * `config` - The configuration in effect
/// * `summary` - Counts and timing of the run
pub fn aggregate(
    homepage: PageFetchResult,
    report: ScheduleReport,
    config: &CrawlConfig,
    summary: RunSummary,
) -> CrawlResult {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(homepage.url.clone());
    seen.insert(homepage.requested_url.clone());

    let mut pages = Vec::new();
    let mut failures = Vec::new();

    for outcome in report.outcomes {
        match outcome {
            Ok(page) => {
                if seen.insert(page.url.clone()) {
                    pages.push(page);
                } else {
                    tracing::debug!(
                        "Dropping {} (resolved to already crawled {})",
                        page.requested_url,
                        page.url
                    );
                }
            }
            Err(failure) => failures.push(failure),
        }
    }

    let failed_pages: Vec<FailedPage> = failures
        .into_iter()
        .filter(|failure| !seen.contains(&failure.url))
        .map(FailedPage::from)
        .collect();

    let metadata = CrawlMetadata {
        total_pages_crawled: pages.len() + 1,
        total_links_found: summary.total_links_found,
        crawl_time_ms: summary.crawl_time.as_millis() as u64,
        sample_rates_used: SampleRates {
            level1: config.level_1,
            level2_plus: config.level_2_plus,
        },
        failed_pages,
        timed_out: report.timed_out,
        browser_crashed: report.browser_crashed,
        queued_pages: summary.queued_pages,
        started_at: summary.started_at,
        finished_at: summary.finished_at,
    };

    CrawlResult {
        homepage,
        pages,
        metadata,
    }
}
