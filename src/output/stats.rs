//! Statistics generation from a crawl result
//!
//! This module provides functionality for summarizing a [`CrawlResult`]
//! and displaying it on the console.

use crate::crawler::{CrawlResult, FailureKind};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Pages in the result, homepage included
    pub total_pages: usize,

    /// Count of pages by depth (0 is the homepage)
    pub pages_by_depth: HashMap<u8, usize>,

    /// Failure counts by kind
    pub failures_by_kind: HashMap<FailureKind, usize>,

    /// Candidate links found on the homepage
    pub total_links: usize,

    /// Tasks that were queued after sampling
    pub queued_pages: usize,

    /// Mean page load time (milliseconds)
    pub average_load_time_ms: u64,

    /// Pages that settled only under a fallback strategy
    pub fallback_navigations: usize,

    pub crawl_time_ms: u64,
    pub timed_out: bool,
    pub browser_crashed: bool,
}

impl CrawlStatistics {
    /// Computes statistics from a result
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut pages_by_depth = HashMap::new();
        let mut load_total = 0u64;
        let mut fallback_navigations = 0;

        for page in result.all_pages() {
            *pages_by_depth.entry(page.depth).or_insert(0) += 1;
            load_total += page.load_time_ms;
            if page
                .strategy
                .map(|s| s == crate::browser::WaitUntil::DomContentLoaded)
                .unwrap_or(false)
            {
                fallback_navigations += 1;
            }
        }

        let mut failures_by_kind = HashMap::new();
        for failed in &result.metadata.failed_pages {
            *failures_by_kind.entry(failed.kind).or_insert(0) += 1;
        }

        let total_pages = result.metadata.total_pages_crawled;
        Self {
            total_pages,
            pages_by_depth,
            failures_by_kind,
            total_links: result.metadata.total_links_found,
            queued_pages: result.metadata.queued_pages,
            average_load_time_ms: load_total / total_pages.max(1) as u64,
            fallback_navigations,
            crawl_time_ms: result.metadata.crawl_time_ms,
            timed_out: result.metadata.timed_out,
            browser_crashed: result.metadata.browser_crashed,
        }
    }

    /// Share of queued pages that ended up in the result
    pub fn success_rate(&self) -> f64 {
        if self.queued_pages == 0 {
            return 100.0;
        }
        let crawled_subpages = self.total_pages.saturating_sub(1);
        (crawled_subpages as f64 / self.queued_pages as f64) * 100.0
    }
}

/// Prints a summary of a crawl to stdout
///
/// # Arguments
///
/// * `result` - The crawl result to display
pub fn print_summary(result: &CrawlResult) {
    let stats = CrawlStatistics::from_result(result);

    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Homepage: {}", result.homepage.url);
    println!("  Pages crawled: {}", stats.total_pages);
    println!("  Links found: {}", stats.total_links);
    println!("  Pages queued: {}", stats.queued_pages);
    println!("  Crawl time: {:.1}s", stats.crawl_time_ms as f64 / 1000.0);
    println!("  Average load time: {}ms", stats.average_load_time_ms);
    println!();

    println!("Pages by Depth:");
    let mut depths: Vec<_> = stats.pages_by_depth.iter().collect();
    depths.sort();
    for (depth, count) in depths {
        let label = match depth {
            0 => "homepage".to_string(),
            1 => "level 1".to_string(),
            _ => "level 2+".to_string(),
        };
        println!("  {}: {}", label, count);
    }
    println!();

    if !result.metadata.failed_pages.is_empty() {
        println!("Failed Pages ({}):", result.metadata.failed_pages.len());
        for failed in &result.metadata.failed_pages {
            println!("  - {}: {}", failed.url, failed.error);
        }
        println!();
    }

    if stats.fallback_navigations > 0 {
        println!(
            "Fallback navigations: {} pages settled on domcontentloaded",
            stats.fallback_navigations
        );
    }
    if stats.timed_out {
        println!("⚠ Time budget exhausted; result is partial");
    }
    if stats.browser_crashed {
        println!("⚠ Browser crashed; result is partial");
    }

    println!(
        "Success Rate: {:.1}% ({} / {} queued pages crawled)",
        stats.success_rate(),
        stats.total_pages.saturating_sub(1),
        stats.queued_pages
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::WaitUntil;
    use crate::config::CrawlConfig;
    use crate::crawler::{
        aggregate, FetchFailure, FetchTask, PageFetchResult, RunSummary, ScheduleReport,
        Screenshots,
    };
    use chrono::Utc;
    use std::time::Duration;

    fn page(url: &str, depth: u8, strategy: WaitUntil, load_time_ms: u64) -> PageFetchResult {
        PageFetchResult {
            url: url.to_string(),
            requested_url: url.to_string(),
            html: String::new(),
            depth,
            load_time_ms,
            discovered_from: None,
            success: true,
            error: None,
            strategy: Some(strategy),
            status: Some(200),
            title: None,
            bot_detection: None,
            screenshots: Screenshots::default(),
        }
    }

    #[test]
    fn test_statistics_from_result() {
        let result = aggregate(
            page("https://example.com/", 0, WaitUntil::NetworkIdle, 100),
            ScheduleReport {
                outcomes: vec![
                    Ok(page("https://example.com/a", 1, WaitUntil::DomContentLoaded, 200)),
                    Ok(page("https://example.com/b/c", 2, WaitUntil::NetworkIdle, 300)),
                    Err(FetchFailure::new(
                        &FetchTask::root("https://example.com/d"),
                        FailureKind::Timeout,
                        "timeout",
                    )),
                ],
                timed_out: false,
                browser_crashed: false,
                batches: 1,
            },
            &CrawlConfig::default(),
            RunSummary {
                total_links_found: 5,
                queued_pages: 3,
                crawl_time: Duration::from_millis(900),
                started_at: Utc::now(),
                finished_at: Utc::now(),
            },
        );

        let stats = CrawlStatistics::from_result(&result);
        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.pages_by_depth.get(&0), Some(&1));
        assert_eq!(stats.pages_by_depth.get(&2), Some(&1));
        assert_eq!(stats.failures_by_kind.get(&FailureKind::Timeout), Some(&1));
        assert_eq!(stats.average_load_time_ms, 200);
        assert_eq!(stats.fallback_navigations, 1);
        assert!((stats.success_rate() - 66.666).abs() < 0.1);
    }
}
