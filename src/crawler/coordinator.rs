//! Crawl coordinator
//!
//! Ties the pieces together for one crawl invocation:
//! 1. Fetch the homepage (fatal on failure)
//! 2. Extract, filter and deduplicate its links
//! 3. Categorize and sample them into a queue
//! 4. Run the queue through the batch scheduler
//! 5. Aggregate everything into a [`CrawlResult`]
//!
//! The browser session is shut down on every path before the result or the
//! error is returned.

use crate::browser::{BrowserDriver, BrowserSession};
use crate::config::CrawlConfig;
use crate::crawler::aggregator::{aggregate, RunSummary};
use crate::crawler::fetcher::fetch_page;
use crate::crawler::parser::{collect_candidates, LinkRecord};
use crate::crawler::sampler::{build_queue, build_unsampled_queue};
use crate::crawler::scheduler::BatchScheduler;
use crate::crawler::types::{CrawlResult, FetchTask};
use crate::url::{normalize_link, LinkFilter};
use crate::{CrawlError, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::time::Instant;
use url::Url;

/// How the sub-page queue is chosen
enum Selection<'a> {
    /// Links discovered on the homepage, sampled per tier
    Discovered,
    /// An explicit list of pages, not sampled
    Explicit(&'a [String]),
}

/// Runs crawls with a fixed configuration
///
/// # Example
///
/// ```no_run
/// use site_crawl_engine::{CrawlConfig, Crawler};
///
/// # #[cfg(feature = "chromium")]
/// # async fn example() -> site_crawl_engine::Result<()> {
/// use site_crawl_engine::browser::ChromiumDriver;
///
/// let config = CrawlConfig::default();
/// let driver = ChromiumDriver::launch(&config.launch).await?;
/// let result = Crawler::new(config).run("https://example.com", Box::new(driver)).await?;
/// println!("{} pages", result.metadata.total_pages_crawled);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Crawler {
    config: CrawlConfig,
    seed: Option<u64>,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Self { config, seed: None }
    }

    /// Makes sampling reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls a site starting at `root`
    ///
    /// Takes ownership of the launched driver and closes it before returning.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - Possibly partial; check `metadata.failed_pages`,
    ///   `metadata.timed_out` and `metadata.browser_crashed`
    /// * `Err(CrawlError)` - The root was invalid or its fetch failed
    pub async fn run(&self, root: &str, driver: Box<dyn BrowserDriver>) -> Result<CrawlResult> {
        self.run_with(root, driver, Selection::Discovered).await
    }

    /// Crawls the homepage plus an explicit list of pages
    ///
    /// The pages go through the same normalization, filtering and
    /// deduplication as discovered links but are never sampled.
    pub async fn crawl_pages(
        &self,
        root: &str,
        pages: &[String],
        driver: Box<dyn BrowserDriver>,
    ) -> Result<CrawlResult> {
        self.run_with(root, driver, Selection::Explicit(pages)).await
    }

    async fn run_with(
        &self,
        root: &str,
        driver: Box<dyn BrowserDriver>,
        selection: Selection<'_>,
    ) -> Result<CrawlResult> {
        let session = BrowserSession::new(driver, self.config.max_concurrent_pages);
        let outcome = self.crawl(&session, root, selection).await;

        if let Err(e) = session.shutdown().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        outcome
    }

    async fn crawl(
        &self,
        session: &BrowserSession,
        root: &str,
        selection: Selection<'_>,
    ) -> Result<CrawlResult> {
        let started = Instant::now();
        let started_at = Utc::now();
        let root = normalize_link(root)?;

        tracing::info!("Starting crawl of {}", root);

        let homepage = match fetch_page(session, &FetchTask::root(root.as_str()), &self.config).await {
            Ok(page) => page,
            Err(failure) => {
                tracing::error!("Homepage fetch failed for {}: {}", root, failure.error);
                return Err(CrawlError::RootFetch {
                    url: root.to_string(),
                    reason: failure.error,
                });
            }
        };

        // Links are resolved against the real homepage URL, but filtered and
        // categorized relative to its normalized form
        let base = Url::parse(&homepage.url).unwrap_or_else(|_| root.clone());
        let crawl_root = normalize_link(&homepage.url).unwrap_or_else(|_| root.clone());
        if crawl_root != root {
            tracing::info!("Homepage redirected to {}", crawl_root);
        }
        let filter = LinkFilter::new(crawl_root.clone(), &self.config).with_alias(root.clone());

        let (total_links_found, queue) = match selection {
            Selection::Discovered => {
                let candidates = collect_candidates(&homepage.html, &base, &filter);
                let found = candidates.len();
                (found, self.sample_queue(candidates, &crawl_root))
            }
            Selection::Explicit(pages) => {
                let candidates = explicit_candidates(pages, &crawl_root, &filter);
                let found = candidates.len();
                (
                    found,
                    build_unsampled_queue(candidates, &crawl_root, &self.config),
                )
            }
        };

        tracing::info!(
            "Found {} candidate links, queued {} pages",
            total_links_found,
            queue.len()
        );

        let report = BatchScheduler::new(
            &queue,
            self.config.max_concurrent_pages,
            self.config.max_crawl_time(),
            started,
        )
        .run(|task| fetch_page(session, task, &self.config))
        .await;

        let result = aggregate(
            homepage,
            report,
            &self.config,
            RunSummary {
                total_links_found,
                queued_pages: queue.len(),
                crawl_time: started.elapsed(),
                started_at,
                finished_at: Utc::now(),
            },
        );

        tracing::info!(
            "Crawl completed: {} pages crawled, {} failed in {}ms{}",
            result.metadata.total_pages_crawled,
            result.metadata.failed_pages.len(),
            result.metadata.crawl_time_ms,
            if result.metadata.timed_out {
                " (time budget exhausted)"
            } else {
                ""
            }
        );

        Ok(result)
    }

    /// Categorizes and samples candidates into the fetch queue
    fn sample_queue(&self, candidates: Vec<LinkRecord>, root: &Url) -> Vec<FetchTask> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        build_queue(candidates, root, &self.config, &mut rng)
    }
}

/// Normalizes, filters and deduplicates an explicit page list
fn explicit_candidates(pages: &[String], root: &Url, filter: &LinkFilter) -> Vec<LinkRecord> {
    let mut seen = HashSet::new();
    pages
        .iter()
        .filter_map(|page| match normalize_link(page) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Skipping page {}: {}", page, e);
                None
            }
        })
        .filter(|url| filter.accepts(url))
        .filter(|url| seen.insert(url.as_str().to_string()))
        .map(|url| LinkRecord {
            url,
            source: root.to_string(),
        })
        .collect()
}

/// Launches Chromium and crawls `root` with `config`
///
/// # Example
///
/// ```no_run
/// use site_crawl_engine::{crawl_site, CrawlConfig};
///
/// # async fn example() -> site_crawl_engine::Result<()> {
/// let result = crawl_site("https://example.com", CrawlConfig::default()).await?;
/// for page in result.all_pages() {
///     println!("{} ({} bytes)", page.url, page.html.len());
/// }
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "chromium")]
pub async fn crawl_site(root: &str, config: CrawlConfig) -> Result<CrawlResult> {
    let driver = crate::browser::ChromiumDriver::launch(&config.launch).await?;
    Crawler::new(config).run(root, Box::new(driver)).await
}
