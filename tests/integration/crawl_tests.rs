//! Integration tests for the site crawl engine
//!
//! Whole crawls run against a scripted in-memory browser (see `support.rs`),
//! so these exercise sampling, scheduling, navigation fallback, bot detection
//! and aggregation together without launching Chromium.

mod support;

use site_crawl_engine::browser::{BrowserError, WaitUntil};
use site_crawl_engine::config::TierPolicy;
use site_crawl_engine::crawler::FailureKind;
use site_crawl_engine::{CrawlConfig, CrawlError, Crawler};
use std::sync::atomic::Ordering;
use support::{html_page, MockPage, MockSite, ROOT};

fn test_config() -> CrawlConfig {
    CrawlConfig {
        page_load_timeout_ms: 200,
        level_2_plus: TierPolicy {
            sample_rate: 1.0,
            max_pages: 10,
        },
        ..CrawlConfig::default()
    }
}

fn page_url(path: &str) -> String {
    format!("https://example.com{}", path)
}

/// A homepage linking to `/page-0` .. `/page-{count-1}`, each answering 200
fn site_with_pages(count: usize) -> MockSite {
    let paths: Vec<String> = (0..count).map(|i| format!("/page-{}", i)).collect();
    let links: Vec<&str> = paths.iter().map(String::as_str).collect();

    let mut site = MockSite::new().page(ROOT, MockPage::ok(html_page("Home", &links)));
    for path in &paths {
        site = site.page(&page_url(path), MockPage::ok(html_page(path, &[])));
    }
    site
}

#[tokio::test]
async fn test_crawl_collects_homepage_and_links() {
    let (driver, recorder) = site_with_pages(4).launch();

    let result = Crawler::new(test_config())
        .with_seed(1)
        .run("https://example.com", driver)
        .await
        .unwrap();

    assert_eq!(result.homepage.url, ROOT);
    assert_eq!(result.homepage.depth, 0);
    assert_eq!(result.homepage.title.as_deref(), Some("Home"));
    assert_eq!(result.pages.len(), 4);
    assert!(result.pages.iter().all(|p| p.depth == 1 && p.success));
    assert_eq!(result.metadata.total_pages_crawled, 5);
    assert_eq!(result.metadata.total_links_found, 4);
    assert_eq!(result.metadata.queued_pages, 4);
    assert!(result.is_complete());

    // One desktop screenshot per page
    assert_eq!(recorder.screenshot_urls().len(), 5);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let paths: Vec<String> = (0..9).map(|i| format!("/page-{}", i)).collect();
    let links: Vec<&str> = paths.iter().map(String::as_str).collect();
    let mut site = MockSite::new().page(ROOT, MockPage::ok(html_page("Home", &links)));
    for path in &paths {
        site = site.page(
            &page_url(path),
            MockPage::ok(html_page(path, &[])).delay_ms(30),
        );
    }
    let (driver, recorder) = site.launch();

    let config = CrawlConfig {
        max_concurrent_pages: 3,
        ..test_config()
    };
    let result = Crawler::new(config)
        .with_seed(2)
        .run(ROOT, driver)
        .await
        .unwrap();

    assert_eq!(result.pages.len(), 9);
    assert!(recorder.peak() <= 3, "peak was {}", recorder.peak());
    assert_eq!(recorder.open_contexts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_partial_failure_keeps_successful_pages() {
    let site = site_with_pages(10)
        .page(&page_url("/page-3"), MockPage::ok(html_page("Down", &[])).status(500))
        .page(
            &page_url("/page-7"),
            MockPage::ok(html_page("Gone", &[])).fail_with(BrowserError::Navigation(
                "net::ERR_CONNECTION_REFUSED".to_string(),
            )),
        );
    let (driver, _recorder) = site.launch();

    let result = Crawler::new(test_config())
        .with_seed(3)
        .run(ROOT, driver)
        .await
        .unwrap();

    assert_eq!(result.pages.len(), 8);
    assert_eq!(result.metadata.failed_pages.len(), 2);
    assert_eq!(result.metadata.total_pages_crawled, 9);
    assert!(!result.is_complete());

    let failed_urls: Vec<&str> = result
        .metadata
        .failed_pages
        .iter()
        .map(|f| f.url.as_str())
        .collect();
    assert!(failed_urls.contains(&page_url("/page-3").as_str()));
    assert!(failed_urls.contains(&page_url("/page-7").as_str()));

    let http = result
        .metadata
        .failed_pages
        .iter()
        .find(|f| f.kind == FailureKind::HttpStatus)
        .unwrap();
    assert_eq!(http.error, "HTTP 500");

    // No URL is both a success and a failure
    for page in &result.pages {
        assert!(!failed_urls.contains(&page.url.as_str()));
    }
}

#[tokio::test]
async fn test_homepage_failure_is_fatal() {
    let site = MockSite::new().page(
        ROOT,
        MockPage::ok(html_page("Error", &["/about"])).status(500),
    );
    let (driver, recorder) = site.launch();

    let err = Crawler::new(test_config())
        .run(ROOT, driver)
        .await
        .unwrap_err();

    match err {
        CrawlError::RootFetch { url, reason } => {
            assert_eq!(url, ROOT);
            assert!(reason.contains("500"));
        }
        other => panic!("expected RootFetch, got {:?}", other),
    }
    assert_eq!(recorder.browser_closes.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.navigations_to(&page_url("/about")), 0);
}

#[tokio::test]
async fn test_invalid_root_is_rejected() {
    let (driver, recorder) = MockSite::new().launch();

    let err = Crawler::new(test_config())
        .run("ftp://example.com/", driver)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::InvalidRoot(_)));
    assert_eq!(recorder.browser_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_browser_closed_once_after_success() {
    let (driver, recorder) = site_with_pages(2).launch();

    Crawler::new(test_config()).run(ROOT, driver).await.unwrap();

    assert_eq!(recorder.browser_closes.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.open_contexts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_time_budget_stops_scheduling() {
    let site = site_with_pages(5).page(
        ROOT,
        MockPage::ok(html_page(
            "Home",
            &["/page-0", "/page-1", "/page-2", "/page-3", "/page-4"],
        ))
        .delay_ms(20),
    );
    let (driver, _recorder) = site.launch();

    let config = CrawlConfig {
        max_crawl_time_ms: 1,
        ..test_config()
    };
    let result = Crawler::new(config).run(ROOT, driver).await.unwrap();

    assert!(result.metadata.timed_out);
    assert_eq!(result.metadata.total_pages_crawled, 1);
    assert_eq!(result.metadata.queued_pages, 5);
    assert!(result.pages.is_empty());
    // Tasks never started are not reported as failures
    assert!(result.metadata.failed_pages.is_empty());
}

#[tokio::test]
async fn test_rate_limited_page_is_bot_protected() {
    let site = site_with_pages(2).page(
        &page_url("/page-1"),
        MockPage::ok(html_page("Slow down", &[])).status(429),
    );
    let (driver, recorder) = site.launch();

    let result = Crawler::new(test_config()).run(ROOT, driver).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    let failed = &result.metadata.failed_pages[0];
    assert_eq!(failed.url, page_url("/page-1"));
    assert_eq!(failed.kind, FailureKind::BotProtected);
    assert!(failed.error.contains("1.00"));
    assert!(failed.indicators.iter().any(|i| i.contains("429")));

    // Blocked pages are never screenshotted
    assert!(!recorder.screenshot_urls().contains(&page_url("/page-1")));
}

#[tokio::test]
async fn test_network_idle_timeout_falls_back() {
    let site = site_with_pages(2).page(
        &page_url("/page-0"),
        MockPage::ok(html_page("Chatty", &[])).hang_on(&[WaitUntil::NetworkIdle]),
    );
    let (driver, recorder) = site.launch();

    let config = CrawlConfig {
        page_load_timeout_ms: 50,
        ..test_config()
    };
    let result = Crawler::new(config).run(ROOT, driver).await.unwrap();

    let chatty = result
        .pages
        .iter()
        .find(|p| p.url == page_url("/page-0"))
        .unwrap();
    assert_eq!(chatty.strategy, Some(WaitUntil::DomContentLoaded));
    assert_eq!(recorder.navigations_to(&page_url("/page-0")), 2);

    let quiet = result
        .pages
        .iter()
        .find(|p| p.url == page_url("/page-1"))
        .unwrap();
    assert_eq!(quiet.strategy, Some(WaitUntil::NetworkIdle));

    let json = serde_json::to_value(chatty).unwrap();
    assert_eq!(json["strategy"], "domcontentloaded");
}

#[tokio::test]
async fn test_page_timing_out_everywhere_fails() {
    let site = site_with_pages(1).page(
        &page_url("/page-0"),
        MockPage::ok(html_page("Stuck", &[]))
            .hang_on(&[WaitUntil::NetworkIdle, WaitUntil::DomContentLoaded]),
    );
    let (driver, _recorder) = site.launch();

    let config = CrawlConfig {
        page_load_timeout_ms: 30,
        ..test_config()
    };
    let result = Crawler::new(config).run(ROOT, driver).await.unwrap();

    assert!(result.pages.is_empty());
    assert_eq!(result.metadata.failed_pages[0].kind, FailureKind::Timeout);
    assert!(!result.metadata.timed_out);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let site = MockSite::new()
        .page(
            ROOT,
            MockPage::ok(html_page(
                "Home",
                &[
                    "/about",
                    "/about/",
                    "/about#team",
                    "https://example.com/about",
                    "/contact",
                    "/cart",
                    "/brochure.pdf",
                    "https://other.com/partner",
                    "/",
                ],
            )),
        )
        .page(&page_url("/about"), MockPage::ok(html_page("About", &[])))
        .page(&page_url("/contact"), MockPage::ok(html_page("Contact", &[])));
    let (driver, recorder) = site.launch();

    let result = Crawler::new(test_config()).run(ROOT, driver).await.unwrap();

    assert_eq!(result.metadata.total_links_found, 2);
    assert_eq!(result.pages.len(), 2);
    assert_eq!(recorder.navigations_to(&page_url("/about")), 1);
    assert_eq!(recorder.navigations_to(ROOT), 1);
}

#[tokio::test]
async fn test_queue_respects_max_total_pages() {
    let (driver, _recorder) = site_with_pages(12).launch();

    let config = CrawlConfig {
        max_total_pages: 5,
        ..test_config()
    };
    let result = Crawler::new(config)
        .with_seed(4)
        .run(ROOT, driver)
        .await
        .unwrap();

    assert_eq!(result.metadata.total_links_found, 12);
    assert_eq!(result.metadata.queued_pages, 4);
    assert_eq!(result.metadata.total_pages_crawled, 5);
}

#[tokio::test]
async fn test_redirected_homepage_becomes_crawl_root() {
    let site = MockSite::new()
        .page(
            ROOT,
            MockPage::ok(html_page("Home", &["/about", "https://example.com/legacy"]))
                .redirect_to("https://www.example.com/"),
        )
        .page(
            "https://www.example.com/about",
            MockPage::ok(html_page("About", &[])),
        );
    let (driver, _recorder) = site.launch();

    let result = Crawler::new(test_config()).run(ROOT, driver).await.unwrap();

    assert_eq!(result.homepage.url, "https://www.example.com/");
    assert_eq!(result.homepage.requested_url, ROOT);
    // The old host is now off-domain
    assert_eq!(result.metadata.total_links_found, 1);
    assert_eq!(result.pages[0].url, "https://www.example.com/about");
    assert_eq!(
        result.pages[0].discovered_from.as_deref(),
        Some("https://www.example.com/")
    );
}

#[tokio::test]
async fn test_redirected_homepage_does_not_queue_requested_root() {
    let site = MockSite::new()
        .page(
            ROOT,
            MockPage::ok(html_page(
                "Home",
                &["/", "https://example.com", "/home", "/about"],
            ))
            .redirect_to("https://example.com/home"),
        )
        .page(&page_url("/about"), MockPage::ok(html_page("About", &[])));
    let (driver, recorder) = site.launch();

    let result = Crawler::new(test_config()).run(ROOT, driver).await.unwrap();

    assert_eq!(result.homepage.url, page_url("/home"));
    assert_eq!(result.metadata.total_links_found, 1);
    assert_eq!(result.metadata.queued_pages, 1);
    assert_eq!(recorder.navigations_to(ROOT), 1);
    let urls: Vec<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec![page_url("/about").as_str()]);
}

#[tokio::test]
async fn test_browser_crash_stops_crawl() {
    let crashed = || {
        MockPage::ok(html_page("Crash", &[]))
            .fail_with(BrowserError::Disconnected("websocket closed".to_string()))
    };
    let site = (0..6).fold(site_with_pages(6), |site, i| {
        site.page(&page_url(&format!("/page-{}", i)), crashed())
    });
    let (driver, recorder) = site.launch();

    let config = CrawlConfig {
        max_concurrent_pages: 2,
        ..test_config()
    };
    let result = Crawler::new(config).run(ROOT, driver).await.unwrap();

    assert!(result.metadata.browser_crashed);
    assert!(!result.metadata.timed_out);
    assert_eq!(result.metadata.failed_pages.len(), 2);
    assert!(result
        .metadata
        .failed_pages
        .iter()
        .all(|f| f.kind == FailureKind::BrowserCrashed));
    assert_eq!(result.metadata.total_pages_crawled, 1);
    assert_eq!(recorder.browser_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mobile_capture_uses_second_context() {
    let (driver, recorder) = site_with_pages(2).launch();

    let mut config = test_config();
    config.capture.mobile = true;
    let result = Crawler::new(config).run(ROOT, driver).await.unwrap();

    assert_eq!(result.metadata.total_pages_crawled, 3);
    assert!(result
        .all_pages()
        .all(|p| p.screenshots.desktop.is_some() && p.screenshots.mobile.is_some()));
    assert_eq!(recorder.mobile_contexts.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.contexts_created.load(Ordering::SeqCst), 6);
    assert_eq!(recorder.open_contexts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_screenshots_disabled() {
    let (driver, recorder) = site_with_pages(2).launch();

    let mut config = test_config();
    config.capture.screenshots = false;
    config.capture.mobile = true;
    let result = Crawler::new(config).run(ROOT, driver).await.unwrap();

    assert!(result.all_pages().all(|p| p.screenshots.is_empty()));
    assert!(recorder.screenshot_urls().is_empty());
    assert_eq!(recorder.mobile_contexts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_crawl_explicit_pages() {
    let (driver, recorder) = site_with_pages(6).launch();

    let pages: Vec<String> = vec![
        page_url("/page-4"),
        page_url("/page-1/"),
        page_url("/page-1"),
        "https://other.com/page".to_string(),
    ];
    let result = Crawler::new(test_config())
        .crawl_pages(ROOT, &pages, driver)
        .await
        .unwrap();

    let urls: Vec<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls.len(), 2);
    assert!(urls.contains(&page_url("/page-4").as_str()));
    assert!(urls.contains(&page_url("/page-1").as_str()));
    assert_eq!(result.metadata.total_links_found, 2);
    assert_eq!(recorder.navigations_to(&page_url("/page-0")), 0);
}

#[tokio::test]
async fn test_result_serializes_camel_case() {
    let (driver, _recorder) = site_with_pages(1).launch();

    let result = Crawler::new(test_config()).run(ROOT, driver).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["homepage"]["requestedUrl"], ROOT);
    assert_eq!(json["metadata"]["totalPagesCrawled"], 2);
    assert_eq!(json["metadata"]["sampleRatesUsed"]["level1"]["sampleRate"], 1.0);
    assert!(json["metadata"]["failedPages"].as_array().unwrap().is_empty());
    assert!(json["homepage"].get("screenshots").is_none());
}
