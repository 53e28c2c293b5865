//! Scripted in-memory browser for driving whole crawls in tests
//!
//! Pages are keyed by the exact URL the crawler navigates to. Unknown URLs
//! answer 404. Every context, navigation and screenshot is recorded in
//! [`Recorder`] so tests can assert on what the crawler did.

use async_trait::async_trait;
use site_crawl_engine::browser::{
    BrowserDriver, BrowserError, ContextOptions, DriverContext, DriverPage, NavigationResponse,
    ScreenshotOptions, WaitUntil,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ROOT: &str = "https://example.com/";

/// Scripted behaviour of one URL
#[derive(Debug, Clone)]
pub struct MockPage {
    pub status: u16,
    pub html: String,
    pub delay: Duration,
    pub hang_on: Vec<WaitUntil>,
    pub error: Option<BrowserError>,
    pub final_url: Option<String>,
}

impl MockPage {
    pub fn ok(html: String) -> Self {
        Self {
            status: 200,
            html,
            delay: Duration::ZERO,
            hang_on: Vec::new(),
            error: None,
            final_url: None,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Never settles under these conditions
    pub fn hang_on(mut self, strategies: &[WaitUntil]) -> Self {
        self.hang_on = strategies.to_vec();
        self
    }

    pub fn fail_with(mut self, error: BrowserError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn redirect_to(mut self, url: &str) -> Self {
        self.final_url = Some(url.to_string());
        self
    }
}

/// A realistic page body linking to `links`
///
/// Padded well above the minimal-content size so it never looks like a
/// block page.
pub fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{}">{}</a></li>"#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><nav><ul>{}</ul></nav><main><p>{}</p></main></body></html>",
        title,
        anchors,
        "Family-owned bakery serving fresh bread and pastries every morning. ".repeat(12)
    )
}

/// Everything the crawler did to the browser
#[derive(Debug, Default)]
pub struct Recorder {
    pub open_contexts: AtomicUsize,
    pub peak_contexts: AtomicUsize,
    pub contexts_created: AtomicUsize,
    pub mobile_contexts: AtomicUsize,
    pub browser_closes: AtomicUsize,
    pub navigations: Mutex<Vec<(String, WaitUntil)>>,
    pub screenshots: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn peak(&self) -> usize {
        self.peak_contexts.load(Ordering::SeqCst)
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    pub fn screenshot_urls(&self) -> Vec<String> {
        self.screenshots.lock().unwrap().clone()
    }
}

/// Builder for a scripted site
#[derive(Debug, Default, Clone)]
pub struct MockSite {
    pages: HashMap<String, MockPage>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: MockPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Launches the scripted browser
    pub fn launch(self) -> (Box<dyn BrowserDriver>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let driver = MockDriver {
            site: Arc::new(self),
            recorder: recorder.clone(),
        };
        (Box::new(driver), recorder)
    }

    fn lookup(&self, url: &str) -> MockPage {
        self.pages.get(url).cloned().unwrap_or_else(|| {
            MockPage::ok(html_page("Not Found", &[])).status(404)
        })
    }
}

struct MockDriver {
    site: Arc<MockSite>,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn new_context(
        &self,
        options: &ContextOptions,
    ) -> Result<Box<dyn DriverContext>, BrowserError> {
        let open = self.recorder.open_contexts.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.peak_contexts.fetch_max(open, Ordering::SeqCst);
        self.recorder.contexts_created.fetch_add(1, Ordering::SeqCst);
        if options.mobile {
            self.recorder.mobile_contexts.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Box::new(MockContext {
            site: self.site.clone(),
            recorder: self.recorder.clone(),
        }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.recorder.browser_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockContext {
    site: Arc<MockSite>,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl DriverContext for MockContext {
    async fn new_page(&self) -> Result<Box<dyn DriverPage>, BrowserError> {
        Ok(Box::new(MockTab {
            site: self.site.clone(),
            recorder: self.recorder.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.recorder.open_contexts.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockTab {
    site: Arc<MockSite>,
    recorder: Arc<Recorder>,
    current: Mutex<Option<(String, MockPage)>>,
}

#[async_trait]
impl DriverPage for MockTab {
    async fn goto(
        &self,
        url: &str,
        wait_until: WaitUntil,
    ) -> Result<NavigationResponse, BrowserError> {
        self.recorder
            .navigations
            .lock()
            .unwrap()
            .push((url.to_string(), wait_until));

        let page = self.site.lookup(url);
        if let Some(error) = page.error.clone() {
            return Err(error);
        }
        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }
        if page.hang_on.contains(&wait_until) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let final_url = page.final_url.clone().unwrap_or_else(|| url.to_string());
        let status = page.status;
        *self.current.lock().unwrap() = Some((final_url, page));
        Ok(NavigationResponse::from_status(status))
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, page)| page.html.clone())
            .unwrap_or_default())
    }

    async fn final_url(&self) -> Result<String, BrowserError> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(url, _)| url.clone())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn screenshot(&self, _options: &ScreenshotOptions) -> Result<Vec<u8>, BrowserError> {
        let url = self.final_url().await?;
        self.recorder.screenshots.lock().unwrap().push(url);
        Ok(vec![0xFF, 0xD8, 0xFF])
    }
}
