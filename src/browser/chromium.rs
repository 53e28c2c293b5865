//! Chrome/Chromium driver over the DevTools protocol
//!
//! One [`Browser`] process is launched per crawl. Each [`DriverContext`] maps
//! to a CDP browser context, so cookies and cache are never shared between
//! fetches. Settle conditions are detected by polling the document from
//! inside the page.

use super::{
    BrowserDriver, BrowserError, ContextOptions, DriverContext, DriverPage, NavigationResponse,
    ScreenshotOptions, WaitUntil,
};
use crate::config::{ImageFormat, LaunchConfig};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// How often the settle probe runs while waiting for a navigation
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet window after which the network counts as idle
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Set on the outgoing document so the probe can tell it from the new one
const MARK_DOCUMENT: &str = "window.__siteCrawlPrevious = true";

const SETTLE_PROBE: &str = r#"
    (() => ({
        fresh: window.__siteCrawlPrevious !== true,
        readyState: document.readyState,
        resources: performance.getEntriesByType('resource').length
    }))()
"#;

const STATUS_PROBE: &str = r#"
    (() => {
        const entry = performance.getEntriesByType('navigation')[0];
        return entry && entry.responseStatus ? entry.responseStatus : 0;
    })()
"#;

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::Timeout => BrowserError::Protocol("browser command timed out".to_string()),
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                BrowserError::Disconnected(e.to_string())
            }
            other => BrowserError::Protocol(other.to_string()),
        }
    }
}

/// Headless Chrome/Chromium launched through `chromiumoxide`
pub struct ChromiumDriver {
    browser: Option<Arc<Browser>>,
    handler: Option<JoinHandle<()>>,
    /// Private profile of this browser; removed on close or drop
    profile: Option<TempDir>,
}

impl ChromiumDriver {
    /// Launches the browser process
    ///
    /// The executable is taken from `launch.executable_path`, then the
    /// `CHROMIUM_PATH` environment variable, and otherwise left to
    /// chromiumoxide's own detection.
    pub async fn launch(launch: &LaunchConfig) -> Result<Self, BrowserError> {
        let profile = profile_dir()?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_secs(30))
            .window_size(1920, 1080)
            .user_data_dir(profile.path())
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--mute-audio");

        if !launch.headless {
            builder = builder.with_head();
        }

        let executable = launch
            .executable_path
            .clone()
            .or_else(|| std::env::var_os("CHROMIUM_PATH").map(PathBuf::from));
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        tracing::info!(headless = launch.headless, "Launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
            tracing::debug!("Browser handler task completed");
        });

        Ok(Self {
            browser: Some(Arc::new(browser)),
            handler: Some(handler),
            profile: Some(profile),
        })
    }

    fn browser(&self) -> Result<&Arc<Browser>, BrowserError> {
        self.browser
            .as_ref()
            .ok_or_else(|| BrowserError::Disconnected("browser already closed".to_string()))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn new_context(
        &self,
        options: &ContextOptions,
    ) -> Result<Box<dyn DriverContext>, BrowserError> {
        let browser = self.browser()?.clone();
        let id = browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;

        Ok(Box::new(ChromiumContext {
            browser,
            id,
            options: options.clone(),
        }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };

        let result = match Arc::try_unwrap(browser) {
            Ok(mut browser) => {
                let closed = browser.close().await.map(|_| ());
                if let Err(e) = browser.wait().await {
                    tracing::warn!("Failed waiting for browser exit: {}", e);
                }
                closed.map_err(BrowserError::from)
            }
            // Still referenced by a context; dropping the last handle kills the process
            Err(_) => {
                tracing::warn!("Browser still in use at shutdown");
                Ok(())
            }
        };

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        // Only after the process is gone, so no file in it is still locked
        if let Some(profile) = self.profile.take() {
            let path = profile.path().to_path_buf();
            if let Err(e) = profile.close() {
                tracing::warn!("Failed to remove browser profile {}: {}", path.display(), e);
            }
        }

        result
    }
}

struct ChromiumContext {
    browser: Arc<Browser>,
    id: BrowserContextId,
    options: ContextOptions,
}

#[async_trait]
impl DriverContext for ChromiumContext {
    async fn new_page(&self) -> Result<Box<dyn DriverPage>, BrowserError> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.id.clone())
            .build()
            .map_err(BrowserError::Protocol)?;
        let page = self.browser.new_page(target).await?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(self.options.width as i64)
            .height(self.options.height as i64)
            .device_scale_factor(self.options.device_scale_factor)
            .mobile(self.options.mobile)
            .build()
            .map_err(BrowserError::Protocol)?;
        page.execute(metrics).await?;
        page.execute(SetUserAgentOverrideParams::new(
            self.options.user_agent.clone(),
        ))
        .await?;
        if self.options.mobile {
            page.execute(SetTouchEmulationEnabledParams::new(true)).await?;
        }

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.browser
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await?;
        Ok(())
    }
}

struct ChromiumPage {
    page: Page,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettleProbe {
    fresh: bool,
    ready_state: String,
    resources: u64,
}

impl ChromiumPage {
    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T, BrowserError> {
        self.page
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    /// Polls until the new document satisfies `wait_until`
    ///
    /// Never returns on its own for a page that does not settle; the caller
    /// bounds it with a timeout. Evaluation errors other than a lost browser
    /// count as "not settled yet".
    async fn wait_for(&self, wait_until: WaitUntil) -> Result<(), BrowserError> {
        let mut last_resources = 0;
        let mut quiet_since = Instant::now();

        loop {
            let probe = tolerate(self.evaluate::<SettleProbe>(SETTLE_PROBE).await)?;

            if let Some(probe) = probe.filter(|p| p.fresh) {
                let settled = match wait_until {
                    WaitUntil::DomContentLoaded => probe.ready_state != "loading",
                    WaitUntil::Load => probe.ready_state == "complete",
                    WaitUntil::NetworkIdle => {
                        if probe.resources != last_resources {
                            last_resources = probe.resources;
                            quiet_since = Instant::now();
                        }
                        probe.ready_state == "complete"
                            && quiet_since.elapsed() >= NETWORK_IDLE_WINDOW
                    }
                };
                if settled {
                    return Ok(());
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Fresh, private Chrome profile directory for one launch
fn profile_dir() -> Result<TempDir, BrowserError> {
    tempfile::Builder::new()
        .prefix("site-crawl-")
        .tempdir()
        .map_err(|e| BrowserError::Launch(format!("cannot create profile directory: {}", e)))
}

/// Keeps a lost browser fatal and turns any other evaluation failure into `None`
///
/// A document that is still being replaced (script or meta-refresh redirect
/// right after commit) answers with "execution context destroyed" errors.
fn tolerate<T>(result: Result<T, BrowserError>) -> Result<Option<T>, BrowserError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_disconnected() => Err(e),
        Err(e) => {
            tracing::trace!("Page evaluation failed while navigating: {}", e);
            Ok(None)
        }
    }
}

#[async_trait]
impl DriverPage for ChromiumPage {
    async fn goto(
        &self,
        url: &str,
        wait_until: WaitUntil,
    ) -> Result<NavigationResponse, BrowserError> {
        if let Err(e) = self.page.evaluate(MARK_DOCUMENT).await {
            let e = BrowserError::from(e);
            if e.is_disconnected() {
                return Err(e);
            }
            tracing::trace!("Could not mark outgoing document: {}", e);
        }

        let navigation = self.page.execute(NavigateParams::new(url)).await?;
        if let Some(error_text) = navigation.result.error_text.filter(|t| !t.is_empty()) {
            return Err(BrowserError::Navigation(error_text));
        }

        self.wait_for(wait_until).await?;

        let status = tolerate(self.evaluate::<u16>(STATUS_PROBE).await)?.unwrap_or(0);

        // Older Chrome builds do not expose responseStatus; a committed
        // navigation without an error is a successful document there.
        let status = if status == 0 { 200 } else { status };
        Ok(NavigationResponse::from_status(status))
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn final_url(&self) -> Result<String, BrowserError> {
        self.page
            .url()
            .await?
            .ok_or_else(|| BrowserError::Protocol("page has no URL".to_string()))
    }

    async fn screenshot(&self, options: &ScreenshotOptions) -> Result<Vec<u8>, BrowserError> {
        let mut params = ScreenshotParams::builder().full_page(options.full_page);
        params = match options.format {
            ImageFormat::Jpeg => params
                .format(CaptureScreenshotFormat::Jpeg)
                .quality(options.quality.unwrap_or(80) as i64),
            ImageFormat::Png => params.format(CaptureScreenshotFormat::Png),
        };

        Ok(self.page.screenshot(params.build()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_dirs_are_unique_and_removed() {
        let a = profile_dir().unwrap();
        let b = profile_dir().unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("site-crawl-"));

        let path = a.path().to_path_buf();
        a.close().unwrap();
        assert!(!path.exists());
        assert!(b.path().exists());
    }

    #[test]
    fn test_destroyed_context_keeps_polling() {
        let destroyed: Result<u16, BrowserError> = Err(BrowserError::Protocol(
            "Execution context was destroyed.".to_string(),
        ));
        assert_eq!(tolerate(destroyed).unwrap(), None);
        assert_eq!(tolerate(Ok::<u16, BrowserError>(204)).unwrap(), Some(204));
    }

    #[test]
    fn test_lost_browser_stops_polling() {
        let lost: Result<u16, BrowserError> =
            Err(BrowserError::Disconnected("websocket closed".to_string()));
        assert!(tolerate(lost).unwrap_err().is_disconnected());
    }

    #[test]
    fn test_cdp_error_mapping() {
        assert!(BrowserError::from(CdpError::NoResponse).is_disconnected());
        assert!(!BrowserError::from(CdpError::Timeout).is_timeout());
    }
}
