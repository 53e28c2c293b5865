use super::{BrowserDriver, BrowserError, ContextOptions, DriverContext, DriverPage};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Owns the single browser process of one crawl
///
/// Every fetch gets its own [`IsolatedContext`], but all contexts share the
/// underlying browser. The number of simultaneously open contexts is bounded
/// by the `max_concurrent_pages` semaphore passed to [`BrowserSession::new`].
///
/// The session is consumed by [`BrowserSession::shutdown`], so the browser is
/// closed at most once; callers run it on both the success and the error path.
pub struct BrowserSession {
    driver: Box<dyn BrowserDriver>,
    permits: Arc<Semaphore>,
    max_contexts: usize,
}

/// A context checked out of a [`BrowserSession`]
///
/// Holds a concurrency permit until it is handed back through
/// [`BrowserSession::close_context`].
pub struct IsolatedContext {
    context: Box<dyn DriverContext>,
    mobile: bool,
    _permit: OwnedSemaphorePermit,
}

impl IsolatedContext {
    pub async fn new_page(&self) -> Result<Box<dyn DriverPage>, BrowserError> {
        self.context.new_page().await
    }

    /// True when the context emulates a mobile device
    pub fn is_mobile(&self) -> bool {
        self.mobile
    }
}

impl BrowserSession {
    /// Wraps a launched driver
    ///
    /// # Arguments
    ///
    /// * `driver` - The launched browser
    /// * `max_contexts` - Upper bound on simultaneously open contexts (at least 1)
    pub fn new(driver: Box<dyn BrowserDriver>, max_contexts: usize) -> Self {
        let max_contexts = max_contexts.max(1);
        Self {
            driver,
            permits: Arc::new(Semaphore::new(max_contexts)),
            max_contexts,
        }
    }

    /// Opens a fresh context with its own cookies, cache and viewport
    ///
    /// Waits for a free slot when `max_contexts` contexts are already open.
    pub async fn new_isolated_context(
        &self,
        options: &ContextOptions,
    ) -> Result<IsolatedContext, BrowserError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BrowserError::Disconnected("browser session is closed".to_string()))?;

        let context = self.driver.new_context(options).await?;
        tracing::trace!(
            open = self.open_contexts(),
            mobile = options.mobile,
            "Opened browser context"
        );

        Ok(IsolatedContext {
            context,
            mobile: options.mobile,
            _permit: permit,
        })
    }

    /// Disposes a context and frees its slot
    ///
    /// Close failures are logged and swallowed; they never abort the crawl.
    pub async fn close_context(&self, context: IsolatedContext) {
        if let Err(e) = context.context.close().await {
            tracing::warn!("Failed to close browser context: {}", e);
        }
        drop(context);
    }

    /// Number of contexts currently checked out
    pub fn open_contexts(&self) -> usize {
        self.max_contexts - self.permits.available_permits()
    }

    /// Closes the browser process
    pub async fn shutdown(mut self) -> Result<(), BrowserError> {
        self.permits.close();
        tracing::debug!("Shutting down browser session");
        self.driver.close().await
    }
}
