//! Headless browser automation seam
//!
//! The crawl engine talks to the browser only through the three traits in this
//! module:
//! - [`BrowserDriver`]: one launched browser process
//! - [`DriverContext`]: an isolated context (own cookies, cache and viewport)
//! - [`DriverPage`]: a tab inside a context
//!
//! [`BrowserSession`] wraps a driver and owns its lifecycle for one crawl.
//! The production driver is [`ChromiumDriver`] (feature `chromium`).

#[cfg(feature = "chromium")]
mod chromium;
mod session;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumDriver;
pub use session::{BrowserSession, IsolatedContext};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised by the browser automation layer
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    /// The settle condition was not reached within the budget
    #[error("Navigation timeout after {timeout_ms}ms waiting for {wait_until}")]
    Timeout { wait_until: WaitUntil, timeout_ms: u64 },

    /// The navigation itself failed (DNS, TLS, aborted, refused)
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A browser command failed
    #[error("Browser protocol error: {0}")]
    Protocol(String),

    /// The browser could not be started
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// The browser process died or the connection to it was lost
    #[error("Browser disconnected: {0}")]
    Disconnected(String),
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

/// Condition after which a navigation counts as settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WaitUntil {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main-document response of a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationResponse {
    pub status: u16,
    pub ok: bool,
}

impl NavigationResponse {
    pub fn from_status(status: u16) -> Self {
        Self {
            status,
            ok: (200..300).contains(&status),
        }
    }
}

/// Viewport and identity of an isolated context
#[derive(Debug, Clone, PartialEq)]
pub struct ContextOptions {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub user_agent: String,
    pub mobile: bool,
}

impl ContextOptions {
    pub fn desktop(user_agent: &str) -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
            user_agent: user_agent.to_string(),
            mobile: false,
        }
    }

    pub fn mobile(user_agent: &str) -> Self {
        Self {
            width: 390,
            height: 844,
            device_scale_factor: 3.0,
            user_agent: user_agent.to_string(),
            mobile: true,
        }
    }
}

/// Screenshot request
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotOptions {
    pub full_page: bool,
    pub format: crate::config::ImageFormat,
    /// JPEG quality; ignored for PNG
    pub quality: Option<u8>,
}

/// A launched browser process
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Opens a new isolated context sharing this browser process
    async fn new_context(
        &self,
        options: &ContextOptions,
    ) -> Result<Box<dyn DriverContext>, BrowserError>;

    /// Shuts the browser process down
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// An isolated browser context
#[async_trait]
pub trait DriverContext: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn DriverPage>, BrowserError>;

    /// Disposes the context and every page opened in it
    async fn close(&self) -> Result<(), BrowserError>;
}

/// A single tab
#[async_trait]
pub trait DriverPage: Send + Sync {
    /// Navigates and waits for `wait_until`; callers bound the wait
    async fn goto(
        &self,
        url: &str,
        wait_until: WaitUntil,
    ) -> Result<NavigationResponse, BrowserError>;

    /// Serialized DOM of the current document
    async fn content(&self) -> Result<String, BrowserError>;

    /// Current URL after redirects
    async fn final_url(&self) -> Result<String, BrowserError>;

    async fn screenshot(&self, options: &ScreenshotOptions) -> Result<Vec<u8>, BrowserError>;
}
