//! Per-task page fetching
//!
//! A task runs its desktop phase in one isolated context, closes it, and then
//! optionally runs a mobile phase in a second context. Only the desktop
//! phase decides success; the mobile phase adds a screenshot or nothing.

use crate::browser::{BrowserError, BrowserSession, IsolatedContext, ScreenshotOptions, WaitUntil};
use crate::config::CrawlConfig;
use crate::crawler::bot_detection::detect_bot_protection;
use crate::crawler::navigation::NavigationEngine;
use crate::crawler::parser::page_title;
use crate::crawler::types::{
    FailureKind, FetchFailure, FetchOutcome, FetchTask, PageFetchResult, Screenshots,
};
use crate::state::{primary_strategies, CapturePhase};
use std::time::Instant;

/// Fetches one task through the session
///
/// Never returns an error: every failure becomes a [`FetchFailure`] so that
/// sibling fetches in the same batch are unaffected.
///
/// # Arguments
///
/// * `session` - The crawl's browser session
/// * `task` - What to fetch
/// * `config` - The resolved crawl configuration
pub async fn fetch_page(
    session: &BrowserSession,
    task: &FetchTask,
    config: &CrawlConfig,
) -> FetchOutcome {
    let started = Instant::now();
    let engine = NavigationEngine::new(config.page_load_timeout());
    let primary = primary_strategies(config.wait_for_network_idle);
    let mobile_enabled = config.capture.mobile && config.capture.screenshots;

    let mut phase = CapturePhase::Desktop;
    let mut outcome: Option<FetchOutcome> = None;

    while let Some(options) = phase.context_options(&config.launch) {
        let context = match session.new_isolated_context(&options).await {
            Ok(context) => context,
            Err(e) => {
                if phase == CapturePhase::Desktop {
                    outcome = Some(Err(failure(task, &e, started)));
                } else {
                    tracing::warn!("Skipping mobile capture of {}: {}", task.url, e);
                }
                break;
            }
        };

        let strategies = phase.strategies(primary);
        match phase {
            CapturePhase::Desktop => {
                let desktop = load_page(&context, &engine, task, config, strategies, started).await;
                session.close_context(context).await;
                let succeeded = desktop.is_ok();
                outcome = Some(desktop);
                phase = phase.advance(mobile_enabled, succeeded);
            }
            CapturePhase::Mobile => {
                let capture = capture_mobile(&context, &engine, task, config, strategies).await;
                session.close_context(context).await;
                match capture {
                    Ok(bytes) => {
                        if let Some(Ok(page)) = outcome.as_mut() {
                            page.screenshots.mobile = Some(bytes);
                        }
                    }
                    Err(e) => tracing::warn!("Mobile capture of {} failed: {}", task.url, e),
                }
                phase = phase.advance(mobile_enabled, true);
            }
            CapturePhase::Done => break,
        }
    }

    outcome.unwrap_or_else(|| {
        Err(FetchFailure::new(
            task,
            FailureKind::Browser,
            "fetch finished without a desktop phase",
        ))
    })
}

/// Desktop phase: navigate, detect, check status, screenshot
async fn load_page(
    context: &IsolatedContext,
    engine: &NavigationEngine,
    task: &FetchTask,
    config: &CrawlConfig,
    strategies: &[WaitUntil],
    started: Instant,
) -> FetchOutcome {
    let page = context
        .new_page()
        .await
        .map_err(|e| failure(task, &e, started))?;

    let navigated = engine
        .navigate(page.as_ref(), &task.url, strategies)
        .await
        .map_err(|e| failure(task, &e, started))?;

    let html = page
        .content()
        .await
        .map_err(|e| failure(task, &e, started))?;
    let final_url = match page.final_url().await {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Could not read final URL of {}: {}", task.url, e);
            task.url.clone()
        }
    };
    let status = navigated.response.status;

    let bot_detection = if config.detect_bot_protection {
        let verdict = detect_bot_protection(status, &html);
        if verdict.bot_protected {
            tracing::warn!(
                "Bot protection on {} ({}, confidence {:.2})",
                task.url,
                verdict.bot_type.as_deref().unwrap_or("unknown"),
                verdict.confidence
            );
            let mut blocked = FetchFailure::new(
                task,
                FailureKind::BotProtected,
                format!(
                    "Bot protection detected: {} (confidence {:.2})",
                    verdict.bot_type.as_deref().unwrap_or("unknown"),
                    verdict.confidence
                ),
            );
            blocked.load_time_ms = elapsed_ms(started);
            blocked.indicators = verdict.indicators.clone();
            blocked.bot_detection = Some(verdict);
            return Err(blocked);
        }
        Some(verdict)
    } else {
        None
    };

    if !navigated.response.ok {
        let mut rejected = FetchFailure::new(task, FailureKind::HttpStatus, format!("HTTP {}", status));
        rejected.load_time_ms = elapsed_ms(started);
        return Err(rejected);
    }

    let mut screenshots = Screenshots::default();
    if config.capture.screenshots {
        match page.screenshot(&screenshot_options(config)).await {
            Ok(bytes) => screenshots.desktop = Some(bytes),
            Err(e) => tracing::warn!("Screenshot of {} failed: {}", task.url, e),
        }
    }

    let title = page_title(&html);
    tracing::debug!(
        "Fetched {} ({}, {} bytes, {})",
        final_url,
        status,
        html.len(),
        navigated.strategy
    );

    Ok(PageFetchResult {
        url: final_url,
        requested_url: task.url.clone(),
        html,
        depth: task.depth,
        load_time_ms: elapsed_ms(started),
        discovered_from: task.discovered_from.clone(),
        success: true,
        error: None,
        strategy: Some(navigated.strategy),
        status: Some(status),
        title,
        bot_detection,
        screenshots,
    })
}

/// Mobile phase: navigate with the thorough plan and screenshot
async fn capture_mobile(
    context: &IsolatedContext,
    engine: &NavigationEngine,
    task: &FetchTask,
    config: &CrawlConfig,
    strategies: &[WaitUntil],
) -> Result<Vec<u8>, BrowserError> {
    let page = context.new_page().await?;
    engine.navigate(page.as_ref(), &task.url, strategies).await?;
    page.screenshot(&screenshot_options(config)).await
}

fn screenshot_options(config: &CrawlConfig) -> ScreenshotOptions {
    ScreenshotOptions {
        full_page: config.capture.full_page,
        format: config.capture.format,
        quality: Some(config.capture.quality),
    }
}

fn failure(task: &FetchTask, error: &BrowserError, started: Instant) -> FetchFailure {
    let mut failure = FetchFailure::from_browser_error(task, error);
    failure.load_time_ms = elapsed_ms(started);
    tracing::debug!("Fetch of {} failed: {}", task.url, error);
    failure
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
