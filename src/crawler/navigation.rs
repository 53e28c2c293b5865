//! Navigation with settle-condition fallback
//!
//! Drives [`NavigationState`] against a live page: each attempt is bounded by
//! the per-page timeout, and only timeouts advance to the next condition.

use crate::browser::{BrowserError, DriverPage, NavigationResponse, WaitUntil};
use crate::state::{next, NavigationOutcome, NavigationState};
use std::time::Duration;

/// A settled navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigated {
    pub response: NavigationResponse,
    pub strategy: WaitUntil,
}

/// Loads pages under an ordered list of settle conditions
#[derive(Debug, Clone, Copy)]
pub struct NavigationEngine {
    timeout: Duration,
}

impl NavigationEngine {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Navigates `page` to `url`, walking `strategies` in order
    ///
    /// # Returns
    ///
    /// * `Ok(Navigated)` - The response and the strategy that settled
    /// * `Err(BrowserError)` - The first non-timeout error, or the last
    ///   timeout once every strategy has been tried
    pub async fn navigate(
        &self,
        page: &dyn DriverPage,
        url: &str,
        strategies: &[WaitUntil],
    ) -> Result<Navigated, BrowserError> {
        let mut state = next(&NavigationState::Pending, NavigationOutcome::Start, strategies);
        let mut last_error: Option<BrowserError> = None;
        let mut last_response: Option<NavigationResponse> = None;

        loop {
            match state.clone() {
                NavigationState::Trying(index) => {
                    let Some(&strategy) = state.current(strategies) else {
                        return Err(BrowserError::Navigation(format!(
                            "no strategy at index {}",
                            index
                        )));
                    };
                    tracing::debug!("Navigating to {} (wait until {})", url, strategy);

                    let outcome = match tokio::time::timeout(self.timeout, page.goto(url, strategy))
                        .await
                    {
                        Ok(Ok(response)) => {
                            last_response = Some(response);
                            NavigationOutcome::Settled
                        }
                        Ok(Err(e)) => {
                            let outcome = if e.is_timeout() {
                                NavigationOutcome::TimedOut(e.to_string())
                            } else {
                                NavigationOutcome::Errored(e.to_string())
                            };
                            last_error = Some(e);
                            outcome
                        }
                        Err(_) => {
                            let e = BrowserError::Timeout {
                                wait_until: strategy,
                                timeout_ms: self.timeout.as_millis() as u64,
                            };
                            let outcome = NavigationOutcome::TimedOut(e.to_string());
                            last_error = Some(e);
                            outcome
                        }
                    };

                    if let NavigationOutcome::TimedOut(reason) = &outcome {
                        tracing::debug!("{} on {}", reason, url);
                    }
                    state = next(&state, outcome, strategies);
                }
                NavigationState::Succeeded(strategy) => {
                    return match last_response {
                        Some(response) => Ok(Navigated {
                            response,
                            strategy,
                        }),
                        None => Err(BrowserError::Navigation(
                            "navigation settled without a response".to_string(),
                        )),
                    };
                }
                NavigationState::Failed(reason) => {
                    return Err(last_error
                        .take()
                        .unwrap_or(BrowserError::Navigation(reason)));
                }
                NavigationState::Pending => {
                    return Err(BrowserError::Navigation(
                        "navigation never started".to_string(),
                    ));
                }
            }
        }
    }
}
