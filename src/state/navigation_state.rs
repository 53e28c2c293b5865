/// Navigation retry state machine
///
/// A fetch walks an ordered list of settle conditions. Only a timeout moves
/// it to the next condition; any other failure is final.
use crate::browser::WaitUntil;
use std::fmt;

/// Settle conditions for the homepage and for sub-pages
pub const PRIMARY_NETWORK_IDLE: &[WaitUntil] = &[WaitUntil::NetworkIdle, WaitUntil::DomContentLoaded];

/// Used instead of [`PRIMARY_NETWORK_IDLE`] when network-idle waiting is off
pub const PRIMARY_LOAD: &[WaitUntil] = &[WaitUntil::Load, WaitUntil::DomContentLoaded];

/// Three-step plan for the mobile capture phase
pub const THOROUGH: &[WaitUntil] = &[
    WaitUntil::Load,
    WaitUntil::NetworkIdle,
    WaitUntil::DomContentLoaded,
];

/// Returns the primary plan for the configured preference
pub fn primary_strategies(wait_for_network_idle: bool) -> &'static [WaitUntil] {
    if wait_for_network_idle {
        PRIMARY_NETWORK_IDLE
    } else {
        PRIMARY_LOAD
    }
}

/// Where a navigation currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationState {
    /// Not started yet
    Pending,

    /// Attempting the strategy at this index
    Trying(usize),

    // ===== Terminal States =====
    /// Settled under this strategy
    Succeeded(WaitUntil),

    /// Gave up; holds the last error message
    Failed(String),
}

/// Input driving [`next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Begin the first attempt
    Start,

    /// The current attempt settled
    Settled,

    /// The current attempt hit the per-page timeout
    TimedOut(String),

    /// The current attempt failed for any other reason
    Errored(String),
}

impl NavigationState {
    /// Strategy being attempted, if any
    pub fn current<'a>(&self, strategies: &'a [WaitUntil]) -> Option<&'a WaitUntil> {
        match self {
            Self::Trying(index) => strategies.get(*index),
            _ => None,
        }
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Trying(index) => write!(f, "trying({})", index),
            Self::Succeeded(strategy) => write!(f, "succeeded({})", strategy),
            Self::Failed(reason) => write!(f, "failed({})", reason),
        }
    }
}

/// Computes the next state
///
/// Terminal states absorb every outcome. Outcomes that make no sense for the
/// current state (e.g. `Settled` while `Pending`) leave it unchanged.
///
/// # Arguments
///
/// * `state` - Current state
/// * `outcome` - What just happened
/// * `strategies` - The ordered plan being walked
pub fn next(
    state: &NavigationState,
    outcome: NavigationOutcome,
    strategies: &[WaitUntil],
) -> NavigationState {
    match (state, outcome) {
        (NavigationState::Pending, NavigationOutcome::Start) => {
            if strategies.is_empty() {
                NavigationState::Failed("no navigation strategy configured".to_string())
            } else {
                NavigationState::Trying(0)
            }
        }
        (NavigationState::Trying(index), NavigationOutcome::Settled) => {
            match strategies.get(*index) {
                Some(strategy) => NavigationState::Succeeded(*strategy),
                None => NavigationState::Failed("strategy index out of range".to_string()),
            }
        }
        (NavigationState::Trying(index), NavigationOutcome::TimedOut(reason)) => {
            if index + 1 < strategies.len() {
                NavigationState::Trying(index + 1)
            } else {
                NavigationState::Failed(reason)
            }
        }
        (NavigationState::Trying(_), NavigationOutcome::Errored(reason)) => {
            NavigationState::Failed(reason)
        }
        (current, _) => current.clone(),
    }
}
