/// Per-task capture phases
///
/// A task runs its desktop phase, closes that context, then optionally runs a
/// mobile phase in a fresh context. Both phases belong to the same task, so
/// a task never holds more than one browser context at a time.
use crate::browser::{ContextOptions, WaitUntil};
use crate::config::LaunchConfig;
use crate::state::navigation_state::THOROUGH;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapturePhase {
    /// Desktop viewport; produces the page result
    Desktop,

    /// Mobile viewport; adds a mobile screenshot only
    Mobile,

    /// Nothing left to do
    Done,
}

impl CapturePhase {
    /// Moves to the next phase
    ///
    /// The mobile phase only runs after a successful desktop phase.
    pub fn advance(self, mobile_enabled: bool, desktop_succeeded: bool) -> Self {
        match self {
            Self::Desktop if mobile_enabled && desktop_succeeded => Self::Mobile,
            _ => Self::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Context settings for this phase, `None` once done
    pub fn context_options(&self, launch: &LaunchConfig) -> Option<ContextOptions> {
        match self {
            Self::Desktop => Some(ContextOptions::desktop(&launch.user_agent)),
            Self::Mobile => Some(ContextOptions::mobile(&launch.mobile_user_agent)),
            Self::Done => None,
        }
    }

    /// Navigation plan for this phase
    pub fn strategies(&self, primary: &'static [WaitUntil]) -> &'static [WaitUntil] {
        match self {
            Self::Mobile => THOROUGH,
            _ => primary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
