//! State machines driving a single fetch
//!
//! # Components
//!
//! - `NavigationState`: Walks the ordered settle conditions of one navigation
//! - `CapturePhase`: Sequences the desktop and mobile phases of one task

mod capture_phase;
mod navigation_state;

// Re-export main types
pub use capture_phase::CapturePhase;
pub use navigation_state::{
    next, primary_strategies, NavigationOutcome, NavigationState, PRIMARY_LOAD,
    PRIMARY_NETWORK_IDLE, THOROUGH,
};
