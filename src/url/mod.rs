//! URL handling module for the crawl engine
//!
//! This module provides link normalization, host comparison, the link
//! filtering policy and depth-tier categorization.

mod depth;
mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use depth::{categorize, DepthTier};
pub use domain::{extract_domain, same_host};
pub use filter::{LinkFilter, Rejection};
pub use normalize::{normalize_link, resolve_link};
