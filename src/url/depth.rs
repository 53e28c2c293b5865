use serde::Serialize;
use url::Url;

/// Depth classification of a discovered link relative to the crawl root
///
/// The homepage itself is implicitly level 0 and is never categorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthTier {
    /// Exactly one path segment deeper than the root
    Level1,
    /// Everything else, including same-depth and shallower links
    Level2Plus,
}

impl DepthTier {
    /// Numeric depth as reported on fetch results (0 is the homepage)
    pub fn level(&self) -> u8 {
        match self {
            Self::Level1 => 1,
            Self::Level2Plus => 2,
        }
    }
}

/// Classifies a candidate URL into a depth tier relative to the crawl root
///
/// Depth is the difference between the number of non-empty path segments of
/// the candidate and of the root. A difference of exactly 1 is
/// [`DepthTier::Level1`]; any other value, including 0 and negative values
/// (a candidate shallower than the root), is [`DepthTier::Level2Plus`].
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_crawl_engine::url::{categorize, DepthTier};
///
/// let root = Url::parse("https://example.com/").unwrap();
/// let about = Url::parse("https://example.com/about").unwrap();
/// assert_eq!(categorize(&about, &root), DepthTier::Level1);
/// ```
pub fn categorize(url: &Url, root: &Url) -> DepthTier {
    let candidate_segments = segment_count(url) as i64;
    let root_segments = segment_count(root) as i64;
    let depth = candidate_segments - root_segments;

    if depth == 1 || (root_segments == 0 && candidate_segments == 1) {
        DepthTier::Level1
    } else {
        DepthTier::Level2Plus
    }
}

fn segment_count(url: &Url) -> usize {
    url.path().split('/').filter(|s| !s.is_empty()).count()
}
