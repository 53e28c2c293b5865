use crate::config::CrawlConfig;
use crate::url::domain::same_host;
use url::Url;

/// Why a candidate link was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Host differs from the crawl root while same-domain crawling is on
    OffDomain,
    /// Lowercased URL contains a configured exclusion substring
    ExcludedPattern,
    /// Path ends with a configured excluded file extension
    ExcludedFileType,
    /// The link points back at the crawl root
    SelfLink,
}

/// Filtering policy applied to every normalized candidate link
///
/// Checks run in a fixed order: same-domain, exclusion patterns, file
/// extensions, then the self-link check against the crawl root and any of
/// its aliases.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    root: Url,
    aliases: Vec<Url>,
    same_domain_only: bool,
    exclude_patterns: Vec<String>,
    exclude_file_types: Vec<String>,
}

impl LinkFilter {
    /// Builds a filter for a normalized crawl root
    pub fn new(root: Url, config: &CrawlConfig) -> Self {
        Self {
            root,
            aliases: Vec::new(),
            same_domain_only: config.same_domain_only,
            exclude_patterns: config
                .exclude_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            exclude_file_types: config
                .exclude_file_types
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Also treats `url` as the crawl root
    ///
    /// Used for the URL that was requested when the homepage redirected
    /// somewhere else: links back to it are self-links too.
    pub fn with_alias(mut self, url: Url) -> Self {
        if url != self.root && !self.aliases.contains(&url) {
            self.aliases.push(url);
        }
        self
    }

    /// Checks a normalized link against the policy
    pub fn check(&self, url: &Url) -> Result<(), Rejection> {
        if self.same_domain_only && !same_host(url, &self.root) {
            return Err(Rejection::OffDomain);
        }

        let lowered = url.as_str().to_lowercase();
        if self
            .exclude_patterns
            .iter()
            .any(|pattern| lowered.contains(pattern.as_str()))
        {
            return Err(Rejection::ExcludedPattern);
        }

        let path = url.path().to_lowercase();
        if self
            .exclude_file_types
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
        {
            return Err(Rejection::ExcludedFileType);
        }

        if url == &self.root || self.aliases.contains(url) {
            return Err(Rejection::SelfLink);
        }

        Ok(())
    }

    pub fn accepts(&self, url: &Url) -> bool {
        self.check(url).is_ok()
    }
}
