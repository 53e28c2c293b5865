//! Tier sampling and fetch-queue construction
//!
//! Sampling is two independent knobs per tier: a Bernoulli trial per link
//! at `sample_rate`, then a uniform shuffle-and-truncate down to `max_pages`.

use crate::config::{CrawlConfig, TierPolicy};
use crate::crawler::parser::LinkRecord;
use crate::crawler::types::FetchTask;
use crate::url::{categorize, DepthTier};
use rand::seq::SliceRandom;
use rand::Rng;
use url::Url;

/// Applies one tier's policy to its candidates
///
/// With `sample_rate >= 1.0` every candidate passes the first stage. The cap
/// only reorders when it actually truncates.
///
/// # Arguments
///
/// * `candidates` - Links of a single tier
/// * `policy` - The tier's rate and cap
/// * `rng` - Randomness source
pub fn sample<T, R>(candidates: Vec<T>, policy: &TierPolicy, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    let mut kept: Vec<T> = if policy.sample_rate >= 1.0 {
        candidates
    } else {
        let rate = policy.sample_rate.clamp(0.0, 1.0);
        candidates
            .into_iter()
            .filter(|_| rng.random_bool(rate))
            .collect()
    };

    if kept.len() > policy.max_pages {
        kept.shuffle(rng);
        kept.truncate(policy.max_pages);
    }

    kept
}

/// Splits candidates by tier, keeping their relative order
pub fn partition_by_tier(
    candidates: Vec<LinkRecord>,
    root: &Url,
) -> (Vec<LinkRecord>, Vec<LinkRecord>) {
    candidates
        .into_iter()
        .partition(|record| categorize(&record.url, root) == DepthTier::Level1)
}

/// Builds the sampled fetch queue
///
/// Level1 tasks come before Level2Plus tasks. The queue is capped at
/// `max_total_pages - 1` because the homepage counts toward the total.
pub fn build_queue<R>(
    candidates: Vec<LinkRecord>,
    root: &Url,
    config: &CrawlConfig,
    rng: &mut R,
) -> Vec<FetchTask>
where
    R: Rng + ?Sized,
{
    let (level_1, level_2_plus) = partition_by_tier(candidates, root);
    let found = (level_1.len(), level_2_plus.len());

    let level_1 = sample(level_1, &config.level_1, rng);
    let level_2_plus = sample(level_2_plus, &config.level_2_plus, rng);

    tracing::debug!(
        "Sampled level 1: {}/{}, level 2+: {}/{}",
        level_1.len(),
        found.0,
        level_2_plus.len(),
        found.1
    );

    assemble(level_1, level_2_plus, config)
}

/// Builds a queue from an explicit page list without sampling
pub fn build_unsampled_queue(
    candidates: Vec<LinkRecord>,
    root: &Url,
    config: &CrawlConfig,
) -> Vec<FetchTask> {
    let (level_1, level_2_plus) = partition_by_tier(candidates, root);
    assemble(level_1, level_2_plus, config)
}

fn assemble(
    level_1: Vec<LinkRecord>,
    level_2_plus: Vec<LinkRecord>,
    config: &CrawlConfig,
) -> Vec<FetchTask> {
    let mut queue: Vec<FetchTask> = level_1
        .into_iter()
        .map(|r| FetchTask::discovered(r.url, DepthTier::Level1, r.source))
        .chain(
            level_2_plus
                .into_iter()
                .map(|r| FetchTask::discovered(r.url, DepthTier::Level2Plus, r.source)),
        )
        .collect();

    let limit = config.max_total_pages.saturating_sub(1);
    if queue.len() > limit {
        tracing::debug!("Truncating queue from {} to {} tasks", queue.len(), limit);
        queue.truncate(limit);
    }
    queue
}
