//! Batch scheduler for the fetch queue
//!
//! This module handles:
//! - Walking the flat task list with a cursor it alone owns
//! - Running fixed-size batches of concurrent fetches
//! - Checking the crawl time budget before each new batch
//! - Stopping after a batch that lost the browser

use crate::crawler::types::{FailureKind, FetchOutcome, FetchTask};
use futures::future::join_all;
use std::future::Future;
use std::time::{Duration, Instant};

/// What the scheduler produced
#[derive(Debug)]
pub struct ScheduleReport {
    /// One outcome per started task, in queue order
    pub outcomes: Vec<FetchOutcome>,

    /// Stopped because the time budget ran out
    pub timed_out: bool,

    /// Stopped because a fetch reported the browser gone
    pub browser_crashed: bool,

    /// Number of batches started
    pub batches: usize,
}

/// Runs a task list in batches of at most `batch_size` concurrent fetches
///
/// Batch N+1 never starts before every fetch of batch N has settled. The time
/// budget only gates starting a batch; in-flight fetches are never cancelled.
pub struct BatchScheduler<'a> {
    tasks: &'a [FetchTask],
    cursor: usize,
    batch_size: usize,
    budget: Duration,
    started: Instant,
}

impl<'a> BatchScheduler<'a> {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `tasks` - The queue, in the order results should come back
    /// * `batch_size` - Concurrency limit (at least 1)
    /// * `budget` - Wall-clock budget for the whole crawl
    /// * `started` - When the crawl (not the scheduler) started
    pub fn new(tasks: &'a [FetchTask], batch_size: usize, budget: Duration, started: Instant) -> Self {
        Self {
            tasks,
            cursor: 0,
            batch_size: batch_size.max(1),
            budget,
            started,
        }
    }

    /// Tasks not yet started
    pub fn remaining(&self) -> usize {
        self.tasks.len() - self.cursor
    }

    /// Drives every batch through `fetch`
    pub async fn run<F, Fut>(mut self, fetch: F) -> ScheduleReport
    where
        F: Fn(&'a FetchTask) -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let mut report = ScheduleReport {
            outcomes: Vec::with_capacity(self.tasks.len()),
            timed_out: false,
            browser_crashed: false,
            batches: 0,
        };

        while self.cursor < self.tasks.len() {
            let elapsed = self.started.elapsed();
            if elapsed >= self.budget {
                tracing::warn!(
                    "Crawl time budget of {}ms exhausted after {}ms; {} tasks not started",
                    self.budget.as_millis(),
                    elapsed.as_millis(),
                    self.remaining()
                );
                report.timed_out = true;
                break;
            }

            let end = (self.cursor + self.batch_size).min(self.tasks.len());
            let tasks = self.tasks;
            let batch = &tasks[self.cursor..end];
            self.cursor = end;
            report.batches += 1;

            tracing::debug!(
                "Starting batch {} with {} tasks ({} remaining)",
                report.batches,
                batch.len(),
                self.remaining()
            );

            let outcomes = join_all(batch.iter().map(&fetch)).await;
            let crashed = outcomes.iter().any(|outcome| {
                matches!(outcome, Err(failure) if failure.kind == FailureKind::BrowserCrashed)
            });
            report.outcomes.extend(outcomes);

            if crashed {
                tracing::error!("Browser went away; not scheduling further batches");
                report.browser_crashed = true;
                break;
            }
        }

        report
    }
}
