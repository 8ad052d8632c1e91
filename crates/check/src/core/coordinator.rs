//! Runs a whole descriptor set and aggregates the outcomes into a [`RunReport`].

use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::{
    core::{checker::SlotChecker, reader::StorageReader},
    interfaces::{Outcome, RunReport, SlotDescriptor, DEFAULT_CONCURRENCY},
};

/// How a run is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of descriptors checked at once. `1` checks strictly in sequence.
    pub concurrency: usize,
    /// Retry budget for transport failures. `None` disables retries.
    pub retry_max_elapsed: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY, retry_max_elapsed: None }
    }
}

/// Checks descriptor sets against a shared [`StorageReader`].
///
/// Every descriptor is checked in isolation: a descriptor that fails to check becomes an
/// [`Outcome::Error`] and never prevents the remaining descriptors from being checked.
#[derive(Debug)]
pub struct SlotWatcher<R> {
    reader: R,
    options: RunOptions,
}

impl<R: StorageReader> SlotWatcher<R> {
    /// Creates a watcher with default [`RunOptions`].
    pub fn new(reader: R) -> Self {
        Self { reader, options: RunOptions::default() }
    }

    /// Replaces the run options.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Check every descriptor and collect the outcomes, in input order.
    pub async fn run(&self, descriptors: &[SlotDescriptor]) -> RunReport {
        let start_time = Instant::now();
        let checker = SlotChecker::new(&self.reader).with_retry(self.options.retry_max_elapsed);
        // at most one permit per descriptor
        let permits = self.options.concurrency.clamp(1, descriptors.len().max(1));
        let semaphore = Semaphore::new(permits);

        let outcomes = join_all(descriptors.iter().map(|descriptor| {
            let checker = &checker;
            let semaphore = &semaphore;
            async move {
                // the semaphore is never closed, so acquiring cannot fail
                let _permit = semaphore.acquire().await.ok();
                let outcome =
                    Outcome::from_result(&descriptor.id, checker.check(descriptor).await);
                log_outcome(descriptor, &outcome);
                outcome
            }
        }))
        .await;

        let report = RunReport { outcomes };
        info!(
            "checked {} descriptors in {:?}: {}",
            descriptors.len(),
            start_time.elapsed(),
            report.summary()
        );
        report
    }
}

fn log_outcome(descriptor: &SlotDescriptor, outcome: &Outcome) {
    match outcome {
        Outcome::Ok { id } => debug!("'{}' matches", id),
        Outcome::Mismatch { mismatches, .. } => {
            mismatches.iter().for_each(|mismatch| warn!("{}", mismatch));
        }
        Outcome::Error { id, cause } => error!(
            "failed to check '{}' ({} at {}): {}",
            id, descriptor.contract_name, descriptor.contract_address, cause.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::reader::MemoryStorageReader, error::ErrorKind};

    #[tokio::test]
    async fn test_run_preserves_input_order() {
        let reader = MemoryStorageReader::new()
            .with_value("0xA", "0x0", "0x01")
            .with_value("0xB", "0x0", "0x02")
            .with_value("0xC", "0x0", "0x03");
        let descriptors = vec![
            SlotDescriptor::scalar("c", "0xC", "0x0", "0x03"),
            SlotDescriptor::scalar("a", "0xA", "0x0", "0x01"),
            SlotDescriptor::scalar("b", "0xB", "0x0", "0xff"),
        ];

        let report = SlotWatcher::new(reader)
            .with_options(RunOptions { concurrency: 2, retry_max_elapsed: None })
            .run(&descriptors)
            .await;

        assert_eq!(
            report.outcomes.iter().map(Outcome::id).collect::<Vec<_>>(),
            vec!["c", "a", "b"]
        );
        assert!(matches!(report.outcomes[2], Outcome::Mismatch { .. }));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let reader = MemoryStorageReader::new()
            .with_value("0xA", "0x0", "0x01")
            .with_value("0xC", "0x0", "0x03")
            .with_unreachable("0xB");
        let descriptors = vec![
            SlotDescriptor::scalar("a", "0xA", "0x0", "0x01"),
            SlotDescriptor::scalar("b", "0xB", "0x0", "0x02"),
            SlotDescriptor::scalar("c", "0xC", "0x0", "0x04"),
        ];

        let report = SlotWatcher::new(reader)
            .with_options(RunOptions { concurrency: 1, retry_max_elapsed: None })
            .run(&descriptors)
            .await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.outcomes[0], Outcome::Ok { id: "a".to_string() });
        assert!(matches!(&report.outcomes[1], Outcome::Error { id, cause } if id == "b" && cause.kind == ErrorKind::Transport));
        assert!(matches!(&report.outcomes[2], Outcome::Mismatch { id, .. } if id == "c"));
        assert_eq!(report.errors().count(), 1);
    }

    #[tokio::test]
    async fn test_oversized_concurrency_still_runs() {
        let reader = MemoryStorageReader::new().with_value("0xA", "0x0", "0x01");
        let descriptors = vec![SlotDescriptor::scalar("a", "0xA", "0x0", "0x01")];

        let report = SlotWatcher::new(reader)
            .with_options(RunOptions { concurrency: usize::MAX, retry_max_elapsed: None })
            .run(&descriptors)
            .await;

        assert_eq!(report.outcomes, vec![Outcome::Ok { id: "a".to_string() }]);
    }

    #[tokio::test]
    async fn test_zero_concurrency_runs_sequentially() {
        let reader = MemoryStorageReader::new().with_value("0xA", "0x0", "0x01");
        let descriptors = vec![
            SlotDescriptor::scalar("a", "0xA", "0x0", "0x01"),
            SlotDescriptor::scalar("b", "0xA", "0x0", "0x02"),
        ];

        let report = SlotWatcher::new(reader)
            .with_options(RunOptions { concurrency: 0, retry_max_elapsed: None })
            .run(&descriptors)
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(matches!(&report.outcomes[1], Outcome::Mismatch { id, .. } if id == "b"));
    }

    #[tokio::test]
    async fn test_empty_run() {
        let report = SlotWatcher::new(MemoryStorageReader::new()).run(&[]).await;
        assert!(report.is_clean());
        assert!(report.outcomes.is_empty());
    }
}
