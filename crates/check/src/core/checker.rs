//! Checks a single descriptor against storage.

use std::time::Duration;

use backoff::ExponentialBackoff;
use tracing::{debug, trace, warn};

use crate::{
    core::{
        comparator::{describe_mismatch, equal, length_equal},
        locator::{locate, locate_entries, KeySource},
        reader::StorageReader,
    },
    error::Error,
    interfaces::{Mismatch, MismatchKind, SlotDescriptor, SlotKind},
};

/// Checks descriptors one at a time against a [`StorageReader`].
///
/// Holds no state between checks, so a single checker can serve many concurrent checks.
#[derive(Debug)]
pub struct SlotChecker<'a, R: ?Sized> {
    reader: &'a R,
    retry_max_elapsed: Option<Duration>,
}

impl<'a, R: StorageReader + ?Sized> SlotChecker<'a, R> {
    /// Creates a checker that reads through `reader` without retrying.
    pub fn new(reader: &'a R) -> Self {
        Self { reader, retry_max_elapsed: None }
    }

    /// Retries transport failures with exponential backoff for up to `max_elapsed`.
    pub fn with_retry(mut self, max_elapsed: Option<Duration>) -> Self {
        self.retry_max_elapsed = max_elapsed;
        self
    }

    /// Check `descriptor`, returning every divergence found (empty when everything matches).
    ///
    /// Fails with [`Error::Config`] for malformed descriptors and [`Error::Transport`] when a
    /// read fails; the first failing read aborts this descriptor only.
    pub async fn check(&self, descriptor: &SlotDescriptor) -> Result<Vec<Mismatch>, Error> {
        let location = locate(descriptor);
        if location.source == KeySource::EmptyName {
            warn!(
                "descriptor '{}' has neither a slot address nor a slot name, refusing to read keccak256(\"\")",
                descriptor.id
            );
            return Err(Error::Config(format!(
                "descriptor '{}' has neither a slot address nor a slot name",
                descriptor.id
            )));
        }
        debug!("checking '{}' at {}[{}]", descriptor.id, descriptor.contract_address, location.key);

        let mut mismatches = Vec::new();
        match &descriptor.kind {
            SlotKind::Scalar { expected } => {
                let expected = expected.as_deref().ok_or_else(|| {
                    Error::Config(format!(
                        "scalar descriptor '{}' has no expected value",
                        descriptor.id
                    ))
                })?;

                let observed = self.read(&descriptor.contract_address, &location.key).await?;
                if !equal(expected, &observed) {
                    mismatches.push(describe_mismatch(
                        descriptor,
                        MismatchKind::Value,
                        None,
                        expected,
                        Some(&observed),
                    ));
                }
            }
            SlotKind::Array { expected_length, .. } => {
                let expected_length = expected_length.as_deref().ok_or_else(|| {
                    Error::Config(format!(
                        "array descriptor '{}' has no expected length",
                        descriptor.id
                    ))
                })?;

                let observed = self.read(&descriptor.contract_address, &location.key).await?;
                if !length_equal(expected_length, &observed) {
                    mismatches.push(describe_mismatch(
                        descriptor,
                        MismatchKind::Length,
                        None,
                        expected_length,
                        None,
                    ));
                }

                for entry in locate_entries(descriptor) {
                    let observed = self.read(&descriptor.contract_address, &entry.key).await?;
                    if !equal(&entry.value, &observed) {
                        mismatches.push(describe_mismatch(
                            descriptor,
                            MismatchKind::Entry,
                            Some(&entry.key),
                            &entry.value,
                            Some(&observed),
                        ));
                    }
                }
            }
        }

        Ok(mismatches)
    }

    /// A single read, retried on transport failures when a retry budget is set.
    async fn read(&self, contract_address: &str, key: &str) -> Result<String, Error> {
        let Some(max_elapsed) = self.retry_max_elapsed else {
            return self.reader.read(contract_address, key).await;
        };

        backoff::future::retry(
            ExponentialBackoff {
                max_elapsed_time: Some(max_elapsed),
                ..ExponentialBackoff::default()
            },
            move || async move {
                self.reader.read(contract_address, key).await.map_err(|e| match e {
                    Error::Transport(_) => {
                        trace!("retrying read of {}[{}]: {}", contract_address, key, e);
                        backoff::Error::transient(e)
                    }
                    e => backoff::Error::permanent(e),
                })
            },
        )
        .await
    }
}
