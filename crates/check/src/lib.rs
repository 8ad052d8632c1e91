//! The Check module compares raw contract storage against expected values.
//!
//! A run takes an ordered set of [`SlotDescriptor`]s, resolves each to concrete storage keys,
//! reads them through a [`StorageReader`], and collects every divergence into a [`RunReport`].
//! A descriptor that cannot be checked is recorded as an error outcome; it never stops the run.

/// Error types for the check module
pub mod error;

mod core;
mod interfaces;

// re-export the public interface
pub use crate::core::{
    check,
    checker::SlotChecker,
    comparator::{describe_mismatch, equal, length_equal},
    connect,
    coordinator::{RunOptions, SlotWatcher},
    locator::{locate, locate_entries, KeySource, Location},
    reader::{MemoryStorageReader, RpcStorageReader, StorageReader, ZERO_WORD},
};
pub use error::{Error, ErrorKind};
pub use interfaces::*;
