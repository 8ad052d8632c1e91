//! Common utilities, constants, and resources used across the slotwatch codebase.
//!
//! This crate provides shared functionality for the slotwatch toolkit, including
//! provider plumbing for reading contract storage, storage-layout helpers, and
//! general utility functions.

/// Constants used throughout the slotwatch codebase.
pub mod constants;

/// Utilities for interacting with Ethereum, including the RPC provider wrapper
/// and storage slot helpers.
pub mod ether;

/// General utility functions and types for common tasks.
pub mod utils;
