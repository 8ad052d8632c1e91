/// The alloy provider wrapper used for every node read.
pub mod provider;

/// Storage key derivation under the Solidity storage layout.
pub mod slots;
