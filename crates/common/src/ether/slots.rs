//! Helpers for deriving storage keys under the Solidity storage layout rules.
//!
//! These are used when authoring slot descriptors: the checker itself only ever reads the keys
//! it is given.

use alloy::primitives::{keccak256, B256, U256};
use eyre::{eyre, Result};

/// Parse a storage key given either as `0x`-prefixed hex or as a decimal integer.
///
/// ```
/// use slotwatch_common::ether::slots::parse_storage_key;
/// use alloy::primitives::U256;
///
/// assert_eq!(parse_storage_key("0x0a").expect("valid key"), U256::from(10));
/// assert_eq!(parse_storage_key("10").expect("valid key"), U256::from(10));
/// ```
pub fn parse_storage_key(key: &str) -> Result<U256> {
    let key = key.trim();
    let parsed = match key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() && hex.len() <= 64 => U256::from_str_radix(hex, 16),
        Some(_) => return Err(eyre!("storage keys must contain between 1 and 64 hex digits")),
        None => U256::from_str_radix(key, 10),
    };

    parsed.map_err(|e| eyre!("failed to parse storage key '{key}': {e}"))
}

/// The key of a named slot: the keccak256 digest of the utf-8 name, as used by unstructured
/// storage patterns (e.g. `keccak256("lido.Lido.depositContract")`).
pub fn name_slot(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

/// The key of element `index` of a dynamic array whose length lives at `base`.
///
/// Elements are laid out contiguously from `keccak256(pad32(base))`.
pub fn array_element_slot(base: U256, index: U256) -> B256 {
    let start = U256::from_be_bytes(keccak256(base.to_be_bytes::<32>()).0);
    B256::from(start.wrapping_add(index).to_be_bytes::<32>())
}

/// The key of `mapping[key]` for a mapping declared at `base`: `keccak256(pad32(key) ++ pad32(base))`.
pub fn mapping_slot(base: U256, key: U256) -> B256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(&key.to_be_bytes::<32>());
    preimage[32..].copy_from_slice(&base.to_be_bytes::<32>());
    keccak256(preimage)
}
