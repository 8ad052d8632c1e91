//! Value comparison rules and mismatch construction.

use slotwatch_common::ether::slots::parse_storage_key;

use crate::interfaces::{Mismatch, MismatchKind, SlotDescriptor};

/// Whether two storage words are equal.
///
/// Words are compared as hex text, ignoring letter case and nothing else: `0x01` and the
/// 32-byte `0x00…01` are different values here.
pub fn equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Whether an array length word matches the expected length.
///
/// Lengths are numbers, so both sides are parsed (hex with `0x`, otherwise decimal) and
/// compared numerically: `"2"`, `"0x2"` and the zero-padded word all match each other. If
/// either side is not a number the raw strings must be identical.
pub fn length_equal(expected: &str, observed: &str) -> bool {
    match (parse_storage_key(expected), parse_storage_key(observed)) {
        (Ok(expected), Ok(observed)) => expected == observed,
        _ => expected == observed,
    }
}

/// Builds the [`Mismatch`] record for `descriptor`.
///
/// `key` is the derived key for array entries, `None` for the primary slot.
pub fn describe_mismatch(
    descriptor: &SlotDescriptor,
    kind: MismatchKind,
    key: Option<&str>,
    expected: &str,
    observed: Option<&str>,
) -> Mismatch {
    Mismatch {
        descriptor_id: descriptor.id.clone(),
        contract_name: descriptor.contract_name.clone(),
        contract_address: descriptor.contract_address.clone(),
        slot_name: descriptor.slot_name.clone(),
        slot_address: descriptor.slot_address.clone(),
        key: key.map(str::to_string),
        kind,
        expected: expected.to_string(),
        observed: observed.map(str::to_string),
    }
}
