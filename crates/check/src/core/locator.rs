//! Resolves a descriptor into the concrete storage key(s) to read.

use slotwatch_common::{ether::slots::name_slot, utils::hex::ToLowerHex};

use crate::interfaces::{ExpectedEntry, SlotDescriptor, SlotKind};

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The descriptor's `slot_address`, used verbatim.
    Explicit,
    /// The keccak256 digest of the descriptor's `slot_name`.
    Name,
    /// Neither a slot address nor a (non-empty) slot name was configured; the key is the digest
    /// of the empty string, which is almost certainly a misconfiguration.
    EmptyName,
}

/// The concrete primary key of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The storage key to read.
    pub key: String,
    /// How the key was obtained.
    pub source: KeySource,
}

/// Resolve the primary storage key of `descriptor`.
///
/// An explicit slot address always wins; otherwise the key is the digest of the slot name.
pub fn locate(descriptor: &SlotDescriptor) -> Location {
    if let Some(slot_address) = &descriptor.slot_address {
        return Location { key: slot_address.clone(), source: KeySource::Explicit };
    }

    let name = descriptor.slot_name.as_deref().unwrap_or_default();
    Location {
        key: name_slot(name).to_lower_hex(),
        source: if name.is_empty() { KeySource::EmptyName } else { KeySource::Name },
    }
}

/// The `(key, expected value)` pairs to read for an array descriptor, in configured order.
///
/// Keys come pre-derived from configuration; nothing here knows the storage layout rules.
/// Scalar descriptors have no entries.
pub fn locate_entries(descriptor: &SlotDescriptor) -> &[ExpectedEntry] {
    match &descriptor.kind {
        SlotKind::Array { expected_map, .. } => expected_map.as_slice(),
        SlotKind::Scalar { .. } => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER_SLOT: &str = "0x02016836a56b71f0d02689e69e326f4f4c1b9057164ef592671cf0d37c8040c0";

    fn named(slot_name: &str) -> SlotDescriptor {
        SlotDescriptor::scalar("s1", "0xAAA", "0x0", "0x01")
            .without_slot_address()
            .with_slot_name(slot_name)
    }

    #[test]
    fn test_explicit_slot_address_is_used_verbatim() {
        let descriptor =
            SlotDescriptor::scalar("s1", "0xAAA", "0xDEADbeef", "0x01").with_slot_name("owner");

        assert_eq!(
            locate(&descriptor),
            Location { key: "0xDEADbeef".to_string(), source: KeySource::Explicit }
        );
    }

    #[test]
    fn test_slot_name_is_hashed() {
        let location = locate(&named("owner"));

        assert_eq!(location.source, KeySource::Name);
        assert_eq!(location.key, OWNER_SLOT);
        assert_eq!(locate(&named("owner")), location);
    }

    #[test]
    fn test_missing_name_falls_back_to_empty_digest() {
        let descriptor = SlotDescriptor::scalar("s1", "0xAAA", "0x0", "0x01").without_slot_address();
        let location = locate(&descriptor);

        assert_eq!(location.source, KeySource::EmptyName);
        assert_eq!(
            location.key,
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(locate(&named("")).source, KeySource::EmptyName);
    }

    #[test]
    fn test_locate_entries() {
        let entries = vec![ExpectedEntry::new("0x01", "0xaa"), ExpectedEntry::new("0x02", "0xbb")];
        let array = SlotDescriptor::array("a1", "0xAAA", "0x05", "2", entries.clone());

        assert_eq!(locate_entries(&array), entries.as_slice());
        assert!(locate_entries(&SlotDescriptor::scalar("s1", "0xAAA", "0x0", "0x01")).is_empty());
    }
}
