use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use slotwatch_common::{
    constants::ADDRESS_REGEX, ether::slots::parse_storage_key, utils::io::file::read_file,
};
use tracing::warn;

use crate::error::Error;

/// A single monitored storage location and what it is expected to hold.
///
/// Descriptors are supplied by configuration and are never mutated by the checker.
/// On the wire they use the flat `isArray` shape; in memory the scalar and array cases are
/// separate [`SlotKind`] variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSlotDescriptor", into = "RawSlotDescriptor")]
pub struct SlotDescriptor {
    /// Opaque identifier, used in reports.
    pub id: String,
    /// The contract whose storage is read.
    pub contract_address: String,
    /// Human label for reports.
    pub contract_name: String,
    /// Human-readable slot name. Hashed into the storage key when no
    /// [`slot_address`](Self::slot_address) is configured.
    pub slot_name: Option<String>,
    /// Explicit storage key. Takes precedence over [`slot_name`](Self::slot_name).
    pub slot_address: Option<String>,
    /// What to compare the slot against.
    pub kind: SlotKind,
}

/// The expectation attached to a [`SlotDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    /// A single storage word compared against `expected`.
    Scalar {
        /// The expected word. `None` is a configuration fault reported at check time.
        expected: Option<String>,
    },
    /// An array or mapping: the length word at the primary slot, plus optional entries at
    /// already-derived keys.
    Array {
        /// The expected value of the length word at the primary slot.
        expected_length: Option<String>,
        /// Expected values at derived storage keys, checked in order.
        expected_map: Vec<ExpectedEntry>,
    },
}

/// An expected value at a specific, already-derived storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedEntry {
    /// The derived storage key to read.
    pub key: String,
    /// The value expected at `key`.
    pub value: String,
}

impl ExpectedEntry {
    /// Creates a new entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl SlotDescriptor {
    /// A scalar descriptor with an explicit storage key.
    pub fn scalar(
        id: impl Into<String>,
        contract_address: impl Into<String>,
        slot_address: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            contract_address: contract_address.into(),
            contract_name: String::new(),
            slot_name: None,
            slot_address: Some(slot_address.into()),
            kind: SlotKind::Scalar { expected: Some(expected.into()) },
        }
    }

    /// An array descriptor with an explicit length slot.
    pub fn array(
        id: impl Into<String>,
        contract_address: impl Into<String>,
        slot_address: impl Into<String>,
        expected_length: impl Into<String>,
        expected_map: Vec<ExpectedEntry>,
    ) -> Self {
        Self {
            id: id.into(),
            contract_address: contract_address.into(),
            contract_name: String::new(),
            slot_name: None,
            slot_address: Some(slot_address.into()),
            kind: SlotKind::Array { expected_length: Some(expected_length.into()), expected_map },
        }
    }

    /// Sets the human label used in reports.
    pub fn with_contract_name(mut self, contract_name: impl Into<String>) -> Self {
        self.contract_name = contract_name.into();
        self
    }

    /// Sets the slot name. Does not clear an explicit slot address.
    pub fn with_slot_name(mut self, slot_name: impl Into<String>) -> Self {
        self.slot_name = Some(slot_name.into());
        self
    }

    /// Clears the explicit slot address, so the key is derived from the slot name.
    pub fn without_slot_address(mut self) -> Self {
        self.slot_address = None;
        self
    }

    /// Whether this descriptor takes the array/mapping check path.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, SlotKind::Array { .. })
    }

    /// Malformed fields that will fail this descriptor at check time.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !ADDRESS_REGEX.is_match(&self.contract_address).unwrap_or(false) {
            problems.push(format!("malformed contract address '{}'", self.contract_address));
        }

        let entry_keys: Vec<&String> = match &self.kind {
            SlotKind::Array { expected_map, .. } => expected_map.iter().map(|e| &e.key).collect(),
            SlotKind::Scalar { .. } => Vec::new(),
        };
        for key in self.slot_address.iter().chain(entry_keys) {
            if parse_storage_key(key).is_err() {
                problems.push(format!("malformed storage key '{}'", key));
            }
        }

        problems
    }
}

/// The flat, loosely-typed shape descriptors have in configuration files.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlotDescriptor {
    id: String,
    #[serde(alias = "contract_address")]
    contract_address: String,
    #[serde(default, alias = "contract_name")]
    contract_name: String,
    #[serde(default, alias = "slot_name", skip_serializing_if = "Option::is_none")]
    slot_name: Option<String>,
    #[serde(default, alias = "slot_address", skip_serializing_if = "Option::is_none")]
    slot_address: Option<String>,
    #[serde(default, alias = "is_array")]
    is_array: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_expected",
        skip_serializing_if = "Option::is_none"
    )]
    expected: Option<String>,
    #[serde(default, alias = "expected_map", skip_serializing_if = "Option::is_none")]
    expected_map: Option<Vec<ExpectedEntry>>,
}

impl From<RawSlotDescriptor> for SlotDescriptor {
    fn from(raw: RawSlotDescriptor) -> Self {
        let kind = if raw.is_array {
            SlotKind::Array {
                expected_length: raw.expected,
                expected_map: raw.expected_map.unwrap_or_default(),
            }
        } else {
            SlotKind::Scalar { expected: raw.expected }
        };

        Self {
            id: raw.id,
            contract_address: raw.contract_address,
            contract_name: raw.contract_name,
            slot_name: raw.slot_name,
            slot_address: raw.slot_address,
            kind,
        }
    }
}

impl From<SlotDescriptor> for RawSlotDescriptor {
    fn from(descriptor: SlotDescriptor) -> Self {
        let (is_array, expected, expected_map) = match descriptor.kind {
            SlotKind::Scalar { expected } => (false, expected, None),
            SlotKind::Array { expected_length, expected_map } => {
                (true, expected_length, (!expected_map.is_empty()).then_some(expected_map))
            }
        };

        Self {
            id: descriptor.id,
            contract_address: descriptor.contract_address,
            contract_name: descriptor.contract_name,
            slot_name: descriptor.slot_name,
            slot_address: descriptor.slot_address,
            is_array,
            expected,
            expected_map,
        }
    }
}

/// `expected` is a hex string for scalars, but lengths are commonly written as plain integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpectedValue {
    Text(String),
    Number(u64),
}

fn deserialize_expected<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>, {
    Ok(Option::<ExpectedValue>::deserialize(deserializer)?.map(|value| match value {
        ExpectedValue::Text(text) => text,
        ExpectedValue::Number(number) => number.to_string(),
    }))
}

/// The toml layout: a top-level array of `[[slot]]` tables.
#[derive(Debug, Deserialize)]
struct DescriptorFile {
    #[serde(rename = "slot", alias = "slots", default)]
    slots: Vec<SlotDescriptor>,
}

/// Load an ordered descriptor set from a `.json` (top-level array) or `.toml` (`[[slot]]`
/// tables) file. Order in the file is the order of the run report.
///
/// Descriptors with a malformed address or key are kept: they fail on their own at check time.
/// Loading only warns about them.
pub fn load_descriptors(path: &str) -> Result<Vec<SlotDescriptor>, Error> {
    let contents = read_file(path)
        .map_err(|e| Error::Config(format!("failed to read descriptor file '{path}': {e}")))?;

    let descriptors = match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("toml") => parse_toml_descriptors(&contents),
        _ => parse_json_descriptors(&contents),
    }
    .map_err(|e| Error::Config(format!("failed to parse descriptor file '{path}': {e}")))?;

    for descriptor in &descriptors {
        for problem in descriptor.problems() {
            warn!("descriptor '{}' in '{}': {}", descriptor.id, path, problem);
        }
    }

    Ok(descriptors)
}

/// Parse a descriptor set from a json array.
pub fn parse_json_descriptors(contents: &str) -> eyre::Result<Vec<SlotDescriptor>> {
    Ok(serde_json::from_str(contents)?)
}

/// Parse a descriptor set from `[[slot]]` toml tables.
pub fn parse_toml_descriptors(contents: &str) -> eyre::Result<Vec<SlotDescriptor>> {
    Ok(toml::from_str::<DescriptorFile>(contents)?.slots)
}
