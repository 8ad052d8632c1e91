use alloy::primitives::U256;
use clap::Parser;
use eyre::{eyre, Result};
use slotwatch_common::{
    ether::slots::{array_element_slot, mapping_slot, name_slot, parse_storage_key},
    utils::hex::ToLowerHex,
};

#[derive(Debug, Clone, Parser)]
#[clap(
    about = "Derive storage keys for slot descriptors",
    override_usage = "slotwatch slot [--name <NAME> | --base <BASE> (--index <I>... | --key <K>...)]"
)]
pub(crate) struct SlotArgs {
    /// Hash a slot name into its storage key, as unstructured storage patterns do.
    #[clap(long, conflicts_with = "base")]
    pub(crate) name: Option<String>,

    /// The slot holding an array's length, or declaring a mapping. Given as hex, decimal, or a
    /// slot name to hash.
    #[clap(long)]
    pub(crate) base: Option<String>,

    /// Array indices whose element keys to derive.
    #[clap(long, num_args = 1.., requires = "base", conflicts_with = "key")]
    pub(crate) index: Vec<String>,

    /// Mapping keys (integers or addresses) whose entry keys to derive.
    #[clap(long, num_args = 1.., requires = "base")]
    pub(crate) key: Vec<String>,
}

/// Derives the storage keys `args` asks for, as `(label, key)` pairs.
pub(crate) fn slot(args: &SlotArgs) -> Result<Vec<(String, String)>> {
    if let Some(name) = &args.name {
        return Ok(vec![(name.clone(), name_slot(name).to_lower_hex())]);
    }

    let base_arg =
        args.base.as_deref().ok_or_else(|| eyre!("either --name or --base is required"))?;
    let base = parse_base(base_arg);

    if !args.index.is_empty() {
        return args
            .index
            .iter()
            .map(|index| {
                let key = array_element_slot(base, parse_storage_key(index)?);
                Ok((format!("{}[{}]", base_arg, index), key.to_lower_hex()))
            })
            .collect();
    }

    if !args.key.is_empty() {
        return args
            .key
            .iter()
            .map(|key| {
                let slot = mapping_slot(base, parse_storage_key(key)?);
                Ok((format!("{}[{}]", base_arg, key), slot.to_lower_hex()))
            })
            .collect();
    }

    Err(eyre!("--base requires --index or --key"))
}

/// A base given as a number is used as-is; anything else is treated as a slot name.
fn parse_base(base: &str) -> U256 {
    parse_storage_key(base).unwrap_or_else(|_| U256::from_be_bytes(name_slot(base).0))
}
