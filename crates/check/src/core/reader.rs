//! The storage read boundary: one idempotent "get storage at (address, key)" call.

use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use slotwatch_common::{
    ether::{provider::MultiTransportProvider, slots::parse_storage_key},
    utils::hex::ToLowerHex,
};
use tracing::trace;

use crate::error::Error;

/// The 32-byte zero word, as returned for storage that was never written.
pub const ZERO_WORD: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Reads a single storage word.
///
/// Implementations must be safe to call concurrently and must not retry: transport failures are
/// returned as [`Error::Transport`] and retry policy is left to the caller.
#[async_trait]
pub trait StorageReader: Send + Sync {
    /// Read the word stored at `key` in the storage of `contract_address`, as `0x`-prefixed hex.
    async fn read(&self, contract_address: &str, key: &str) -> Result<String, Error>;
}

/// A [`StorageReader`] backed by a node's `eth_getStorageAt`.
#[derive(Debug, Clone)]
pub struct RpcStorageReader {
    provider: MultiTransportProvider,
    block: Option<u64>,
    timeout: Duration,
}

impl RpcStorageReader {
    /// Creates a reader that reads at `block` (or the latest block when `None`), bounding each
    /// call by `timeout`.
    pub fn new(provider: MultiTransportProvider, block: Option<u64>, timeout: Duration) -> Self {
        Self { provider, block, timeout }
    }
}

#[async_trait]
impl StorageReader for RpcStorageReader {
    async fn read(&self, contract_address: &str, key: &str) -> Result<String, Error> {
        let address = contract_address.parse::<Address>().map_err(|e| {
            Error::Config(format!("invalid contract address '{contract_address}': {e}"))
        })?;
        let slot = parse_storage_key(key)
            .map_err(|e| Error::Config(format!("invalid storage key '{key}': {e}")))?;

        trace!("fetching storage at {}[{}] from node", contract_address, key);
        let value =
            tokio::time::timeout(self.timeout, self.provider.get_storage_at(address, slot, self.block))
                .await
                .map_err(|_| {
                    Error::Transport(format!(
                        "reading {contract_address}[{key}] timed out after {:?}",
                        self.timeout
                    ))
                })?
                .map_err(|e| Error::Transport(format!("failed to read {contract_address}[{key}]: {e}")))?;

        Ok(value.to_lower_hex())
    }
}

/// An in-memory [`StorageReader`], for checking descriptors against captured storage.
///
/// Addresses are matched case-insensitively, keys exactly as written. Unset storage reads as
/// [`ZERO_WORD`], like a node would answer.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageReader {
    storage: HashMap<(String, String), String>,
    unreachable: HashSet<String>,
}

impl MemoryStorageReader {
    /// Creates an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the word at `contract_address[key]`.
    pub fn with_value(
        mut self,
        contract_address: impl AsRef<str>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.storage
            .insert((contract_address.as_ref().to_lowercase(), key.into()), value.into());
        self
    }

    /// Makes every read of `contract_address` fail with a transport error.
    pub fn with_unreachable(mut self, contract_address: impl AsRef<str>) -> Self {
        self.unreachable.insert(contract_address.as_ref().to_lowercase());
        self
    }
}

#[async_trait]
impl StorageReader for MemoryStorageReader {
    async fn read(&self, contract_address: &str, key: &str) -> Result<String, Error> {
        let address = contract_address.to_lowercase();
        if self.unreachable.contains(&address) {
            return Err(Error::Transport(format!("{contract_address} is unreachable")));
        }

        Ok(self
            .storage
            .get(&(address, key.to_string()))
            .cloned()
            .unwrap_or_else(|| ZERO_WORD.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_reader() {
        let reader = MemoryStorageReader::new()
            .with_value("0xAbC", "0x01", "0x02")
            .with_unreachable("0xDEAD");

        assert_eq!(reader.read("0xabc", "0x01").await.expect("read failed"), "0x02");
        assert_eq!(reader.read("0xabc", "0x02").await.expect("read failed"), ZERO_WORD);
        assert!(matches!(reader.read("0xdead", "0x01").await, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_rpc_reader_rejects_bad_address_before_any_call() {
        let rpc_url = match std::env::var("RPC_URL") {
            Ok(rpc_url) => rpc_url,
            Err(_) => {
                println!("RPC_URL not set, skipping test");
                return;
            }
        };

        let provider =
            MultiTransportProvider::connect(&rpc_url).await.expect("failed to connect");
        let reader = RpcStorageReader::new(provider, None, Duration::from_secs(10));

        assert!(matches!(reader.read("0xAAA", "0x0").await, Err(Error::Config(_))));
        assert!(matches!(
            reader.read("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "slot").await,
            Err(Error::Config(_))
        ));

        let value = reader
            .read("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "0x0")
            .await
            .expect("failed to read storage");
        assert_eq!(value.len(), 66);
    }
}
