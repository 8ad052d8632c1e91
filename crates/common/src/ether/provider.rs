//! Create a custom data transport to use with a Provider.
use alloy::{
    eips::BlockId,
    network::Ethereum,
    primitives::{Address, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
};
use eyre::Result;

/// [`MultiTransportProvider`] is a convenience wrapper around the different transport types
/// supported by the [`Provider`].
///
/// Cloning is cheap: every clone shares the same underlying client, so a single provider can
/// be handed to many concurrent storage reads.
#[derive(Clone, Debug)]
pub struct MultiTransportProvider {
    provider: RootProvider<Ethereum>,
}

// We implement a convenience "constructor" method, to easily initialize the transport.
// This will connect to [`Http`] if the rpc_url contains 'http', to [`Ws`] if it contains 'ws',
// otherwise it'll default to [`Ipc`].
impl MultiTransportProvider {
    /// Connect to a provider using the given rpc_url.
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        if rpc_url.is_empty() {
            return Err(eyre::eyre!("No RPC URL provided"));
        }

        let provider = ProviderBuilder::new().connect(rpc_url).await?.root().clone();
        Ok(Self { provider })
    }

    /// Get the chain id.
    pub async fn get_chainid(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    /// Get the raw 32-byte word stored at `slot` in the storage of `address`.
    /// When `block` is `None`, the read is made against the latest block.
    pub async fn get_storage_at(
        &self,
        address: Address,
        slot: U256,
        block: Option<u64>,
    ) -> Result<B256> {
        let block_id = match block {
            Some(number) => BlockId::number(number),
            None => BlockId::latest(),
        };

        let value = self.provider.get_storage_at(address, slot).block_id(block_id).await?;
        Ok(B256::from(value.to_be_bytes::<32>()))
    }
}
