pub(crate) mod checker;
pub(crate) mod comparator;
pub(crate) mod coordinator;
pub(crate) mod locator;
pub(crate) mod reader;

use eyre::eyre;
use slotwatch_common::ether::provider::MultiTransportProvider;
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    interfaces::{load_descriptors, CheckArgs, RunReport},
};
use coordinator::{RunOptions, SlotWatcher};
use reader::RpcStorageReader;

/// Builds a [`SlotWatcher`] reading from the node at `args.rpc_url`.
///
/// Connecting to the provider is the only failure here; it happens once per process and is
/// shared by every subsequent run.
pub async fn connect(args: &CheckArgs) -> Result<SlotWatcher<RpcStorageReader>, Error> {
    let provider = MultiTransportProvider::connect(&args.rpc_url)
        .await
        .map_err(|e| eyre!("failed to connect to provider '{}': {e}", &args.rpc_url))?;
    match tokio::time::timeout(args.timeout(), provider.get_chainid()).await {
        Ok(Ok(chain_id)) => info!("connected to chain {}", chain_id),
        Ok(Err(e)) => warn!("unable to fetch chain id, the node may be unreachable: {}", e),
        Err(_) => warn!("timed out fetching chain id, the node may be unreachable"),
    }
    let reader = RpcStorageReader::new(provider, args.block, args.timeout());

    Ok(SlotWatcher::new(reader).with_options(RunOptions {
        concurrency: args.concurrency(),
        retry_max_elapsed: args.retry_max_elapsed(),
    }))
}

/// Loads the descriptor set at `args.descriptors` and checks it against the node at
/// `args.rpc_url`.
///
/// Only startup failures (unreadable descriptor set, unreachable provider) are returned as
/// errors; everything that goes wrong while checking a descriptor is recorded in the report.
pub async fn check(args: CheckArgs) -> Result<RunReport, Error> {
    let descriptors = load_descriptors(&args.descriptors)?;
    debug!("loaded {} descriptors from '{}'", descriptors.len(), &args.descriptors);

    let watcher = connect(&args).await?;
    Ok(watcher.run(&descriptors).await)
}
