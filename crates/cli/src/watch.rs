use std::{future::Future, time::Duration};

use clap::Args;
use slotwatch_check::{
    connect, load_descriptors, CheckArgs, Error as CheckError, SlotDescriptor, SlotWatcher,
    StorageReader,
};
use slotwatch_common::utils::io::file::short_path;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    notify::{deliver, Notifier},
    output::{exit_code, write_report, EXIT_CLEAN},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct WatchArgs {
    /// Seconds between the start of consecutive runs.
    #[clap(long, default_value_t = 300)]
    pub(crate) interval: u64,

    /// Stop after this many runs. Runs until interrupted when unset.
    #[clap(long)]
    pub(crate) iterations: Option<u64>,
}

/// Checks the descriptor set every `watch.interval` seconds, delivering each report, until
/// interrupted or `watch.iterations` runs have completed. Returns the exit code of the last
/// run.
///
/// The descriptor set is loaded and the provider connected once, up front.
pub(crate) async fn watch(
    args: &CheckArgs,
    watch: &WatchArgs,
    notifiers: &[Box<dyn Notifier>],
) -> Result<i32, Error> {
    let descriptors = load_descriptors(&args.descriptors)?;
    let watcher = connect(args).await?;
    info!(
        "watching {} descriptors every {}s{}",
        descriptors.len(),
        watch.interval,
        watch.iterations.map(|n| format!(" for {} runs", n)).unwrap_or_default()
    );

    Ok(watch_loop(&watcher, &descriptors, args, watch, notifiers, tokio::signal::ctrl_c()).await)
}

/// The periodic loop behind [`watch`]. `shutdown` is polled both between runs and while a run
/// is in flight; an interrupted run is abandoned without delivering a report.
pub(crate) async fn watch_loop<R, F, T>(
    watcher: &SlotWatcher<R>,
    descriptors: &[SlotDescriptor],
    args: &CheckArgs,
    watch: &WatchArgs,
    notifiers: &[Box<dyn Notifier>],
    shutdown: F,
) -> i32
where
    R: StorageReader,
    F: Future<Output = T>,
{
    let mut interval = tokio::time::interval(Duration::from_secs(watch.interval.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0u64;
    let mut last_code = EXIT_CLEAN;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("interrupted, stopping after {} runs", runs);
                break;
            }
        }

        let report = tokio::select! {
            report = watcher.run(descriptors) => report,
            _ = &mut shutdown => {
                info!("interrupted during run {}, stopping", runs + 1);
                break;
            }
        };
        runs += 1;
        debug!("run {} finished: {}", runs, report.summary());

        deliver(&report, notifiers).await;
        match write_report(&report, &args.output, &args.name) {
            Ok(Some(path)) => debug!("wrote report to '{}'", short_path(&path)),
            Ok(None) => {}
            Err(e) => warn!("failed to write report: {}", e),
        }

        last_code = exit_code(&report);
        if watch.iterations.is_some_and(|n| runs >= n) {
            break;
        }
    }

    last_code
}
