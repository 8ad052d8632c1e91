pub(crate) mod error;
pub(crate) mod log_args;
pub(crate) mod notify;
pub(crate) mod output;
pub(crate) mod slot;
pub(crate) mod watch;

use error::Error;
use log_args::LogArgs;
use notify::{deliver, ConsoleNotifier, Notifier, WebhookNotifier};
use output::{exit_code, write_report, EXIT_CLEAN, EXIT_STARTUP};
use slot::{slot, SlotArgs};
use tracing::{debug, error, info};
use watch::{watch, WatchArgs};

use clap::{Args, Parser, Subcommand};

use slotwatch_check::{check, CheckArgs};
use slotwatch_common::utils::io::file::short_path;
use slotwatch_config::{config, ConfigArgs, Configuration};

#[derive(Debug, Parser)]
#[clap(name = "slotwatch", version)]
pub(crate) struct Arguments {
    #[clap(subcommand)]
    pub(crate) sub: Subcommands,

    #[clap(flatten)]
    logs: LogArgs,
}

#[derive(Debug, Subcommand)]
#[clap(
    about = "slotwatch compares contract storage slots on an Ethereum node against their expected values."
)]
#[allow(clippy::large_enum_variant)]
pub(crate) enum Subcommands {
    #[clap(name = "check", about = "Check a descriptor set once and report any divergence")]
    Check(CheckCommand),

    #[clap(name = "watch", about = "Check a descriptor set periodically until interrupted")]
    Watch(WatchCommand),

    #[clap(name = "slot", about = "Derive storage keys for slot descriptors")]
    Slot(SlotArgs),

    #[clap(name = "config", about = "Display and edit the current configuration")]
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct CheckCommand {
    #[clap(flatten)]
    pub(crate) check: CheckArgs,

    #[clap(flatten)]
    pub(crate) delivery: DeliveryArgs,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct WatchCommand {
    #[clap(flatten)]
    pub(crate) check: CheckArgs,

    #[clap(flatten)]
    pub(crate) delivery: DeliveryArgs,

    #[clap(flatten)]
    pub(crate) watch: WatchArgs,
}

/// Where finished reports are delivered.
#[derive(Debug, Clone, Args)]
#[clap(next_help_heading = "DELIVERY")]
pub(crate) struct DeliveryArgs {
    /// POST each report to this webhook. Falls back to the configured `webhook_url`.
    #[clap(long, default_value = "", hide_default_value = true)]
    pub(crate) webhook_url: String,

    /// Also deliver reports with no mismatches and no errors to the webhook.
    #[clap(long)]
    pub(crate) notify_clean: bool,

    /// Don't print the report to the console.
    #[clap(long)]
    pub(crate) no_console: bool,
}

/// Fills every option the user left unset from the configuration file.
fn apply_configuration(
    cmd: &mut CheckArgs,
    delivery: &mut DeliveryArgs,
    configuration: &Configuration,
) {
    // if the user has not specified a rpc url, use the default
    if cmd.rpc_url.is_empty() {
        cmd.rpc_url = configuration.rpc_url.clone();
    }
    if cmd.descriptors.is_empty() {
        cmd.descriptors = configuration.descriptors_path.clone();
    }
    cmd.timeout = cmd.timeout.or(Some(configuration.rpc_timeout_secs));
    cmd.concurrency = cmd.concurrency.or(Some(configuration.concurrency));
    cmd.retry = cmd.retry.or(Some(configuration.retry_max_elapsed_secs));

    if delivery.webhook_url.is_empty() {
        delivery.webhook_url = configuration.webhook_url.clone();
    }
}

/// The notifiers a command delivers to.
fn notifiers(cmd: &CheckArgs, delivery: &DeliveryArgs) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    // the json report already goes to the console when printing
    if !delivery.no_console && cmd.output != "print" {
        notifiers.push(Box::new(ConsoleNotifier));
    }
    if !delivery.webhook_url.is_empty() {
        notifiers.push(Box::new(WebhookNotifier::new(
            &delivery.webhook_url,
            cmd.timeout.unwrap_or(slotwatch_check::DEFAULT_TIMEOUT_SECS),
            delivery.notify_clean,
        )));
    }

    notifiers
}

fn validate(cmd: &CheckArgs) -> Result<(), Error> {
    if cmd.descriptors.is_empty() {
        return Err(Error::Generic(
            "no descriptor set given; pass a path or set `descriptors_path` with `slotwatch config`"
                .to_string(),
        ));
    }
    if cmd.rpc_url.is_empty() {
        return Err(Error::Generic(
            "no rpc url given; pass --rpc-url or set `rpc_url` with `slotwatch config`".to_string(),
        ));
    }
    Ok(())
}

async fn run(sub: Subcommands, configuration: Configuration) -> Result<i32, Error> {
    match sub {
        Subcommands::Check(mut cmd) => {
            apply_configuration(&mut cmd.check, &mut cmd.delivery, &configuration);
            validate(&cmd.check)?;

            let report = check(cmd.check.clone()).await?;
            info!("{}", report.summary());

            deliver(&report, &notifiers(&cmd.check, &cmd.delivery)).await;
            if let Some(path) = write_report(&report, &cmd.check.output, &cmd.check.name)
                .map_err(|e| Error::Generic(format!("failed to write report: {}", e)))?
            {
                info!("wrote report to '{}'", short_path(&path));
            }

            Ok(exit_code(&report))
        }

        Subcommands::Watch(mut cmd) => {
            apply_configuration(&mut cmd.check, &mut cmd.delivery, &configuration);
            validate(&cmd.check)?;

            watch(&cmd.check, &cmd.watch, &notifiers(&cmd.check, &cmd.delivery)).await
        }

        Subcommands::Slot(cmd) => {
            let keys =
                slot(&cmd).map_err(|e| Error::Generic(format!("failed to derive slot: {}", e)))?;
            for (label, key) in keys {
                println!("{} {}", key, label);
            }
            Ok(EXIT_CLEAN)
        }

        Subcommands::Config(cmd) => {
            config(cmd)?;
            Ok(EXIT_CLEAN)
        }
    }
}

/// The process exit status for a finished command. A command that failed before producing a
/// report exits with [`EXIT_STARTUP`], which never collides with the report bits.
fn exit_status(result: Result<i32, Error>) -> i32 {
    result.unwrap_or_else(|e| {
        error!("{}", e);
        EXIT_STARTUP
    })
}

#[tokio::main]
async fn main() {
    let args = Arguments::parse();

    // setup logging
    let guard = match args.logs.init_tracing() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {}", e);
            std::process::exit(EXIT_STARTUP);
        }
    };

    let result = match Configuration::load() {
        Ok(configuration) => run(args.sub, configuration).await,
        Err(e) => Err(e.into()),
    };
    let code = exit_status(result);
    debug!("exiting with code {}", code);

    // flush file logs before exiting
    drop(guard);
    std::process::exit(code)
}
