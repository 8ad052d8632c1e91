use std::time::Duration;

use clap::{builder::RangedU64ValueParser, Parser};
use derive_builder::Builder;
use slotwatch_config::{parse_url_arg, MAX_CONCURRENCY};

#[derive(Debug, Clone, Parser, Builder)]
#[clap(about = "Compare contract storage slots against their expected values")]
/// Arguments for the check operation
///
/// This struct contains all the configuration parameters needed to check a
/// descriptor set against a node.
pub struct CheckArgs {
    /// Path to the descriptor set (`.json` or `.toml`). Falls back to the configured
    /// `descriptors_path` when empty.
    #[clap(default_value = "", hide_default_value = true)]
    pub descriptors: String,

    /// The RPC URL to use for fetching data.
    /// This can be an explicit URL or a reference to a MESC endpoint.
    #[clap(long, short, value_parser = parse_url_arg, default_value = "", hide_default_value = true)]
    pub rpc_url: String,

    /// Read storage as of this block number instead of the latest block.
    #[clap(long, short)]
    pub block: Option<u64>,

    /// Per-call deadline for storage reads, in seconds. [default: 10]
    #[clap(long)]
    pub timeout: Option<u64>,

    /// The number of descriptors to check concurrently. [default: 4]
    #[clap(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_CONCURRENCY as u64))]
    pub concurrency: Option<usize>,

    /// Retry failed storage reads with exponential backoff for up to this many seconds.
    /// Zero disables retries. [default: 0]
    #[clap(long)]
    pub retry: Option<u64>,

    /// The output directory to write the json report to, 'print' to print it to the console,
    /// or empty to only log the outcomes.
    #[clap(long = "output", short, default_value = "", hide_default_value = true)]
    pub output: String,

    /// The name for the output file
    #[clap(long, short, default_value = "", hide_default_value = true)]
    pub name: String,
}

/// The storage read deadline used when none is configured, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The number of concurrent descriptor checks used when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

impl CheckArgs {
    /// The storage read deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// The number of concurrent descriptor checks.
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    /// The retry budget for transport failures, `None` when retries are disabled.
    pub fn retry_max_elapsed(&self) -> Option<Duration> {
        self.retry.filter(|secs| *secs > 0).map(Duration::from_secs)
    }
}

impl CheckArgsBuilder {
    /// Creates a new CheckArgsBuilder with default values
    pub fn new() -> Self {
        Self {
            descriptors: Some(String::new()),
            rpc_url: Some(String::new()),
            block: Some(None),
            timeout: Some(None),
            concurrency: Some(None),
            retry: Some(None),
            output: Some(String::new()),
            name: Some(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_bounds() {
        let parse = |value: &str| {
            CheckArgs::try_parse_from(["check", "slots.json", "--concurrency", value])
                .map(|args| args.concurrency())
        };

        assert_eq!(parse("1").expect("1 is in range"), 1);
        assert_eq!(parse("1024").expect("1024 is in range"), MAX_CONCURRENCY);
        assert!(parse("0").is_err());
        assert!(parse("3000000000000000000").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = CheckArgsBuilder::new().build().expect("failed to build args");

        assert_eq!(args.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(args.concurrency(), DEFAULT_CONCURRENCY);
        assert_eq!(args.retry_max_elapsed(), None);
    }
}
