//! Configuration management for slotwatch
//!
//! This crate provides functionality for managing the slotwatch configuration,
//! including loading, saving, updating, and deleting configuration settings.

/// Error types for the configuration module
pub mod error;

use crate::error::Error;
use clap::Parser;
use serde::{Deserialize, Serialize};
use slotwatch_common::utils::io::file::{delete_path, read_file, write_file};
#[allow(deprecated)]
use std::env::home_dir;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Overrides the directory holding `config.toml` (defaults to `$HOME/.slotwatch`).
pub const SLOTWATCH_HOME_ENV: &str = "SLOTWATCH_HOME";

/// The largest accepted `concurrency`.
pub const MAX_CONCURRENCY: usize = 1024;

/// Command line arguments for the configuration command
#[derive(Debug, Clone, Parser)]
#[clap(
    about = "Display and edit the current configuration",
    override_usage = "slotwatch config [OPTIONS]"
)]
pub struct ConfigArgs {
    /// The target key to update.
    #[clap(required = false, default_value = "")]
    key: String,

    /// The value to set the key to.
    #[clap(required = false, default_value = "")]
    value: String,
}

/// The [`Configuration`] struct represents the configuration of the CLI. Every slotwatch command
/// falls back to this configuration for options that are not passed explicitly.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    /// The URL for the Ethereum RPC endpoint
    pub rpc_url: String,

    /// The path to the default descriptor set
    pub descriptors_path: String,

    /// The per-call deadline for storage reads, in seconds
    pub rpc_timeout_secs: u64,

    /// The number of descriptors checked concurrently
    pub concurrency: usize,

    /// The retry budget for failed storage reads, in seconds. Zero disables retries.
    pub retry_max_elapsed_secs: u64,

    /// A webhook that receives every report containing mismatches or errors. Empty disables it.
    pub webhook_url: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            rpc_url: "".to_string(),
            descriptors_path: "".to_string(),
            rpc_timeout_secs: 10,
            concurrency: 4,
            retry_max_elapsed_secs: 0,
            webhook_url: "".to_string(),
        }
    }
}

/// The path of the configuration file, `$SLOTWATCH_HOME/config.toml` or
/// `$HOME/.slotwatch/config.toml`.
#[allow(deprecated)]
pub fn config_path() -> Result<PathBuf, Error> {
    let mut path = match std::env::var(SLOTWATCH_HOME_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let mut home = home_dir().ok_or_else(|| {
                Error::File(
                    "failed to get home directory. does your os support `std::env::home_dir()`?"
                        .to_string(),
                )
            })?;
            home.push(".slotwatch");
            home
        }
    };
    path.push("config.toml");

    Ok(path)
}

fn config_path_str() -> Result<String, Error> {
    config_path()?
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| Error::File("failed to convert path to string".to_string()))
}

impl Configuration {
    /// Returns the current configuration.
    pub fn load() -> Result<Self, Error> {
        let path = config_path()?;

        // if the config file doesn't exist, create it
        if !path.exists() {
            let config = Configuration::default();
            config.save()?;
        }

        // read the config file
        let contents = read_file(&config_path_str()?)
            .map_err(|e| Error::File(format!("failed to read config file: {e}")))?;

        // parse the config file
        let mut config: Configuration = toml::from_str(&contents)
            .map_err(|e| Error::ParseError(format!("failed to parse config file: {e}")))?;

        // load mesc config if enabled
        if !mesc::is_mesc_enabled() {
            return Ok(config);
        }

        if let Some(endpoint) = mesc::get_default_endpoint(Some("slotwatch"))? {
            debug!("overriding rpc_url with mesc endpoint");
            config.rpc_url = endpoint.url;
        }

        Ok(config)
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> Result<(), Error> {
        write_file(
            &config_path_str()?,
            &toml::to_string(&self)
                .map_err(|e| Error::ParseError(format!("failed to serialize config: {e}")))?,
        )
        .map_err(|e| Error::File(format!("failed to write config file: {e}")))?;

        Ok(())
    }

    /// Deletes the configuration file.
    pub fn delete() -> Result<(), Error> {
        delete_path(&config_path_str()?);

        Ok(())
    }

    /// Update a single key/value pair in the configuration.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), Error> {
        // update the key in the struct and ensure it's the correct type
        match key {
            "rpc_url" => {
                self.rpc_url = value.to_string();
            }
            "descriptors_path" => {
                self.descriptors_path = value.to_string();
            }
            "rpc_timeout_secs" => {
                self.rpc_timeout_secs = parse_number(key, value)?;
            }
            "concurrency" => {
                let concurrency = parse_number(key, value)?;
                if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
                    return Err(Error::ParseError(format!(
                        "invalid value: 'concurrency' must be between 1 and {MAX_CONCURRENCY}."
                    )));
                }
                self.concurrency = concurrency;
            }
            "retry_max_elapsed_secs" => {
                self.retry_max_elapsed_secs = parse_number(key, value)?;
            }
            "webhook_url" => {
                self.webhook_url = value.to_string();
            }
            _ => return Err(Error::UnknownKey(key.to_string())),
        }

        // write the updated config to disk
        self.save()?;

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.parse::<T>().map_err(|_| {
        Error::ParseError(format!("invalid value: \'{key}\' must be a non-negative integer."))
    })
}

/// The `config` command is used to display and edit the current configuration.
pub fn config(args: ConfigArgs) -> Result<(), Error> {
    if !args.key.is_empty() {
        if !args.value.is_empty() {
            // read the config file and update the key/value pair
            let mut config = Configuration::load()?;
            config.update(&args.key, &args.value)?;
            info!("updated configuration! Set \'{}\' = \'{}\' .", &args.key, &args.value);
        } else {
            // key is set, but no value is set
            error!("found key but no value to set. Please specify a value to set, use `slotwatch config --help` for more information.");
        }
    } else {
        // no key is set, print the config file
        println!("{:#?}", Configuration::load()?);
        info!("use `slotwatch config <KEY> <VALUE>` to set a key/value pair.");
    }

    Ok(())
}

/// Parse user input --rpc-url into a full url
pub fn parse_url_arg(url: &str) -> Result<String, String> {
    if mesc::is_mesc_enabled() {
        if let Ok(Some(endpoint)) = mesc::get_endpoint_by_query(url, Some("slotwatch")) {
            return Ok(endpoint.url);
        }
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Points the configuration at a fresh temporary directory for the duration of a test.
    fn with_temp_home() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        std::env::set_var(SLOTWATCH_HOME_ENV, dir.path());
        dir
    }

    // Test default configuration
    #[test]
    #[serial]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.rpc_url, "");
        assert_eq!(config.descriptors_path, "");
        assert_eq!(config.rpc_timeout_secs, 10);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.retry_max_elapsed_secs, 0);
        assert_eq!(config.webhook_url, "");
    }

    // Test loading configuration creates a default file
    #[test]
    #[serial]
    fn test_load_configuration() {
        let home = with_temp_home();
        let config = Configuration::load().expect("failed to load config file");

        assert_eq!(config, Configuration::default());
        assert!(home.path().join("config.toml").exists());
    }

    // Test saving configuration to a file
    #[test]
    #[serial]
    fn test_save_configuration() {
        let _home = with_temp_home();
        let mut config = Configuration::default();

        config.update("rpc_url", "http://localhost:8545").expect("failed to update rpc_url");
        config.update("concurrency", "16").expect("failed to update concurrency");

        let loaded_config = Configuration::load().expect("failed to load config file");
        assert_eq!(loaded_config.rpc_url, "http://localhost:8545");
        assert_eq!(loaded_config.concurrency, 16);
        assert_eq!(loaded_config.rpc_timeout_secs, 10);
    }

    // Test partial files fall back to defaults
    #[test]
    #[serial]
    fn test_load_partial_configuration() {
        let home = with_temp_home();
        std::fs::write(home.path().join("config.toml"), "rpc_url = \"http://node:8545\"\n")
            .expect("unable to write config");

        let config = Configuration::load().expect("failed to load config file");
        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.concurrency, 4);
    }

    // Test invalid updates are rejected
    #[test]
    #[serial]
    fn test_update_rejects_invalid_values() {
        let _home = with_temp_home();
        let mut config = Configuration::default();

        assert!(matches!(config.update("concurrency", "0"), Err(Error::ParseError(_))));
        assert!(matches!(config.update("concurrency", "1025"), Err(Error::ParseError(_))));
        assert!(matches!(
            config.update("concurrency", "3000000000000000000"),
            Err(Error::ParseError(_))
        ));
        assert!(matches!(config.update("rpc_timeout_secs", "soon"), Err(Error::ParseError(_))));
        assert!(matches!(config.update("etherscan_api_key", "x"), Err(Error::UnknownKey(_))));
        assert_eq!(config, Configuration::default());
    }

    // Test deleting configuration file
    #[test]
    #[serial]
    fn test_delete_configuration() {
        let _home = with_temp_home();
        let mut config = Configuration::load().expect("failed to load config file");
        config.update("webhook_url", "https://hooks.example.com/x").expect("failed to update");

        Configuration::delete().expect("failed to delete config file");
        let config = Configuration::load().expect("failed to load config file");

        assert_eq!(config.webhook_url, "");
    }

    #[test]
    fn test_parse_url_arg_passthrough() {
        assert_eq!(
            parse_url_arg("http://localhost:8545").expect("failed to parse url"),
            "http://localhost:8545"
        );
    }
}
