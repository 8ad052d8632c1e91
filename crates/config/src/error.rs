//! Error types for the configuration module

use mesc::MescError;

/// Errors that can occur while loading, saving or editing the configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file could not be located, read or written
    #[error("Config file error: {0}")]
    File(String),

    /// The configuration file, or a value given for a key, could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The key is not part of the configuration
    #[error("invalid key: '{0}' is not a valid configuration key.")]
    UnknownKey(String),

    /// Resolving an endpoint through MESC failed
    #[error("MESC error: {0}")]
    MescError(#[from] MescError),
}
