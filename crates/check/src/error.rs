use serde::{Deserialize, Serialize};

/// Error type for the Check module
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The storage read failed: the node was unreachable, answered with an error, or the
    /// per-call deadline elapsed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The descriptor being checked is malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Eyre(#[from] eyre::Report),
}

impl Error {
    /// The coarse category of this error, as recorded in a run report.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Config(_) => ErrorKind::Config,
            Error::Eyre(_) => ErrorKind::Internal,
        }
    }
}

/// The category of a descriptor-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`Error::Transport`]
    Transport,
    /// See [`Error::Config`]
    Config,
    /// See [`Error::Eyre`]
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}
