#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("{0}")]
    Generic(String),
    #[error("Check error: {0}")]
    CheckError(#[from] slotwatch_check::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] slotwatch_config::error::Error),
}
