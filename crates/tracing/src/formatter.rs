use crate::layers::BoxedLayer;
use clap::ValueEnum;
use std::{fmt, fmt::Display, io::IsTerminal};
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Represents the logging format.
///
/// This enum defines the supported formats for logging output.
/// It is used to configure the format layer of a tracing subscriber.
#[derive(Debug, Copy, Clone, ValueEnum, Eq, PartialEq)]
pub enum LogFormat {
    /// Represents JSON formatting for logs.
    /// This format outputs log records as JSON objects,
    /// making it suitable for structured logging.
    Json,

    /// Represents logfmt (key=value) formatting for logs.
    /// This format is concise and human-readable,
    /// typically used in command-line applications.
    LogFmt,

    /// Represents terminal-friendly formatting for logs.
    Terminal,
}

impl LogFormat {
    /// Applies the specified logging format to create a new layer.
    ///
    /// `color` is `None` when the sink cannot render ANSI escapes at all, otherwise it is the
    /// user's color mode (`always`, `auto`, `never`). `RUST_LOG_STYLE` overrides it.
    pub fn apply(
        &self,
        filter: EnvFilter,
        color: Option<String>,
        file_writer: Option<NonBlocking>,
    ) -> BoxedLayer<Registry> {
        let ansi = use_ansi(
            color.as_deref(),
            std::env::var("RUST_LOG_STYLE").ok().as_deref(),
            std::io::stdout().is_terminal(),
        );
        let target = std::env::var("RUST_LOG_TARGET")
            .map(|val| val != "0")
            .unwrap_or_else(|_| self != &Self::Terminal);

        match self {
            Self::Json => {
                let layer =
                    tracing_subscriber::fmt::layer().json().with_ansi(ansi).with_target(target);

                if let Some(writer) = file_writer {
                    layer.with_writer(writer).with_filter(filter).boxed()
                } else {
                    layer.with_filter(filter).boxed()
                }
            }
            Self::LogFmt => {
                if let Some(writer) = file_writer {
                    tracing_logfmt::builder().layer().with_writer(writer).with_filter(filter).boxed()
                } else {
                    tracing_logfmt::layer().with_filter(filter).boxed()
                }
            }
            Self::Terminal => {
                let layer = tracing_subscriber::fmt::layer().with_ansi(ansi).with_target(target);

                if let Some(writer) = file_writer {
                    layer.with_writer(writer).with_filter(filter).boxed()
                } else {
                    layer.with_filter(filter).boxed()
                }
            }
        }
    }
}

/// Whether a sink should emit ANSI escapes. `style` (from `RUST_LOG_STYLE`) overrides the color
/// mode; `auto` only colors terminals.
fn use_ansi(color: Option<&str>, style: Option<&str>, is_terminal: bool) -> bool {
    let Some(color) = color else {
        return false;
    };

    match style.unwrap_or(color) {
        "never" => false,
        "auto" => is_terminal,
        _ => true,
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::LogFmt => write!(f, "log-fmt"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_color_only_on_terminals() {
        assert!(use_ansi(Some("auto"), None, true));
        assert!(!use_ansi(Some("auto"), None, false));
    }

    #[test]
    fn test_color_modes() {
        assert!(use_ansi(Some("always"), None, false));
        assert!(!use_ansi(Some("never"), None, true));
        assert!(!use_ansi(None, Some("always"), true));
    }

    #[test]
    fn test_log_style_overrides_color_mode() {
        assert!(!use_ansi(Some("always"), Some("never"), true));
        assert!(use_ansi(Some("never"), Some("always"), false));
        assert!(!use_ansi(Some("always"), Some("auto"), false));
    }
}
