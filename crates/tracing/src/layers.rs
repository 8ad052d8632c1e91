use std::path::{Path, PathBuf};

use rolling_file::{RollingConditionBasic, RollingFileAppender};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Directive, EnvFilter, Layer, Registry};

use crate::formatter::LogFormat;

/// A worker guard returned by the file layer.
///
/// When a guard is dropped, all events currently in-memory are flushed to the log file this
/// guard belongs to.
pub type FileWorkerGuard = WorkerGuard;

/// A boxed tracing [Layer].
pub(crate) type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

const SLOTWATCH_LOG_FILE_NAME: &str = "slotwatch.log";

/// Default [directives](Directive) for [`EnvFilter`] which disable high-frequency debug logs
/// from the http and transport crates underneath the provider.
const DEFAULT_ENV_FILTER_DIRECTIVES: [&str; 4] =
    ["hyper::proto::h1=off", "hyper_util=off", "reqwest=warn", "alloy_transport_http=warn"];

/// Manages the collection of layers for a tracing subscriber.
///
/// `Layers` acts as a container for different logging layers such as stdout, file, or journald.
/// Each layer can be configured separately and then combined into a tracing subscriber.
#[derive(Default)]
pub(crate) struct Layers {
    inner: Vec<BoxedLayer<Registry>>,
}

impl std::fmt::Debug for Layers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layers").field("len", &self.inner.len()).finish()
    }
}

impl Layers {
    /// Creates a new `Layers` instance.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Consumes the `Layers` instance, returning the inner vector of layers.
    pub(crate) fn into_inner(self) -> Vec<BoxedLayer<Registry>> {
        self.inner
    }

    /// Adds a journald layer to the layers collection.
    pub(crate) fn journald(&mut self, filter: &str) -> eyre::Result<()> {
        let journald_filter = build_env_filter(None, filter)?;
        let layer = tracing_journald::layer()?.with_filter(journald_filter).boxed();
        self.inner.push(layer);
        Ok(())
    }

    /// Adds a stdout layer with specified formatting and filtering.
    pub(crate) fn stdout(
        &mut self,
        format: LogFormat,
        default_directive: Directive,
        filters: &str,
        color: Option<String>,
    ) -> eyre::Result<()> {
        let filter = build_env_filter(Some(default_directive), filters)?;
        let layer = format.apply(filter, color, None);
        self.inner.push(layer);
        Ok(())
    }

    /// Adds a file logging layer to the layers collection.
    pub(crate) fn file(
        &mut self,
        format: LogFormat,
        filter: &str,
        file_info: FileInfo,
    ) -> eyre::Result<FileWorkerGuard> {
        let (writer, guard) = file_info.create_log_writer()?;
        let file_filter = build_env_filter(None, filter)?;
        let layer = format.apply(file_filter, None, Some(writer));
        self.inner.push(layer);
        Ok(guard)
    }
}

/// Holds configuration information for file logging.
///
/// Contains details about the log file's path, name, size, and rotation strategy.
#[derive(Debug, Clone)]
pub struct FileInfo {
    dir: PathBuf,
    file_name: String,
    max_size_bytes: u64,
    max_files: usize,
}

impl FileInfo {
    /// Creates a new `FileInfo` instance.
    pub fn new(dir: PathBuf, max_size_bytes: u64, max_files: usize) -> Self {
        Self { dir, file_name: SLOTWATCH_LOG_FILE_NAME.to_string(), max_size_bytes, max_files }
    }

    /// The full path of the active log file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Creates the log directory if it doesn't exist.
    fn create_log_dir(&self) -> eyre::Result<&Path> {
        let log_dir: &Path = self.dir.as_ref();
        if !log_dir.exists() {
            std::fs::create_dir_all(log_dir)
                .map_err(|e| eyre::eyre!("could not create log directory {log_dir:?}: {e}"))?;
        }
        Ok(log_dir)
    }

    /// Creates a non-blocking writer for the log file.
    fn create_log_writer(
        &self,
    ) -> eyre::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
        let log_dir = self.create_log_dir()?;
        let appender = RollingFileAppender::new(
            log_dir.join(&self.file_name),
            RollingConditionBasic::new().max_size(self.max_size_bytes),
            self.max_files,
        )?;

        Ok(tracing_appender::non_blocking(appender))
    }
}

/// Builds an environment filter for logging.
///
/// The events are filtered by `default_directive`, unless overridden by `RUST_LOG`, and then
/// by each comma-separated directive in `directives`.
fn build_env_filter(
    default_directive: Option<Directive>,
    directives: &str,
) -> eyre::Result<EnvFilter> {
    let env_filter = if let Some(default_directive) = default_directive {
        EnvFilter::builder().with_default_directive(default_directive).from_env_lossy()
    } else {
        EnvFilter::builder().from_env_lossy()
    };

    DEFAULT_ENV_FILTER_DIRECTIVES
        .into_iter()
        .chain(directives.split(',').filter(|d| !d.is_empty()))
        .try_fold(env_filter, |env_filter, directive| {
            Ok::<_, eyre::Report>(env_filter.add_directive(directive.parse::<Directive>()?))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_env_filter_accepts_directives() {
        let filter = build_env_filter(
            Some("info".parse().expect("valid directive")),
            "slotwatch_check=debug,alloy=warn",
        );
        assert!(filter.is_ok());
    }

    #[test]
    fn test_build_env_filter_rejects_garbage() {
        let filter = build_env_filter(None, "slotwatch_check=notalevel");
        assert!(filter.is_err());
    }

    #[test]
    fn test_file_info_path() {
        let info = FileInfo::new(PathBuf::from("/var/log/slotwatch"), 1024, 3);
        assert_eq!(info.path(), PathBuf::from("/var/log/slotwatch/slotwatch.log"));
    }

    #[test]
    fn test_file_layer_creates_directory() {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let info = FileInfo::new(dir.path().join("logs"), 1024, 1);

        let mut layers = Layers::new();
        let _guard =
            layers.file(LogFormat::Json, "debug", info).expect("failed to create file layer");

        assert!(dir.path().join("logs").exists());
        assert_eq!(layers.into_inner().len(), 1);
    }

    #[test]
    fn test_logfmt_file_layer_writes_to_file() {
        use tracing_subscriber::layer::SubscriberExt;

        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let info = FileInfo::new(dir.path().to_path_buf(), 1024 * 1024, 1);
        let path = info.path();

        let mut layers = Layers::new();
        let guard =
            layers.file(LogFormat::LogFmt, "debug", info).expect("failed to create file layer");

        let subscriber = tracing_subscriber::registry().with(layers.into_inner());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(descriptor = "s1", "slot value changed");
        });

        // flushes the non-blocking writer
        drop(guard);

        let contents = std::fs::read_to_string(&path).expect("unable to read log file");
        assert!(contents.contains("slot value changed"), "{contents:?}");
    }
}
