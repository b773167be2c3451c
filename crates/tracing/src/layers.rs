use crate::formatter::LogFormat;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Directive, EnvFilter, Layer, Registry};

/// A boxed tracing [Layer].
pub(crate) type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Guard flushing the non-blocking file writer when dropped.
pub type FileWorkerGuard = WorkerGuard;

/// Location and naming of the log file.
#[derive(Debug, Clone)]
pub struct FileInfo {
    dir: PathBuf,
    file_name: String,
}

impl FileInfo {
    /// Creates a new [`FileInfo`] writing `file_name` inside `dir`, rotated daily.
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self { dir: dir.into(), file_name: file_name.into() }
    }
}

/// Collects the layers installed on the global subscriber.
pub(crate) struct Layers {
    inner: Vec<BoxedLayer<Registry>>,
}

impl Layers {
    pub(crate) const fn new() -> Self {
        Self { inner: vec![] }
    }

    pub(crate) fn into_inner(self) -> Vec<BoxedLayer<Registry>> {
        self.inner
    }

    pub(crate) fn stdout(
        &mut self,
        format: LogFormat,
        default_directive: Directive,
        filters: &str,
        color: Option<String>,
    ) -> eyre::Result<()> {
        let filter = build_env_filter(Some(default_directive), filters)?;
        self.inner.push(format.apply(filter, color, None));
        Ok(())
    }

    pub(crate) fn file(
        &mut self,
        format: LogFormat,
        default_directive: Directive,
        filters: &str,
        file_info: FileInfo,
    ) -> eyre::Result<FileWorkerGuard> {
        std::fs::create_dir_all(&file_info.dir)?;
        let appender = tracing_appender::rolling::daily(&file_info.dir, &file_info.file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let filter = build_env_filter(Some(default_directive), filters)?;
        self.inner.push(format.apply(filter, None, Some(writer)));
        Ok(guard)
    }
}

/// Builds an [`EnvFilter`] from `RUST_LOG`, an optional default directive and a comma separated
/// list of extra directives.
pub(crate) fn build_env_filter(
    default_directive: Option<Directive>,
    directives: &str,
) -> eyre::Result<EnvFilter> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_directive.unwrap_or_else(|| LevelFilter::INFO.into()))
        .from_env_lossy();

    directives
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .try_fold(env_filter, |env_filter, directive| {
            Ok(env_filter.add_directive(directive.parse()?))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tracing_subscriber::layer::SubscriberExt;

    /// Writes one event per level through a file layer and returns what reached the log file.
    fn write_file_logs(dir: &Path, format: LogFormat, default_directive: LevelFilter) -> String {
        let mut layers = Layers::new();
        let guard = layers
            .file(format, default_directive.into(), "", FileInfo::new(dir, "firehose.log"))
            .unwrap();

        let subscriber = tracing_subscriber::registry().with(layers.into_inner());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "firehose::app", lib = 250, "Resolved live start block");
            tracing::debug!(target: "firehose::app", "Polling tracker");
        });
        // flushes the non-blocking writer
        drop(guard);

        let mut logs = String::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            logs.push_str(&std::fs::read_to_string(entry.unwrap().path()).unwrap());
        }
        logs
    }

    #[test]
    fn file_layer_writes_every_format() {
        for format in [LogFormat::Json, LogFormat::LogFmt, LogFormat::Terminal] {
            let dir = tempfile::tempdir().unwrap();
            let logs = write_file_logs(&dir.path().join("logs"), format, LevelFilter::INFO);
            assert!(logs.contains("Resolved live start block"), "{format}: {logs}");
            assert!(logs.contains("250"), "{format}: {logs}");
            assert!(!logs.contains("Polling tracker"), "{format}: {logs}");
        }
    }

    #[test]
    fn file_layer_honors_default_directive() {
        let dir = tempfile::tempdir().unwrap();
        let logs = write_file_logs(dir.path(), LogFormat::LogFmt, LevelFilter::DEBUG);
        assert!(logs.contains("Resolved live start block"), "{logs}");
        assert!(logs.contains("Polling tracker"), "{logs}");
    }

    #[test]
    fn env_filter_accepts_directive_list() {
        let filter = build_env_filter(None, "firehose::app=debug, firehose::live=trace,").unwrap();
        assert!(filter.to_string().contains("firehose::live=trace"));
    }

    #[test]
    fn env_filter_rejects_garbage() {
        assert!(build_env_filter(None, "firehose::app=notalevel").is_err());
    }
}
