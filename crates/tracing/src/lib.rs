//!  Logging setup for firehose binaries.
//!
//!  The entry point is [`FirehoseTracer`], which installs a stdout layer and, optionally, a daily
//!  rotated log file. Each layer picks its own [`LogFormat`] and filter directives.
//!
//!  # Examples
//!
//!  ```
//!  use firehose_tracing::{
//!      tracing::level_filters::LevelFilter, FirehoseTracer, LayerInfo, LogFormat, Tracer,
//!  };
//!
//!  fn main() -> eyre::Result<()> {
//!      let _handle = FirehoseTracer::new()
//!          .with_stdout(LayerInfo::new(
//!              LogFormat::LogFmt,
//!              LevelFilter::INFO.to_string(),
//!              "firehose::start_block=debug".to_string(),
//!              None,
//!          ))
//!          .init()?;
//!
//!      Ok(())
//!  }
//!  ```

#![doc(issue_tracker_base_url = "https://github.com/streamingfast/firehose-core/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export tracing crates
pub use tracing;
pub use tracing_appender;
pub use tracing_subscriber;

pub use formatter::LogFormat;
pub use layers::{FileInfo, FileWorkerGuard};
pub use test_tracer::TestTracer;

mod formatter;
mod layers;
mod test_tracer;

use crate::layers::Layers;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tracer for application logging.
#[derive(Debug, Clone)]
pub struct FirehoseTracer {
    stdout: LayerInfo,
    file: Option<(LayerInfo, FileInfo)>,
}

impl FirehoseTracer {
    ///  Constructs a tracer logging to stdout only, see [`LayerInfo::default`].
    pub fn new() -> Self {
        Self { stdout: LayerInfo::default(), file: None }
    }

    ///  Sets the configuration of the stdout layer.
    pub fn with_stdout(mut self, config: LayerInfo) -> Self {
        self.stdout = config;
        self
    }

    ///  Also writes logs to the file described by `file_info`.
    pub fn with_file(mut self, config: LayerInfo, file_info: FileInfo) -> Self {
        self.file = Some((config, file_info));
        self
    }
}

impl Default for FirehoseTracer {
    fn default() -> Self {
        Self::new()
    }
}

///  Configuration for a logging layer.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    format: LogFormat,
    default_directive: String,
    filters: String,
    color: Option<String>,
}

impl LayerInfo {
    ///  Constructs a new `LayerInfo`.
    ///
    ///  * `default_directive` - Directive applied when `RUST_LOG` is not set, e.g. `info`.
    ///  * `filters` - Comma separated extra directives, e.g. `firehose::live=debug`.
    ///  * `color` - `always`, `auto` or `never`; `None` disables colors.
    pub const fn new(
        format: LogFormat,
        default_directive: String,
        filters: String,
        color: Option<String>,
    ) -> Self {
        Self { format, default_directive, filters, color }
    }
}

impl Default for LayerInfo {
    ///  Terminal format at `INFO` with colors.
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            default_directive: LevelFilter::INFO.to_string(),
            filters: String::new(),
            color: Some("always".to_string()),
        }
    }
}

/// Keeps the logging machinery alive. Dropping it flushes and stops the file writer.
#[derive(Debug, Default)]
pub struct TracerHandle {
    /// Guard for the file layer, if any.
    pub file_guard: Option<FileWorkerGuard>,
}

/// Installs a global tracing subscriber.
pub trait Tracer {
    /// Initialize the logging configuration.
    fn init(self) -> eyre::Result<TracerHandle>;
}

impl Tracer for FirehoseTracer {
    fn init(self) -> eyre::Result<TracerHandle> {
        let mut layers = Layers::new();

        layers.stdout(
            self.stdout.format,
            self.stdout.default_directive.parse()?,
            &self.stdout.filters,
            self.stdout.color,
        )?;

        let file_guard = if let Some((config, file_info)) = self.file {
            Some(layers.file(
                config.format,
                config.default_directive.parse()?,
                &config.filters,
                file_info,
            )?)
        } else {
            None
        };

        // Fails only when a global subscriber is already installed.
        let _ =
            tracing_subscriber::registry().with(layers.into_inner()).try_init().inspect_err(|err| {
                tracing::warn!(%err, "Tracing subscriber could not be initialized");
            });

        Ok(TracerHandle { file_guard })
    }
}

///  Initializes a tracing subscriber for tests.
///
///  The filter is configurable via `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = TestTracer::default().init();
}
