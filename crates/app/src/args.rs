//! clap [Args](clap::Args) for the firehose app and its logging.

use crate::config::{Config, ConfigError};
use clap::Args;
use firehose_tracing::{
    tracing::level_filters::LevelFilter, FileInfo, FirehoseTracer, LayerInfo, LogFormat,
};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Parameters of the firehose app.
///
/// Every flag is optional and overrides the value from `--firehose.config` (or the default).
#[derive(Debug, Clone, Default, Args, PartialEq, Eq)]
#[command(next_help_heading = "Firehose")]
pub struct FirehoseArgs {
    /// TOML config file the flags are layered on.
    #[arg(long = "firehose.config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Block store urls, primary first.
    #[arg(long = "firehose.block-store-urls", value_delimiter = ',')]
    pub block_store_urls: Vec<String>,

    /// Store of irreversible blocks indexes.
    #[arg(long = "firehose.irreversible-blocks-index-store-url")]
    pub irreversible_blocks_index_store_url: Option<String>,

    /// Bundle sizes of the irreversible blocks indexes.
    #[arg(long = "firehose.irreversible-blocks-bundle-sizes", value_delimiter = ',')]
    pub irreversible_blocks_bundle_sizes: Vec<u64>,

    /// gRPC endpoint of the live block stream. Live streaming is disabled when unset.
    #[arg(long = "firehose.block-stream-addr")]
    pub block_stream_addr: Option<String>,

    /// Address the gRPC server listens on.
    #[arg(long = "firehose.grpc-listen-addr")]
    pub grpc_listen_addr: Option<SocketAddr>,

    /// Time given to gRPC connections to drain on shutdown.
    #[arg(long = "firehose.grpc-shutdown-grace-period", value_parser = humantime::parse_duration)]
    pub grpc_shutdown_grace_period: Option<Duration>,

    /// Lag behind the chain head still considered real-time.
    #[arg(long = "firehose.realtime-tolerance", value_parser = humantime::parse_duration)]
    pub realtime_tolerance: Option<Duration>,

    /// Blocks per bundle in the block store.
    #[arg(long = "firehose.bundle-size")]
    pub bundle_size: Option<u64>,

    /// First block the protocol can stream.
    #[arg(long = "firehose.first-streamable-block")]
    pub first_streamable_block: Option<u64>,
}

impl FirehoseArgs {
    /// Builds the [`Config`], reading `--firehose.config` first when given.
    pub fn config(&self) -> Result<Config, ConfigError> {
        let base = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        Ok(self.apply(base))
    }

    /// Overrides the values of `config` with the flags that were set.
    pub fn apply(&self, mut config: Config) -> Config {
        if !self.block_store_urls.is_empty() {
            config.block_store_urls = self.block_store_urls.clone();
        }
        if let Some(url) = &self.irreversible_blocks_index_store_url {
            config.irreversible_blocks_index_store_url = Some(url.clone());
        }
        if !self.irreversible_blocks_bundle_sizes.is_empty() {
            config.irreversible_blocks_bundle_sizes = self.irreversible_blocks_bundle_sizes.clone();
        }
        if let Some(addr) = &self.block_stream_addr {
            config.block_stream_addr = Some(addr.clone());
        }
        if let Some(addr) = self.grpc_listen_addr {
            config.grpc_listen_addr = addr;
        }
        if let Some(period) = self.grpc_shutdown_grace_period {
            config.grpc_shutdown_grace_period = period;
        }
        if let Some(tolerance) = self.realtime_tolerance {
            config.realtime_tolerance = tolerance;
        }
        if let Some(size) = self.bundle_size {
            config.bundle_size = size;
        }
        if let Some(block) = self.first_streamable_block {
            config.first_streamable_block = block;
        }
        config
    }
}

/// Logging parameters.
#[derive(Debug, Clone, Args, PartialEq, Eq)]
#[command(next_help_heading = "Logging")]
pub struct LogArgs {
    /// Format of the stdout logs.
    #[arg(long = "log.stdout.format", value_enum, default_value_t = LogFormat::Terminal)]
    pub log_stdout_format: LogFormat,

    /// Extra filter directives for stdout, e.g. `firehose::start_block=debug`.
    #[arg(long = "log.stdout.filter", default_value = "")]
    pub log_stdout_filter: String,

    /// Directory of the log file. File logging is disabled when unset.
    #[arg(long = "log.file.directory", value_name = "PATH")]
    pub log_file_directory: Option<PathBuf>,

    /// Format of the file logs.
    #[arg(long = "log.file.format", value_enum, default_value_t = LogFormat::Json)]
    pub log_file_format: LogFormat,

    /// Filter directives for the file logs.
    #[arg(long = "log.file.filter", default_value = "debug")]
    pub log_file_filter: String,

    /// Disables colors on stdout.
    #[arg(long = "color.never")]
    pub no_color: bool,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            log_stdout_format: LogFormat::Terminal,
            log_stdout_filter: String::new(),
            log_file_directory: None,
            log_file_format: LogFormat::Json,
            log_file_filter: "debug".to_string(),
            no_color: false,
        }
    }
}

impl LogArgs {
    /// Builds the tracer described by these arguments.
    pub fn tracer(&self) -> FirehoseTracer {
        let color = (!self.no_color).then(|| "always".to_string());
        let mut tracer = FirehoseTracer::new().with_stdout(LayerInfo::new(
            self.log_stdout_format,
            LevelFilter::INFO.to_string(),
            self.log_stdout_filter.clone(),
            color,
        ));

        if let Some(dir) = &self.log_file_directory {
            tracer = tracer.with_file(
                LayerInfo::new(
                    self.log_file_format,
                    LevelFilter::DEBUG.to_string(),
                    self.log_file_filter.clone(),
                    None,
                ),
                FileInfo::new(dir, "firehose.log"),
            );
        }
        tracer
    }
}
