//! Configuration of the firehose app.

use firehose_primitives::{DEFAULT_BUNDLE_SIZE, DEFAULT_FIRST_STREAMABLE_BLOCK};
use serde::{Deserialize, Serialize};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::Path,
    time::Duration,
};

/// Default port of the gRPC server.
pub const DEFAULT_GRPC_PORT: u16 = 13042;

/// Default interval between two failed start block tracker polls.
pub const DEFAULT_START_BLOCK_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of consecutive tracker failures between two warnings.
pub const DEFAULT_START_BLOCK_WARN_EVERY: usize = 5;

/// Errors reported by [`Config::validate`] and [`Config::from_path`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No block store was configured.
    #[error("at least one block store url is required")]
    MissingBlockStore,
    /// A configured block store url is blank.
    #[error("block store url at index {0} is empty")]
    EmptyBlockStoreUrl(usize),
    /// Bundle size is zero.
    #[error("bundle size must be greater than zero")]
    ZeroBundleSize,
    /// Warning cadence is zero.
    #[error("start block warning cadence must be greater than zero")]
    ZeroWarnEvery,
    /// The irreversible blocks index store has unusable bundle sizes.
    #[error("irreversible blocks index store requires non-zero bundle sizes, got {0:?}")]
    InvalidIrreversibleBundleSizes(Vec<u64>),
    /// The live block stream address is blank.
    #[error("block stream address is empty, omit it to disable live streaming")]
    EmptyBlockStreamAddr,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Firehose app configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Block stores, the first one is primary and the others are fallbacks.
    pub block_store_urls: Vec<String>,
    /// Store holding the irreversible blocks indexes.
    pub irreversible_blocks_index_store_url: Option<String>,
    /// Bundle sizes of the irreversible blocks indexes, largest first.
    pub irreversible_blocks_bundle_sizes: Vec<u64>,
    /// gRPC endpoint serving real-time blocks. Live streaming is disabled when unset.
    pub block_stream_addr: Option<String>,
    /// Address the gRPC server listens on.
    pub grpc_listen_addr: SocketAddr,
    /// How long gRPC connections may drain before the server is forced down.
    #[serde(with = "humantime_serde")]
    pub grpc_shutdown_grace_period: Duration,
    /// How far behind the chain head the live source may lag and still count as real-time.
    ///
    /// Only used by the hybrid source.
    #[serde(with = "humantime_serde")]
    pub realtime_tolerance: Duration,
    /// Number of blocks per bundle in the historical block store.
    pub bundle_size: u64,
    /// First block the protocol can stream.
    pub first_streamable_block: u64,
    /// Wait between two failed tracker polls while resolving the live start block.
    #[serde(with = "humantime_serde")]
    pub start_block_retry_interval: Duration,
    /// Log a warning every that many consecutive tracker failures.
    pub start_block_warn_every: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_store_urls: Vec::new(),
            irreversible_blocks_index_store_url: None,
            irreversible_blocks_bundle_sizes: vec![100_000, 10_000, 1_000, 100],
            block_stream_addr: None,
            grpc_listen_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                DEFAULT_GRPC_PORT,
            )),
            grpc_shutdown_grace_period: Duration::from_secs(1),
            realtime_tolerance: Duration::from_secs(60),
            bundle_size: DEFAULT_BUNDLE_SIZE,
            first_streamable_block: DEFAULT_FIRST_STREAMABLE_BLOCK,
            start_block_retry_interval: DEFAULT_START_BLOCK_RETRY_INTERVAL,
            start_block_warn_every: DEFAULT_START_BLOCK_WARN_EVERY,
        }
    }
}

impl Config {
    /// Loads a TOML config file. Missing keys take their default value.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Returns `true` if live streaming is configured.
    pub fn live_enabled(&self) -> bool {
        self.block_stream_addr.is_some()
    }

    /// Checks the config for values the app cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_store_urls.is_empty() {
            return Err(ConfigError::MissingBlockStore)
        }
        if let Some(idx) = self.block_store_urls.iter().position(|url| url.trim().is_empty()) {
            return Err(ConfigError::EmptyBlockStoreUrl(idx))
        }
        if self.bundle_size == 0 {
            return Err(ConfigError::ZeroBundleSize)
        }
        if self.start_block_warn_every == 0 {
            return Err(ConfigError::ZeroWarnEvery)
        }
        if self.irreversible_blocks_index_store_url.is_some() &&
            (self.irreversible_blocks_bundle_sizes.is_empty() ||
                self.irreversible_blocks_bundle_sizes.contains(&0))
        {
            return Err(ConfigError::InvalidIrreversibleBundleSizes(
                self.irreversible_blocks_bundle_sizes.clone(),
            ))
        }
        if self.block_stream_addr.as_deref().is_some_and(|addr| addr.trim().is_empty()) {
            return Err(ConfigError::EmptyBlockStreamAddr)
        }
        Ok(())
    }
}
