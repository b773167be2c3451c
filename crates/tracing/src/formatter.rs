use crate::layers::BoxedLayer;
use clap::ValueEnum;
use std::{fmt, fmt::Display};
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output format of a logging layer.
#[derive(Debug, Copy, Clone, ValueEnum, Eq, PartialEq)]
pub enum LogFormat {
    /// One JSON object per record, for log collectors.
    Json,

    /// `key=value` pairs.
    LogFmt,

    /// Human readable output.
    Terminal,
}

impl LogFormat {
    /// Builds a layer emitting this format.
    ///
    /// `color` enables ANSI colors unless it is `never`, `RUST_LOG_STYLE=never` overrides it.
    /// Targets are printed when `RUST_LOG_TARGET` is set to anything but `0`, or when the filter
    /// lets anything more verbose than `INFO` through.
    pub fn apply(
        &self,
        filter: EnvFilter,
        color: Option<String>,
        file_writer: Option<NonBlocking>,
    ) -> BoxedLayer<Registry> {
        let ansi = file_writer.is_none() &&
            color.is_some_and(|color| {
                std::env::var("RUST_LOG_STYLE")
                    .map(|val| val != "never")
                    .unwrap_or(color != "never")
            });
        let target = std::env::var("RUST_LOG_TARGET").map(|val| val != "0").unwrap_or_else(|_| {
            filter.max_level_hint().is_none_or(|max_level| max_level > tracing::Level::INFO)
        });

        match self {
            Self::Json => {
                let layer =
                    tracing_subscriber::fmt::layer().json().with_ansi(false).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
            Self::LogFmt => match file_writer {
                Some(writer) => tracing_logfmt::builder()
                    .layer()
                    .with_writer(writer)
                    .with_filter(filter)
                    .boxed(),
                None => tracing_logfmt::layer().with_filter(filter).boxed(),
            },
            Self::Terminal => {
                let layer = tracing_subscriber::fmt::layer().with_ansi(ansi).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::LogFmt => write!(f, "logfmt"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}
