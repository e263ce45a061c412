//! Structured logging setup.
//!
//! [`LogConfig::with_stderr`] moves console output off stdout so result
//! output there stays machine readable. An optional log file is written through a non-blocking appender;
//! keep the returned [`LoggingGuards`] alive until exit or buffered lines are
//! lost.

use crate::errors::{PathoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as AppenderBuilder, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as tfmt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `patho_common=debug`.
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    pub stderr: bool,
}

impl LogConfig {
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    #[must_use]
    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
            stderr: false,
        }
    }
}

/// Flush handles for background log writers.
#[derive(Default)]
pub struct LoggingGuards {
    _file: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => tfmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .boxed(),
        LogFormat::Json => tfmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .boxed(),
    }
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| PathoError::Logging(format!("invalid level '{}': {e}", config.level)))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.stderr {
        layers.push(format_layer(config.format, std::io::stderr, true));
    } else {
        layers.push(format_layer(config.format, std::io::stdout, true));
    }

    let mut guards = LoggingGuards::default();
    if let Some(path) = &config.file {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| PathoError::Logging(format!("{} has no file name", path.display())))?;
        let appender = AppenderBuilder::new()
            .rotation(Rotation::NEVER)
            .filename_prefix(name.to_string_lossy())
            .build(dir)
            .map_err(|e| PathoError::Logging(format!("{}: {e}", path.display())))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(format_layer(config.format, writer, false));
        guards._file = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| PathoError::Logging(e.to_string()))?;
    Ok(guards)
}
