//! Logging configuration and initialization
//!
//! One place to set up `tracing` for every CAPI binary:
//!
//! - console, file, or both outputs
//! - text or JSON formatting
//! - daily rotating log files
//! - environment overrides
//!
//! Library code logs with the `tracing` macros and structured fields, e.g.
//! `warn!(row = 12, reason = %reason, "Record rejected")`. Never `println!`.
//!
//! # Example
//!
//! ```no_run
//! use capi_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!
//!     info!("Sync started");
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Minimum severity that reaches any output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(anyhow::anyhow!("unknown log level '{}'", other)),
        }
    }
}

/// Where events are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl LogOutput {
    fn includes_console(&self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn includes_file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl std::str::FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            other => Err(anyhow::anyhow!("unknown log output '{}'", other)),
        }
    }
}

/// Line format for every output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("unknown log format '{}'", other)),
        }
    }
}

// ============================================================================
// Environment Keys
// ============================================================================

pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";
pub const LOG_OUTPUT_KEY: &str = "LOG_OUTPUT";
pub const LOG_FORMAT_KEY: &str = "LOG_FORMAT";
pub const LOG_DIR_KEY: &str = "LOG_DIR";
pub const LOG_FILE_PREFIX_KEY: &str = "LOG_FILE_PREFIX";
pub const LOG_FILTER_KEY: &str = "LOG_FILTER";
pub const LOG_INCLUDE_LOCATION_KEY: &str = "LOG_INCLUDE_LOCATION";
pub const LOG_INCLUDE_TARGETS_KEY: &str = "LOG_INCLUDE_TARGETS";

/// Subscriber settings for a CAPI binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,

    pub output: LogOutput,

    pub format: LogFormat,

    /// Rolling files are created here when `output` writes to a file
    pub log_dir: PathBuf,

    /// File name stem; the appender adds the date
    pub log_file_prefix: String,

    /// Extra `EnvFilter` directives, comma separated
    pub filter_directives: Option<String>,

    /// Emit source file and line with every event
    pub include_location: bool,

    /// Emit the module path with every event
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "capi".to_string(),
            filter_directives: None,
            include_location: false,
            include_targets: true,
        }
    }
}

impl LogConfig {
    /// Defaults with the `LOG_*` environment variables applied
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Apply the `LOG_*` environment variables on top of this configuration
    pub fn merge_env(self) -> Result<Self> {
        self.merge_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides resolved through `lookup`
    ///
    /// Unset keys leave the current value alone. A value that does not parse
    /// is an error naming the key.
    pub fn merge_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(LOG_LEVEL_KEY) {
            self.level = raw
                .parse::<LogLevel>()
                .with_context(|| format!("{} is invalid", LOG_LEVEL_KEY))?;
        }
        if let Some(raw) = lookup(LOG_OUTPUT_KEY) {
            self.output = raw
                .parse::<LogOutput>()
                .with_context(|| format!("{} is invalid", LOG_OUTPUT_KEY))?;
        }
        if let Some(raw) = lookup(LOG_FORMAT_KEY) {
            self.format = raw
                .parse::<LogFormat>()
                .with_context(|| format!("{} is invalid", LOG_FORMAT_KEY))?;
        }
        if let Some(raw) = lookup(LOG_DIR_KEY) {
            self.log_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(LOG_FILE_PREFIX_KEY) {
            self.log_file_prefix = raw;
        }
        if let Some(raw) = lookup(LOG_FILTER_KEY) {
            self.filter_directives = Some(raw);
        }
        if let Some(raw) = lookup(LOG_INCLUDE_LOCATION_KEY) {
            self.include_location = parse_flag(LOG_INCLUDE_LOCATION_KEY, &raw)?;
        }
        if let Some(raw) = lookup(LOG_INCLUDE_TARGETS_KEY) {
            self.include_targets = parse_flag(LOG_INCLUDE_TARGETS_KEY, &raw)?;
        }

        Ok(self)
    }

    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("{} must be true or false, got '{}'", key, raw)),
    }
}

/// Fluent construction of a [`LogConfig`], starting from the defaults
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn filter_directives(mut self, filter: impl Into<String>) -> Self {
        self.config.filter_directives = Some(filter.into());
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

/// Initialize the global tracing subscriber
///
/// Call once at startup. When file output is enabled the returned guard
/// flushes the background writer on drop, so keep it alive in `main`.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',').filter(|d| !d.trim().is_empty()) {
            filter = filter.add_directive(
                directive
                    .trim()
                    .parse()
                    .context("Failed to parse filter directive")?,
            );
        }
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.output.includes_console() {
        layers.push(fmt_layer(config, std::io::stdout, true));
    }

    if config.output.includes_file() {
        std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;
        let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt_layer(config, writer, false));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(config.include_targets)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}
