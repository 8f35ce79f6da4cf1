//! Tracing/logging initialization.

use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Compact human-readable lines.
    Text,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log format {0:?} (expected \"json\" or \"text\")")]
pub struct ParseLogFormatError(String);

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(ParseLogFormatError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub const FORMAT_ENV: &'static str = "FACTLINE_LOG_FORMAT";

    /// Read `FACTLINE_LOG_FORMAT`; unknown values keep the default format.
    pub fn from_env() -> Self {
        Self::from_format_var(std::env::var(Self::FORMAT_ENV).ok().as_deref())
    }

    fn from_format_var(raw: Option<&str>) -> Self {
        let format = match raw.map(LogFormat::from_str) {
            Some(Ok(format)) => format,
            // No subscriber is installed yet, so the problem can only go to stderr.
            Some(Err(err)) => {
                eprintln!("{}: {err}; using json", Self::FORMAT_ENV);
                LogFormat::Json
            }
            None => LogFormat::Json,
        };
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// `RUST_LOG` overrides `default_filter`. Safe to call multiple times
/// (subsequent calls are no-ops).
pub fn init_with(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    };
}
