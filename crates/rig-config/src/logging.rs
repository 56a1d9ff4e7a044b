//! Logging configuration.

use rig_core::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty-printed format (default).
    #[default]
    Pretty,

    /// JSON format.
    Json,

    /// Compact format.
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(Error::configuration(format!(
                "invalid log format: '{s}'. expected 'pretty', 'json', or 'compact'"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (a `tracing` `EnvFilter` directive, e.g. `"info"` or `"rig_builder=debug"`).
    pub level: String,

    /// Log format.
    pub format: LogFormat,

    /// Log file path. When unset, logs go to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Include file and line numbers in logs.
    pub include_file_line: bool,

    /// Include target (module path) in logs.
    pub include_target: bool,

    /// Include thread IDs in logs.
    pub include_thread_id: bool,
}

impl LogConfig {
    /// Build a [`LogConfig`] from CLI-style overrides layered onto a rig file's own defaults.
    #[must_use]
    pub fn from_overrides(
        level: Option<&str>,
        format: Option<&str>,
        file: Option<PathBuf>,
        file_config: Option<&LogConfig>,
    ) -> Self {
        Self {
            level: level
                .map(str::to_string)
                .or_else(|| file_config.map(|c| c.level.clone()))
                .unwrap_or_else(|| "info".to_string()),
            format: format
                .and_then(|f| f.parse().ok())
                .or_else(|| file_config.map(|c| c.format))
                .unwrap_or_default(),
            file: file.or_else(|| file_config.and_then(|c| c.file.clone())),
            include_file_line: file_config.is_some_and(|c| c.include_file_line),
            include_target: file_config.map_or(true, |c| c.include_target),
            include_thread_id: file_config.is_some_and(|c| c.include_thread_id),
        }
    }

    /// Initialize the global `tracing` subscriber from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the level directive is invalid or a subscriber is already installed.
    pub fn init(&self) -> rig_core::Result<()> {
        let filter = EnvFilter::try_new(&self.level)
            .map_err(|e| Error::configuration(format!("invalid log level '{}': {e}", self.level)))?;

        let subscriber = tracing_subscriber::registry().with(filter);

        match self.format {
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .with_file(self.include_file_line)
                    .with_line_number(self.include_file_line)
                    .with_target(self.include_target)
                    .with_thread_ids(self.include_thread_id)
                    .pretty();
                subscriber
                    .with(layer)
                    .try_init()
                    .map_err(|e| Error::configuration(format!("failed to initialize logging: {e}")))?;
            }
            LogFormat::Json => {
                let layer = fmt::layer()
                    .with_file(self.include_file_line)
                    .with_line_number(self.include_file_line)
                    .with_target(self.include_target)
                    .with_thread_ids(self.include_thread_id)
                    .json();
                subscriber
                    .with(layer)
                    .try_init()
                    .map_err(|e| Error::configuration(format!("failed to initialize logging: {e}")))?;
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .with_file(self.include_file_line)
                    .with_line_number(self.include_file_line)
                    .with_target(self.include_target)
                    .with_thread_ids(self.include_thread_id)
                    .compact();
                subscriber
                    .with(layer)
                    .try_init()
                    .map_err(|e| Error::configuration(format!("failed to initialize logging: {e}")))?;
            }
        }

        Ok(())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
            include_file_line: false,
            include_target: true,
            include_thread_id: false,
        }
    }
}
