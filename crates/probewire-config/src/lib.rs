//! Shared configuration for the probewire engine and its tools.
//!
//! Values are layered by `ortho_config`: defaults, then an optional
//! configuration file, then `PROBEWIRE_*` environment variables, then
//! command-line flags. Every field is optional on the wire so the accessors
//! below resolve the effective value.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SUPPRESSED_ERROR_CODE, default_log_filter, default_log_format,
    default_suppressed_error_code,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Layered configuration shared by the engine and the replay tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PROBEWIRE")]
pub struct Config {
    /// Tracing filter directive, for example `probewire=debug`.
    pub log_filter: Option<String>,
    /// Output format for log records.
    pub log_format: Option<LogFormat>,
    /// Logs every raw message exchanged with the backend.
    pub dump_protocol_messages: Option<bool>,
    /// Logs round-trip and processing times for responses and events.
    pub dump_time_stats: Option<bool>,
    /// Backend error code that is delivered to callbacks without being
    /// reported as a protocol error.
    pub suppressed_error_code: Option<i64>,
}

impl Config {
    /// Effective log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Effective log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Whether raw protocol messages should be logged.
    #[must_use]
    pub fn dump_protocol_messages(&self) -> bool {
        self.dump_protocol_messages.unwrap_or(false)
    }

    /// Whether timing instrumentation should be logged.
    #[must_use]
    pub fn dump_time_stats(&self) -> bool {
        self.dump_time_stats.unwrap_or(false)
    }

    /// Effective suppressed backend error code.
    #[must_use]
    pub fn suppressed_error_code(&self) -> i64 {
        self.suppressed_error_code
            .unwrap_or(DEFAULT_SUPPRESSED_ERROR_CODE)
    }
}
