//! Built-in values used when no configuration layer sets a field.

use crate::logging::LogFormat;

/// Default log filter expression used by the tools.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Backend error code treated as an expected, non-fatal failure.
///
/// Responses carrying this code still reach their callback but are not
/// reported on the diagnostic channel.
pub const DEFAULT_SUPPRESSED_ERROR_CODE: i64 = -32000;

/// Default log filter expression used by the tools.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the tools.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default code for backend errors that should not be reported globally.
#[must_use]
pub const fn default_suppressed_error_code() -> i64 {
    DEFAULT_SUPPRESSED_ERROR_CODE
}
