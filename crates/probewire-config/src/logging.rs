//! Log record formats selectable through configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// How log records are rendered on stderr.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, EnumIter, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record, event fields flattened.
    #[default]
    Json,
    /// Single-line text records.
    Compact,
    /// Multi-line text records with field breakdowns, for reading replays by
    /// eye.
    Pretty,
}

impl LogFormat {
    /// Whether records are emitted as JSON.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Names accepted by the parser, in declaration order.
    #[must_use]
    pub fn names() -> Vec<String> {
        Self::iter().map(|format| format.to_string()).collect()
    }
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    #[case("Pretty", LogFormat::Pretty)]
    fn parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = text.parse().expect("log format should parse");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    fn rejects_unknown_names() {
        let parsed = "yaml".parse::<LogFormat>();
        assert_eq!(parsed, Err(LogFormatParseError::VariantNotFound));
    }

    #[rstest]
    fn lists_names_and_structure() {
        assert_eq!(LogFormat::names(), vec!["json", "compact", "pretty"]);
        assert!(LogFormat::Json.is_structured());
        assert!(!LogFormat::Pretty.is_structured());
    }
}
