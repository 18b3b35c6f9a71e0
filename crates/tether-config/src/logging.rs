use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Verbosity used when reporting protocol traffic.
///
/// Received commands, sent responses and inspector output are emitted at this
/// level. [`LogLevel::Off`] silences them without touching the global filter.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogLevel {
    /// Protocol traffic is not logged.
    Off,
    /// Logged as errors.
    Error,
    /// Logged as warnings.
    Warn,
    /// Logged as informational events.
    #[default]
    Info,
    /// Logged as debug events.
    Debug,
    /// Logged as trace events.
    Trace,
}

/// Errors encountered while parsing a [`LogLevel`] from text.
pub type LogLevelParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lower("debug", LogLevel::Debug)]
    #[case::upper("WARN", LogLevel::Warn)]
    #[case::mixed("Off", LogLevel::Off)]
    fn parses_log_level_case_insensitively(#[case] input: &str, #[case] expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().expect("parse level"), expected);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn log_level_displays_in_snake_case() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }
}
