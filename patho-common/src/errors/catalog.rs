//! Error Catalog for the Pathological Event Gate
//!
//! Every failure the engine can report carries a stable code so CI logs can
//! be searched and correlated across runs. Each entry includes:
//! - A unique code (PATHO-E001 through PATHO-E399)
//! - A human-readable message
//! - Remediation steps
//!
//! # Error Code Ranges
//!
//! | Range      | Category    | Description                              |
//! |------------|-------------|------------------------------------------|
//! | E001-E099  | Config      | Configuration file and environment       |
//! | E100-E199  | Registry    | Matcher construction and registration    |
//! | E200-E299  | Evaluation  | Per-event evaluation errors              |
//! | E300-E399  | Input       | Interval input loading                   |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code enumeration covering every reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Config Errors (E001-E099)
    // =========================================================================
    /// Configuration file could not be read
    ConfigReadError,
    /// Configuration file contains invalid TOML
    ConfigParseError,
    /// Configuration contains invalid values
    ConfigValidationError,
    /// Environment variable has invalid value
    ConfigEnvError,
    /// Logging could not be initialized
    ConfigLoggingError,

    // =========================================================================
    // Registry Errors (E100-E199)
    // =========================================================================
    /// A matcher pattern is not a valid regular expression
    MatcherPatternInvalid,
    /// Two matchers were registered under one name
    MatcherDuplicateName,
    /// A matcher declares no conditions and would allow everything
    MatcherWithoutConditions,

    // =========================================================================
    // Evaluation Errors (E200-E299)
    // =========================================================================
    /// The repetition count annotation is not an integer
    EvaluationMalformedCount,

    // =========================================================================
    // Input Errors (E300-E399)
    // =========================================================================
    /// Interval file could not be read
    IntervalsReadError,
    /// Interval file is not a JSON array of event records
    IntervalsParseError,
}

impl ErrorCode {
    /// Returns the numeric part of the error code.
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::ConfigReadError => 1,
            Self::ConfigParseError => 2,
            Self::ConfigValidationError => 3,
            Self::ConfigEnvError => 4,
            Self::ConfigLoggingError => 5,

            Self::MatcherPatternInvalid => 100,
            Self::MatcherDuplicateName => 101,
            Self::MatcherWithoutConditions => 102,

            Self::EvaluationMalformedCount => 200,

            Self::IntervalsReadError => 300,
            Self::IntervalsParseError => 301,
        }
    }

    /// Returns the formatted error code string (e.g., "PATHO-E001").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("PATHO-E{:03}", self.code_number())
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Config,
            100..=199 => ErrorCategory::Registry,
            200..=299 => ErrorCategory::Evaluation,
            _ => ErrorCategory::Input,
        }
    }

    /// Returns the full error entry with all metadata.
    #[must_use]
    pub fn entry(&self) -> ErrorEntry {
        ErrorEntry {
            code: self.code_string(),
            category: self.category(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ConfigReadError => "Failed to read configuration file",
            Self::ConfigParseError => "Configuration file contains invalid TOML syntax",
            Self::ConfigValidationError => "Configuration contains invalid values",
            Self::ConfigEnvError => "Environment variable has invalid value",
            Self::ConfigLoggingError => "Failed to initialize logging",
            Self::MatcherPatternInvalid => "Matcher pattern is not a valid regular expression",
            Self::MatcherDuplicateName => "Matcher name is already registered",
            Self::MatcherWithoutConditions => "Matcher declares no conditions",
            Self::EvaluationMalformedCount => "Event count annotation is not an integer",
            Self::IntervalsReadError => "Failed to read interval file",
            Self::IntervalsParseError => "Interval file is not a JSON array of event records",
        }
    }

    /// Returns remediation steps.
    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::ConfigReadError => &[
                "Check the path passed with --config or PATHO_CONFIG",
                "Check file permissions on the configuration file",
            ],
            Self::ConfigParseError => &[
                "Validate the file with a TOML linter",
                "Compare against the [evaluation] and [logging] sections in the docs",
            ],
            Self::ConfigValidationError => &[
                "The duplicate threshold must be at least 1",
                "Topology, platform and job kind must be known names",
            ],
            Self::ConfigEnvError => &[
                "Unset or correct the PATHO_* variable named in the message",
            ],
            Self::ConfigLoggingError => &[
                "Check PATHO_LOG_LEVEL is a valid filter directive",
                "Check the directory of PATHO_LOG_FILE exists and is writable",
            ],
            Self::MatcherPatternInvalid => &[
                "Fix the regular expression in the matcher definition",
                "Escape literal dots, parentheses and brackets",
            ],
            Self::MatcherDuplicateName => &[
                "Give each matcher a unique name; names are reported in test output",
            ],
            Self::MatcherWithoutConditions => &[
                "Add at least a reason or message condition to the matcher",
            ],
            Self::EvaluationMalformedCount => &[
                "Check the monitor that recorded the interval",
                "The count annotation must be a non-negative integer",
            ],
            Self::IntervalsReadError => &["Check that the interval file exists and is readable"],
            Self::IntervalsParseError => &[
                "The file must contain a JSON array of event records",
                "Each record needs at least 'from' and 'to' RFC 3339 timestamps",
            ],
        }
    }

    /// Returns all error codes for iteration.
    #[must_use]
    pub fn all() -> &'static [ErrorCode] {
        &[
            Self::ConfigReadError,
            Self::ConfigParseError,
            Self::ConfigValidationError,
            Self::ConfigEnvError,
            Self::ConfigLoggingError,
            Self::MatcherPatternInvalid,
            Self::MatcherDuplicateName,
            Self::MatcherWithoutConditions,
            Self::EvaluationMalformedCount,
            Self::IntervalsReadError,
            Self::IntervalsParseError,
        ]
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.message())
    }
}

/// Error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Configuration file and environment errors (E001-E099)
    Config,
    /// Matcher construction errors (E100-E199)
    Registry,
    /// Per-event evaluation errors (E200-E299)
    Evaluation,
    /// Interval input errors (E300-E399)
    Input,
}

impl ErrorCategory {
    /// Returns a human-readable name for the category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Config => "Configuration",
            Self::Registry => "Registry",
            Self::Evaluation => "Evaluation",
            Self::Input => "Input",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete error entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Error code string (e.g., "PATHO-E001")
    pub code: String,
    /// Error category
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Steps to remediate the error
    pub remediation: Vec<String>,
}

impl ErrorEntry {
    /// Formats the error for display with full remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] {}\n", self.code, self.message);

        if !self.remediation.is_empty() {
            output.push_str("\nRemediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        output
    }

    /// Formats the error as a single line.
    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numbers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::all() {
            let num = code.code_number();
            assert!(
                seen.insert(num),
                "Duplicate error code number: {} for {:?}",
                num,
                code
            );
        }
    }

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigReadError.code_string(), "PATHO-E001");
        assert_eq!(ErrorCode::MatcherPatternInvalid.code_string(), "PATHO-E100");
        assert_eq!(
            ErrorCode::EvaluationMalformedCount.code_string(),
            "PATHO-E200"
        );
        assert_eq!(ErrorCode::IntervalsParseError.code_string(), "PATHO-E301");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ErrorCode::ConfigEnvError.category(), ErrorCategory::Config);
        assert_eq!(
            ErrorCode::MatcherDuplicateName.category(),
            ErrorCategory::Registry
        );
        assert_eq!(
            ErrorCode::EvaluationMalformedCount.category(),
            ErrorCategory::Evaluation
        );
        assert_eq!(
            ErrorCode::IntervalsReadError.category(),
            ErrorCategory::Input
        );
    }

    #[test]
    fn test_every_code_has_remediation() {
        for code in ErrorCode::all() {
            assert!(
                !code.remediation().is_empty(),
                "{:?} has no remediation steps",
                code
            );
        }
    }

    #[test]
    fn test_format_full_lists_steps() {
        let full = ErrorCode::MatcherPatternInvalid.entry().format_full();
        assert!(full.starts_with("[PATHO-E100]"));
        assert!(full.contains("  1. Fix the regular expression"));
    }
}
