//! Errors raised by the Pathological Event Gate.
//!
//! [`PathoError`] is what library calls return; every variant maps onto a
//! catalog entry ([`ErrorCode`]) with a stable code and remediation steps.

pub mod catalog;

pub use catalog::{ErrorCategory, ErrorCode, ErrorEntry};

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building registries, loading configuration, or
/// reading interval input.
#[derive(Debug, Error)]
pub enum PathoError {
    #[error("matcher '{matcher}' has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        matcher: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("matcher '{0}' is already registered")]
    DuplicateMatcher(String),

    #[error("matcher '{0}' declares no conditions")]
    EmptyMatcher(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("invalid environment: {}", .0.join("; "))]
    Env(Vec<String>),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to read intervals {path}: {source}")]
    IntervalsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse intervals {path}: {source}")]
    IntervalsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PathoError {
    /// Catalog code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPattern { .. } => ErrorCode::MatcherPatternInvalid,
            Self::DuplicateMatcher(_) => ErrorCode::MatcherDuplicateName,
            Self::EmptyMatcher(_) => ErrorCode::MatcherWithoutConditions,
            Self::ConfigRead { .. } => ErrorCode::ConfigReadError,
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::ConfigInvalid(_) => ErrorCode::ConfigValidationError,
            Self::Env(_) => ErrorCode::ConfigEnvError,
            Self::Logging(_) => ErrorCode::ConfigLoggingError,
            Self::IntervalsRead { .. } => ErrorCode::IntervalsReadError,
            Self::IntervalsParse { .. } => ErrorCode::IntervalsParseError,
        }
    }
}

pub type Result<T, E = PathoError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_matcher_maps_to_registry_code() {
        let err = PathoError::DuplicateMatcher("FailedScheduling".to_string());
        assert_eq!(err.code(), ErrorCode::MatcherDuplicateName);
        assert_eq!(err.code().category(), ErrorCategory::Registry);
        assert!(err.to_string().contains("FailedScheduling"));
    }

    #[test]
    fn env_error_joins_messages() {
        let err = PathoError::Env(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "invalid environment: a; b");
    }
}
