//! Where a configuration value came from.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Layer that supplied a value. Later layers win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConfigSource {
    Default,
    File(PathBuf),
    Environment(String),
    CommandLine,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Environment(var) => write!(f, "env {var}"),
            Self::CommandLine => f.write_str("command line"),
        }
    }
}

/// A value tagged with the layer that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    pub fn default_value(value: T) -> Self {
        Self::new(value, ConfigSource::Default)
    }

    pub fn from_env(value: T, var: impl Into<String>) -> Self {
        Self::new(value, ConfigSource::Environment(var.into()))
    }

    pub fn is_default(&self) -> bool {
        self.source == ConfigSource::Default
    }
}

impl<T: fmt::Display> fmt::Display for Sourced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.value, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_layer() {
        let threshold = Sourced::default_value(20u64);
        assert!(threshold.is_default());
        assert_eq!(threshold.to_string(), "20 (from default)");

        let threshold = Sourced::from_env(5u64, "PATHO_THRESHOLD");
        assert!(!threshold.is_default());
        assert_eq!(threshold.to_string(), "5 (from env PATHO_THRESHOLD)");
    }
}
