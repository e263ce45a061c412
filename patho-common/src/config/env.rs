//! `PATHO_*` environment variable parsing.
//!
//! Every problem is collected so a misconfigured CI job sees all of them in
//! one run instead of fixing variables one at a time.

use super::source::Sourced;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    #[error("Value out of range for {var}: {value} (valid: {min}..={max})")]
    OutOfRange {
        var: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid log level for {var}: {value}")]
    InvalidLogLevel { var: String, value: String },
}

/// Type-safe reader for `PATHO_` variables.
pub struct EnvParser {
    prefix: &'static str,
    vars: Option<HashMap<String, String>>,
    errors: Vec<EnvError>,
}

impl EnvParser {
    /// Parser over the process environment.
    pub fn new() -> Self {
        Self {
            prefix: "PATHO_",
            vars: None,
            errors: Vec::new(),
        }
    }

    /// Parser over a fixed set of variables instead of the process
    /// environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::new()
        }
    }

    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn lookup(&self, var: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(var).cloned(),
            None => env::var(var).ok(),
        }
    }

    pub fn get_u64_range(&mut self, name: &str, default: u64, min: u64, max: u64) -> Sourced<u64> {
        let var_name = self.var_name(name);
        match self.lookup(&var_name) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(n) if (min..=max).contains(&n) => Sourced::from_env(n, var_name),
                Ok(n) => {
                    self.errors.push(EnvError::OutOfRange {
                        var: var_name.clone(),
                        value: n.to_string(),
                        min: min.to_string(),
                        max: max.to_string(),
                    });
                    Sourced::default_value(default)
                }
                Err(_) => {
                    self.errors.push(EnvError::InvalidValue {
                        var: var_name,
                        expected: "unsigned 64-bit integer".to_string(),
                        value,
                    });
                    Sourced::default_value(default)
                }
            },
            None => Sourced::default_value(default),
        }
    }

    /// Parse a value through its `FromStr` impl; `expected` names the
    /// accepted forms in the error.
    pub fn get_parsed<T: FromStr>(
        &mut self,
        name: &str,
        default: T,
        expected: &str,
    ) -> Sourced<T> {
        let var_name = self.var_name(name);
        match self.lookup(&var_name) {
            Some(value) if value.trim().is_empty() => Sourced::default_value(default),
            Some(value) => match value.parse::<T>() {
                Ok(parsed) => Sourced::from_env(parsed, var_name),
                Err(_) => {
                    self.errors.push(EnvError::InvalidValue {
                        var: var_name,
                        expected: expected.to_string(),
                        value,
                    });
                    Sourced::default_value(default)
                }
            },
            None => Sourced::default_value(default),
        }
    }

    /// Like [`EnvParser::get_parsed`] for values with no default.
    pub fn get_optional_parsed<T: FromStr>(
        &mut self,
        name: &str,
        expected: &str,
    ) -> Sourced<Option<T>> {
        let var_name = self.var_name(name);
        match self.lookup(&var_name) {
            Some(value) if value.trim().is_empty() => Sourced::from_env(None, var_name),
            Some(value) => match value.parse::<T>() {
                Ok(parsed) => Sourced::from_env(Some(parsed), var_name),
                Err(_) => {
                    self.errors.push(EnvError::InvalidValue {
                        var: var_name,
                        expected: expected.to_string(),
                        value,
                    });
                    Sourced::default_value(None)
                }
            },
            None => Sourced::default_value(None),
        }
    }

    pub fn get_optional_string(&mut self, name: &str) -> Sourced<Option<String>> {
        let var_name = self.var_name(name);
        match self.lookup(&var_name) {
            Some(value) if value.is_empty() => Sourced::from_env(None, var_name),
            Some(value) => Sourced::from_env(Some(value), var_name),
            None => Sourced::default_value(None),
        }
    }

    pub fn get_optional_path(&mut self, name: &str) -> Sourced<Option<PathBuf>> {
        let string = self.get_optional_string(name);
        Sourced::new(string.value.map(PathBuf::from), string.source)
    }

    /// Comma-separated list; blank items are dropped.
    pub fn get_string_list(&mut self, name: &str, default: Vec<String>) -> Sourced<Vec<String>> {
        let var_name = self.var_name(name);
        match self.lookup(&var_name) {
            Some(value) => {
                let items = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                Sourced::from_env(items, var_name)
            }
            None => Sourced::default_value(default),
        }
    }

    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let var_name = self.var_name(name);
        match self.lookup(&var_name) {
            Some(value) => {
                let lower = value.trim().to_lowercase();
                match lower.as_str() {
                    "trace" | "debug" | "info" | "warn" | "error" | "off" => {
                        Sourced::from_env(lower, var_name)
                    }
                    _ => {
                        self.errors.push(EnvError::InvalidLogLevel {
                            var: var_name,
                            value,
                        });
                        Sourced::default_value(default.to_string())
                    }
                }
            }
            None => Sourced::default_value(default.to_string()),
        }
    }
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;
    use crate::context::Topology;

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let mut parser = EnvParser::from_vars(Vec::<(String, String)>::new());
        let threshold = parser.get_u64_range("THRESHOLD", 20, 1, u64::MAX);
        assert_eq!(threshold.value, 20);
        assert!(threshold.is_default());
        assert!(!parser.has_errors());
    }

    #[test]
    fn values_carry_their_variable_name() {
        let mut parser = EnvParser::from_vars([("PATHO_THRESHOLD", "30")]);
        let threshold = parser.get_u64_range("THRESHOLD", 20, 1, u64::MAX);
        assert_eq!(threshold.value, 30);
        assert_eq!(
            threshold.source,
            ConfigSource::Environment("PATHO_THRESHOLD".to_string())
        );
    }

    #[test]
    fn every_error_is_collected() {
        let mut parser = EnvParser::from_vars([
            ("PATHO_THRESHOLD", "0"),
            ("PATHO_TOPOLOGY", "quad"),
            ("PATHO_LOG_LEVEL", "loud"),
        ]);
        parser.get_u64_range("THRESHOLD", 20, 1, u64::MAX);
        let topology = parser.get_optional_parsed::<Topology>("TOPOLOGY", "a topology name");
        parser.get_log_level("LOG_LEVEL", "info");

        assert_eq!(topology.value, None);
        let errors = parser.take_errors();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], EnvError::OutOfRange { .. }));
        assert!(errors[1].to_string().contains("PATHO_TOPOLOGY"));
        assert!(matches!(errors[2], EnvError::InvalidLogLevel { .. }));
        assert!(!parser.has_errors());
    }

    #[test]
    fn lists_split_on_commas() {
        let mut parser = EnvParser::from_vars([("PATHO_EXTRA_NAMESPACES", "a, b,,c")]);
        let list = parser.get_string_list("EXTRA_NAMESPACES", Vec::new());
        assert_eq!(list.value, vec!["a", "b", "c"]);
    }
}
