//! Configuration for evaluation runs.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `PATHO_*` environment variables, then command-line flags applied by the
//! caller. [`LoadedConfig`] remembers which layer set each key.

pub mod env;
pub mod source;

pub use env::{EnvError, EnvParser};
pub use source::{ConfigSource, Sourced};

use crate::context::{JobKind, Platform, Topology};
use crate::errors::{PathoError, Result};
use crate::evaluator::DUPLICATE_EVENT_THRESHOLD;
use crate::logging::{LogConfig, LogFormat};
use crate::namespaces::KnownNamespaces;
use crate::registry::RegistryContext;
use crate::suppression::DEFAULT_MASK_TOLERANCE_SECS;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Longest mask tolerance accepted, one day.
pub const MAX_MASK_TOLERANCE_SECS: u64 = 86_400;

pub const DEFAULT_TEST_NAME: &str = "events should not repeat";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathoConfig {
    pub evaluation: EvaluationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    pub threshold: u64,
    pub job: JobKind,
    pub topology: Option<Topology>,
    pub platform: Option<Platform>,
    pub mask_tolerance_secs: u64,
    pub test_name: String,
    /// Namespaces reported separately in addition to the platform catalog.
    pub extra_namespaces: Vec<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold: DUPLICATE_EVENT_THRESHOLD,
            job: JobKind::default(),
            topology: None,
            platform: None,
            mask_tolerance_secs: DEFAULT_MASK_TOLERANCE_SECS.unsigned_abs(),
            test_name: DEFAULT_TEST_NAME.to_string(),
            extra_namespaces: Vec::new(),
        }
    }
}

impl EvaluationConfig {
    pub fn mask_tolerance(&self) -> Duration {
        let secs = self.mask_tolerance_secs.min(MAX_MASK_TOLERANCE_SECS);
        Duration::seconds(i64::try_from(secs).unwrap_or_default())
    }

    pub fn known_namespaces(&self) -> KnownNamespaces {
        KnownNamespaces::default().with_extra(&self.extra_namespaces)
    }

    pub fn registry_context(&self) -> RegistryContext {
        RegistryContext {
            job: self.job,
            mask_tolerance: self.mask_tolerance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig::default()
            .with_level(self.level.clone())
            .with_format(self.format)
            .with_file(self.file.clone())
    }
}

impl PathoConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_toml(&read_file(path)?, path)
    }

    fn from_toml(raw: &str, path: &Path) -> Result<Self> {
        toml::from_str(raw).map_err(|source| PathoError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values no run can use.
    pub fn validate(&self) -> Result<()> {
        let eval = &self.evaluation;
        if eval.threshold == 0 {
            return Err(PathoError::ConfigInvalid(
                "evaluation.threshold must be at least 1".to_string(),
            ));
        }
        if eval.mask_tolerance_secs > MAX_MASK_TOLERANCE_SECS {
            return Err(PathoError::ConfigInvalid(format!(
                "evaluation.mask_tolerance_secs must be at most {MAX_MASK_TOLERANCE_SECS}"
            )));
        }
        if eval.test_name.trim().is_empty() {
            return Err(PathoError::ConfigInvalid(
                "evaluation.test_name must not be empty".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(PathoError::ConfigInvalid(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolved configuration plus the layer that set each key.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PathoConfig,
    pub sources: BTreeMap<&'static str, ConfigSource>,
}

impl LoadedConfig {
    /// Record that `key` was set by `source`.
    pub fn record(&mut self, key: &'static str, source: ConfigSource) {
        self.sources.insert(key, source);
    }

    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.sources
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }
}

const FILE_KEYS: &[&str] = &[
    "evaluation.threshold",
    "evaluation.job",
    "evaluation.topology",
    "evaluation.platform",
    "evaluation.mask_tolerance_secs",
    "evaluation.test_name",
    "evaluation.extra_namespaces",
    "logging.level",
    "logging.format",
    "logging.file",
];

/// Defaults, then `path` when given, then `PATHO_*` variables from `env`.
/// Every environment problem is reported together.
pub fn load_config(path: Option<&Path>, env: &mut EnvParser) -> Result<LoadedConfig> {
    let mut loaded = match path {
        Some(path) => {
            let raw = read_file(path)?;
            let config = PathoConfig::from_toml(&raw, path)?;
            let file = ConfigSource::File(path.to_path_buf());
            LoadedConfig {
                config,
                sources: keys_present(&raw, path)?
                    .into_iter()
                    .map(|key| (key, file.clone()))
                    .collect(),
            }
        }
        None => LoadedConfig {
            config: PathoConfig::default(),
            sources: BTreeMap::new(),
        },
    };
    apply_env(&mut loaded, env);

    let errors = env.take_errors();
    if !errors.is_empty() {
        return Err(PathoError::Env(
            errors.iter().map(ToString::to_string).collect(),
        ));
    }
    loaded.config.validate()?;
    Ok(loaded)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| PathoError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

/// The `section.key` names from [`FILE_KEYS`] that `raw` actually sets.
fn keys_present(raw: &str, path: &Path) -> Result<Vec<&'static str>> {
    let table: toml::Table = toml::from_str(raw).map_err(|source| PathoError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FILE_KEYS
        .iter()
        .copied()
        .filter(|dotted| {
            dotted.split_once('.').is_some_and(|(section, key)| {
                table
                    .get(section)
                    .and_then(toml::Value::as_table)
                    .is_some_and(|section| section.contains_key(key))
            })
        })
        .collect())
}

fn track_source<T>(
    key: &'static str,
    value: &Sourced<T>,
    sources: &mut BTreeMap<&'static str, ConfigSource>,
) {
    if !value.is_default() {
        sources.insert(key, value.source.clone());
    }
}

fn apply_env(loaded: &mut LoadedConfig, env: &mut EnvParser) {
    let eval = loaded.config.evaluation.clone();

    let threshold = env.get_u64_range("THRESHOLD", eval.threshold, 1, u64::MAX);
    track_source("evaluation.threshold", &threshold, &mut loaded.sources);
    loaded.config.evaluation.threshold = threshold.value;

    let job = env.get_parsed("JOB", eval.job, "general or upgrade");
    track_source("evaluation.job", &job, &mut loaded.sources);
    loaded.config.evaluation.job = job.value;

    let topology = env.get_optional_parsed::<Topology>("TOPOLOGY", "a topology name");
    if topology.value.is_some() {
        track_source("evaluation.topology", &topology, &mut loaded.sources);
        loaded.config.evaluation.topology = topology.value;
    }

    let platform = env.get_optional_parsed::<Platform>("PLATFORM", "a platform name");
    if platform.value.is_some() {
        track_source("evaluation.platform", &platform, &mut loaded.sources);
        loaded.config.evaluation.platform = platform.value;
    }

    let tolerance = env.get_u64_range(
        "MASK_TOLERANCE_SECS",
        eval.mask_tolerance_secs,
        0,
        MAX_MASK_TOLERANCE_SECS,
    );
    track_source("evaluation.mask_tolerance_secs", &tolerance, &mut loaded.sources);
    loaded.config.evaluation.mask_tolerance_secs = tolerance.value;

    let test_name = env.get_optional_string("TEST_NAME");
    if let Some(value) = &test_name.value {
        track_source("evaluation.test_name", &test_name, &mut loaded.sources);
        loaded.config.evaluation.test_name = value.clone();
    }

    let extra = env.get_string_list("EXTRA_NAMESPACES", eval.extra_namespaces);
    track_source("evaluation.extra_namespaces", &extra, &mut loaded.sources);
    loaded.config.evaluation.extra_namespaces = extra.value;

    let level = env.get_log_level("LOG_LEVEL", &loaded.config.logging.level);
    track_source("logging.level", &level, &mut loaded.sources);
    loaded.config.logging.level = level.value;

    let format = env.get_parsed("LOG_FORMAT", loaded.config.logging.format, "pretty or json");
    track_source("logging.format", &format, &mut loaded.sources);
    loaded.config.logging.format = format.value;

    let file = env.get_optional_path("LOG_FILE");
    if file.value.is_some() {
        track_source("logging.file", &file, &mut loaded.sources);
        loaded.config.logging.file = file.value;
    }
}
