//! Classification of repeated ("pathological") cluster events.
//!
//! A test run records intervals; events that repeat too often usually point
//! at a regression. This crate decides, per namespace, which repetitions are
//! expected (allowed by a [`Matcher`] in a [`MatcherRegistry`] or masked by
//! the [`SuppressionEngine`]) and which fail the run.
//!
//! ```ignore
//! let registry = build_registry(&RegistryContext::new(JobKind::Upgrade), Some(events.clone().into()))?;
//! let results = DuplicateEvaluator::new(&registry).evaluate("events should not repeat", &events, topology, platform);
//! ```

pub mod config;
pub mod context;
pub mod errors;
pub mod evaluator;
pub mod intervals;
pub mod library;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod namespaces;
pub mod probe;
pub mod registry;
pub mod suppression;

pub use config::{EnvParser, LoadedConfig, PathoConfig, load_config};
pub use context::{JobKind, Platform, Topology};
pub use errors::{ErrorCode, PathoError, Result};
pub use evaluator::{DUPLICATE_EVENT_THRESHOLD, DuplicateEvaluator, EvaluationResult};
pub use intervals::read_intervals;
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use matcher::{Condition, Matcher, MatcherBuilder, PatternSpec, TextPattern};
pub use model::{EventRecord, Level, Locator, LocatorKind, Message, Source};
pub use namespaces::{KnownNamespaces, result_name};
pub use probe::count_threshold_crossings;
pub use registry::{AllowVerdict, MatcherRegistry, RegistryContext, build_registry};
pub use suppression::{SuppressionEngine, SuppressionFamily};
