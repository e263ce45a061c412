//! Interval records consumed by the classification engine.
//!
//! An [`EventRecord`] is one observed, possibly repeated, diagnostic event or
//! state window recorded by the monitor during a test run. Records are built
//! once (usually through [`EventRecord::builder`]) and only read afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Locator keys understood by the classifier.
pub mod keys {
    pub const NAMESPACE: &str = "namespace";
    pub const POD: &str = "pod";
    pub const NODE: &str = "node";
    pub const CONTAINER: &str = "container";
    pub const E2E_TEST: &str = "e2e-test";
    pub const SERVICE: &str = "service";
    pub const HMSG: &str = "hmsg";
}

/// Message annotation keys understood by the classifier.
pub mod annotations {
    /// Number of times the event was observed.
    pub const COUNT: &str = "count";
    pub const CONSTRUCTED: &str = "constructed";
    pub const PHASE: &str = "phase";
    pub const ROLES: &str = "roles";
    pub const REASON: &str = "reason";
    pub const PATHOLOGICAL: &str = "pathological";
}

/// Well-known reason codes.
pub mod reasons {
    pub const NODE_UPDATE: &str = "NodeUpdate";
    pub const GRACEFUL_DELETE_STARTED: &str = "GracefulDelete";
    pub const CONTAINER_READY: &str = "Ready";
    pub const FAILED_SCHEDULING: &str = "FailedScheduling";
    pub const TOPOLOGY_AWARE_HINTS_DISABLED: &str = "TopologyAwareHintsDisabled";
    pub const PROBE_ERROR: &str = "ProbeError";
    pub const UNHEALTHY: &str = "Unhealthy";
    pub const BACK_OFF: &str = "BackOff";
}

/// Severity recorded by the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Level {
    #[default]
    Info,
    Warning,
    Error,
}

impl Level {
    /// Single-letter form used in compact event lines.
    pub const fn initial(self) -> char {
        match self {
            Self::Info => 'I',
            Self::Warning => 'W',
            Self::Error => 'E',
        }
    }
}

/// Subsystem that produced a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Source {
    /// Cluster event stream.
    KubeEvent,
    /// Derived pod/container lifecycle window.
    PodState,
    /// Derived node lifecycle window.
    NodeState,
    /// Synthetic e2e test marker.
    E2ETest,
    #[default]
    Unspecified,
}

impl Source {
    /// Whether records from this source describe a state window rather than a
    /// discrete event. State windows are never evaluated for duplicates.
    pub const fn is_state_window(self) -> bool {
        matches!(self, Self::PodState | Self::NodeState | Self::E2ETest)
    }
}

/// Shape of the object a locator points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LocatorKind {
    Node,
    Pod,
    Container,
    E2ETest,
    #[default]
    Unspecified,
}

/// Keyed identification of what produced an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(default)]
    pub kind: LocatorKind,
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

impl Locator {
    /// Locator of `kind` with no keys.
    pub fn new(kind: LocatorKind) -> Self {
        Self {
            kind,
            keys: BTreeMap::new(),
        }
    }

    /// Add a key. Empty values are dropped so they read as absent.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.keys.insert(key.to_string(), value);
        }
        self
    }

    /// Value for `key`, treating an empty string as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Value of the `namespace` key.
    pub fn namespace(&self) -> Option<&str> {
        self.get(keys::NAMESPACE)
    }

    /// Value of the `pod` key.
    pub fn pod(&self) -> Option<&str> {
        self.get(keys::POD)
    }

    /// Short form used in failure lines: `namespace/<ns>` for an object
    /// locator, empty when there is no namespace or the locator identifies an
    /// aggregated message (carries an `hmsg` key).
    pub fn summary(&self) -> String {
        match self.namespace() {
            Some(ns) if self.get(keys::HMSG).is_none() => format!("namespace/{ns}"),
            _ => String::new(),
        }
    }
}

/// Structured event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub human: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// The count annotation is present but is not a non-negative integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCount(pub String);

impl fmt::Display for MalformedCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count annotation {:?} is not a non-negative integer", self.0)
    }
}

impl std::error::Error for MalformedCount {}

impl Message {
    /// Empty message: no reason, no text, no annotations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the machine-readable reason code.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Set the human-readable text.
    pub fn human(mut self, human: impl Into<String>) -> Self {
        self.human = human.into();
        self
    }

    /// Add an annotation, replacing any earlier value for `key`.
    pub fn annotation(mut self, key: &str, value: impl Into<String>) -> Self {
        self.annotations.insert(key.to_string(), value.into());
        self
    }

    /// Raw annotation value for `key`.
    pub fn get_annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Repetition count, `None` when the event carries no count annotation.
    pub fn count(&self) -> Result<Option<u64>, MalformedCount> {
        match self.get_annotation(annotations::COUNT) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| MalformedCount(raw.to_string())),
        }
    }

    /// `reason/<reason> <text>` rendering used in failure lines.
    pub fn display(&self) -> String {
        format!("reason/{} {}", self.reason, self.human.trim())
    }
}

/// One recorded interval from a test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub locator: Locator,
    #[serde(default)]
    pub message: Message,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl EventRecord {
    /// Start a record from `source` at `level`. Locator and message default
    /// to empty.
    pub fn builder(source: Source, level: Level) -> EventRecordBuilder {
        EventRecordBuilder {
            level,
            source,
            locator: Locator::default(),
            message: Message::default(),
        }
    }

    /// Build a kube event observed `count` times, the usual shape of a
    /// pathological duplicate. Empty namespace or pod leave the key out.
    pub fn repeated_kube_event(
        namespace: &str,
        pod: &str,
        reason: &str,
        human: &str,
        count: u64,
        at: DateTime<Utc>,
    ) -> Self {
        let locator = Locator::new(LocatorKind::Unspecified)
            .with(keys::NAMESPACE, namespace)
            .with(keys::POD, pod);
        Self::builder(Source::KubeEvent, Level::Info)
            .locator(locator)
            .message(
                Message::new()
                    .reason(reason)
                    .human(human)
                    .annotation(annotations::COUNT, count.to_string()),
            )
            .build(at, at)
    }

    /// Namespace of the locator, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.locator.namespace()
    }

    /// Whether `[from, to]` of both records intersect once `tolerance` is
    /// added on either side of `other`. Touching boundaries overlap.
    pub fn overlaps(&self, other: &EventRecord, tolerance: chrono::Duration) -> bool {
        other.from - tolerance <= self.to && self.from <= other.to + tolerance
    }
}

/// Builder mirroring how the monitor assembles intervals.
#[derive(Debug, Clone)]
pub struct EventRecordBuilder {
    level: Level,
    source: Source,
    locator: Locator,
    message: Message,
}

impl EventRecordBuilder {
    pub fn locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.message = message;
        self
    }

    /// Finish the record covering `[from, to]`.
    pub fn build(self, from: DateTime<Utc>, to: DateTime<Utc>) -> EventRecord {
        EventRecord {
            level: self.level,
            source: self.source,
            locator: self.locator,
            message: self.message,
            from,
            to,
        }
    }
}

/// `HH:MM:SSZ` rendering of an instant, as used in failure lines.
pub fn clock_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%SZ").to_string()
}
