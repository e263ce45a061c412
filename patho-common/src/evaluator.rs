//! Per-namespace duplicate-count evaluation.
//!
//! Every known namespace gets exactly one [`EvaluationResult`]. An event with a
//! repetition count at or above the threshold fails its namespace unless a
//! registry matcher allows it or a suppression rule masks it.

use crate::context::{Platform, Topology};
use crate::errors::ErrorCode;
use crate::model::{EventRecord, clock_time};
use crate::namespaces::{KnownNamespaces, result_name};
use crate::registry::MatcherRegistry;
use crate::suppression::{DEFAULT_MASK_TOLERANCE_SECS, SuppressionEngine};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, info_span, warn};

/// Repetitions at or above this count fail a namespace.
pub const DUPLICATE_EVENT_THRESHOLD: u64 = 20;

/// Named pass/fail outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl EvaluationResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: None,
        }
    }

    pub fn fail(name: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: Some(failure.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// `"<N> events happened too frequently\n\n"` followed by `body`.
pub(crate) fn too_frequent(lines: usize, body: &str) -> String {
    format!("{lines} events happened too frequently\n\n{body}")
}

/// Failure line for an event whose count annotation could not be read.
pub(crate) fn malformed_count_line(problem: &str, subject: &str, from: &str, to: &str) -> String {
    format!("event count could not be parsed ({problem}): {subject} From: {from} To: {to} result=reject ")
}

/// `"<loc> - <reason/text>"`, where `<loc>` is the locator summary.
pub(crate) fn subject(event: &EventRecord) -> String {
    format!("{} - {}", event.locator.summary(), event.message.display())
}

/// Lines collected for one namespace, deduplicated by subject.
#[derive(Debug, Default)]
struct Partition {
    lines: Vec<Line>,
    index: HashMap<String, usize>,
}

#[derive(Debug)]
struct Line {
    subject: String,
    count: Option<u64>,
    problem: Option<String>,
    from: String,
    to: String,
}

impl Line {
    fn render(&self) -> String {
        match (&self.problem, self.count) {
            (Some(problem), _) => {
                malformed_count_line(problem, &self.subject, &self.from, &self.to)
            }
            (None, count) => format!(
                "event happened {} times, something is wrong: {} From: {} To: {} result=reject ",
                count.unwrap_or_default(),
                self.subject,
                self.from,
                self.to
            ),
        }
    }
}

impl Partition {
    fn record(&mut self, subject: String, count: u64, event: &EventRecord) {
        if let Some(&at) = self.index.get(&subject) {
            let line = &mut self.lines[at];
            line.count = line.count.max(Some(count));
            return;
        }
        self.index.insert(subject.clone(), self.lines.len());
        self.lines.push(Line {
            subject,
            count: Some(count),
            problem: None,
            from: clock_time(event.from),
            to: clock_time(event.to),
        });
    }

    fn record_malformed(&mut self, subject: String, problem: String, event: &EventRecord) {
        self.lines.push(Line {
            subject,
            count: None,
            problem: Some(problem),
            from: clock_time(event.from),
            to: clock_time(event.to),
        });
    }

    fn failure(&self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let body = self
            .lines
            .iter()
            .map(Line::render)
            .collect::<Vec<_>>()
            .join("\n");
        Some(too_frequent(self.lines.len(), &body))
    }
}

/// Applies threshold, registry and suppression to one run's events.
#[derive(Debug, Clone)]
pub struct DuplicateEvaluator<'r> {
    registry: &'r MatcherRegistry,
    namespaces: KnownNamespaces,
    threshold: u64,
    mask_tolerance: Duration,
}

impl<'r> DuplicateEvaluator<'r> {
    pub fn new(registry: &'r MatcherRegistry) -> Self {
        Self {
            registry,
            namespaces: KnownNamespaces::default(),
            threshold: DUPLICATE_EVENT_THRESHOLD,
            mask_tolerance: Duration::seconds(DEFAULT_MASK_TOLERANCE_SECS),
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_namespaces(mut self, namespaces: KnownNamespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    #[must_use]
    pub fn with_mask_tolerance(mut self, tolerance: Duration) -> Self {
        self.mask_tolerance = tolerance;
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn namespaces(&self) -> &KnownNamespaces {
        &self.namespaces
    }

    /// One result per known namespace, in namespace order.
    ///
    /// `platform` only annotates diagnostics; matchers gate on topology.
    pub fn evaluate(
        &self,
        test_name: &str,
        events: &[EventRecord],
        topology: Option<Topology>,
        platform: Option<Platform>,
    ) -> Vec<EvaluationResult> {
        let span = info_span!(
            "evaluate_duplicates",
            test = test_name,
            topology = ?topology,
            platform = ?platform,
            threshold = self.threshold
        );
        let _enter = span.enter();

        let suppression = SuppressionEngine::new(events).with_tolerance(self.mask_tolerance);
        let mut partitions: BTreeMap<&str, Partition> = BTreeMap::new();
        let (mut allowed, mut suppressed) = (0usize, 0usize);

        for event in events {
            if event.source.is_state_window() {
                continue;
            }
            let partition = self.namespaces.partition_for(event.namespace());
            let count = match event.message.count() {
                Ok(count) => count.unwrap_or(1),
                Err(err) => {
                    warn!(
                        code = %ErrorCode::EvaluationMalformedCount.code_string(),
                        namespace = partition,
                        "{err}"
                    );
                    partitions.entry(partition).or_default().record_malformed(
                        subject(event),
                        err.to_string(),
                        event,
                    );
                    continue;
                }
            };

            if count < self.threshold {
                continue;
            }

            let verdict = self.registry.matches_any(event, topology);
            if verdict.allowed {
                allowed += 1;
                continue;
            }

            if let Some(family) = suppression.suppressed(event) {
                debug!(%family, reason = %event.message.reason, "repeated event suppressed");
                suppressed += 1;
                continue;
            }

            partitions
                .entry(partition)
                .or_default()
                .record(subject(event), count, event);
        }

        let results: Vec<EvaluationResult> = self
            .namespaces
            .iter()
            .map(|ns| {
                let name = result_name(test_name, ns);
                match partitions.get(ns).and_then(Partition::failure) {
                    Some(failure) => EvaluationResult::fail(name, failure),
                    None => EvaluationResult::pass(name),
                }
            })
            .collect();

        info!(
            events = events.len(),
            results = results.len(),
            failed = results.iter().filter(|r| r.is_failure()).count(),
            allowed,
            suppressed,
            "duplicate evaluation finished"
        );
        results
    }
}
