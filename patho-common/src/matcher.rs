//! Named predicates deciding whether a repeated event is expected.
//!
//! A [`Matcher`] is a flat list of [`Condition`]s; it matches when every
//! condition holds. Conditions are evaluated in declaration order and never
//! look at other matchers, so the same inputs always give the same verdict.

use crate::context::Topology;
use crate::errors::{PathoError, Result};
use crate::model::{EventRecord, keys};
use crate::suppression::{SuppressionEngine, SuppressionFamily};
use regex::Regex;
use std::fmt;

/// Uncompiled text pattern as declared by a matcher author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSpec {
    Exact(String),
    Prefix(String),
    Contains(String),
    Regex(String),
}

impl PatternSpec {
    fn compile(self, matcher: &str) -> Result<TextPattern> {
        Ok(match self {
            Self::Exact(text) => TextPattern::Exact(text),
            Self::Prefix(text) => TextPattern::Prefix(text),
            Self::Contains(text) => TextPattern::Contains(text),
            Self::Regex(pattern) => {
                let regex = Regex::new(&pattern).map_err(|source| PathoError::InvalidPattern {
                    matcher: matcher.to_string(),
                    pattern,
                    source,
                })?;
                TextPattern::Regex(regex)
            }
        })
    }
}

/// Compiled text pattern. String comparisons are case-sensitive.
#[derive(Debug, Clone)]
pub enum TextPattern {
    Exact(String),
    Prefix(String),
    Contains(String),
    Regex(Regex),
}

impl TextPattern {
    /// Whether `text` satisfies the pattern.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Exact(expected) => text == expected,
            Self::Prefix(prefix) => text.starts_with(prefix.as_str()),
            Self::Contains(needle) => text.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(text),
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(text) => write!(f, "={text}"),
            Self::Prefix(text) => write!(f, "^{text}*"),
            Self::Contains(text) => write!(f, "*{text}*"),
            Self::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// One applicability condition of a matcher.
#[derive(Debug, Clone)]
pub enum Condition {
    Reason(TextPattern),
    Message(TextPattern),
    /// The locator key must be present and match.
    Locator { key: String, pattern: TextPattern },
    /// The locator key must be absent.
    LocatorAbsent(String),
    /// Never match inside namespaces matching the pattern.
    ExcludeNamespace(TextPattern),
    /// Only match when the run's topology is exactly this one.
    Topology(Topology),
    /// Only match while the family's masking interval is present in the run.
    Masked(SuppressionFamily),
}

impl Condition {
    fn holds(
        &self,
        event: &EventRecord,
        topology: Option<Topology>,
        masks: Option<&SuppressionEngine<'_>>,
    ) -> bool {
        match self {
            Self::Reason(pattern) => pattern.is_match(&event.message.reason),
            Self::Message(pattern) => pattern.is_match(&event.message.human),
            Self::Locator { key, pattern } => event
                .locator
                .get(key)
                .is_some_and(|value| pattern.is_match(value)),
            Self::LocatorAbsent(key) => event.locator.get(key).is_none(),
            Self::ExcludeNamespace(pattern) => {
                !event.namespace().is_some_and(|ns| pattern.is_match(ns))
            }
            Self::Topology(required) => topology == Some(*required),
            Self::Masked(family) => masks.is_some_and(|engine| engine.masks(*family, event)),
        }
    }
}

/// A named allow-rule for repeated events.
#[derive(Debug, Clone)]
pub struct Matcher {
    name: String,
    description: Option<String>,
    conditions: Vec<Condition>,
}

impl Matcher {
    /// Start a matcher called `name`. Names must be unique within a registry.
    pub fn builder(name: impl Into<String>) -> MatcherBuilder {
        MatcherBuilder {
            name: name.into(),
            description: None,
            conditions: Vec::new(),
        }
    }

    /// Unique name used in reports and lookups.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form note on why the rule exists.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Conditions in declaration order. All must hold.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether this matcher needs the run's interval set to decide.
    pub fn needs_intervals(&self) -> bool {
        self.conditions
            .iter()
            .any(|condition| matches!(condition, Condition::Masked(_)))
    }

    /// Verdict without access to sibling intervals; masking conditions never
    /// hold here.
    pub fn matches(&self, event: &EventRecord, topology: Option<Topology>) -> bool {
        self.matches_with(event, topology, None)
    }

    /// Verdict for `event`. Masking conditions consult `masks` and fail when
    /// it is `None`.
    pub fn matches_with(
        &self,
        event: &EventRecord,
        topology: Option<Topology>,
        masks: Option<&SuppressionEngine<'_>>,
    ) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.holds(event, topology, masks))
    }
}

enum PendingCondition {
    Reason(PatternSpec),
    Message(PatternSpec),
    Locator { key: String, pattern: PatternSpec },
    LocatorAbsent(String),
    ExcludeNamespace(PatternSpec),
    Topology(Topology),
    Masked(SuppressionFamily),
}

/// Collects conditions and compiles them in [`MatcherBuilder::build`].
pub struct MatcherBuilder {
    name: String,
    description: Option<String>,
    conditions: Vec<PendingCondition>,
}

impl MatcherBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Require the event reason to match `pattern`.
    pub fn reason(mut self, pattern: PatternSpec) -> Self {
        self.conditions.push(PendingCondition::Reason(pattern));
        self
    }

    pub fn reason_exact(self, reason: &str) -> Self {
        self.reason(PatternSpec::Exact(reason.to_string()))
    }

    /// Require the human text to match `pattern`.
    pub fn message(mut self, pattern: PatternSpec) -> Self {
        self.conditions.push(PendingCondition::Message(pattern));
        self
    }

    pub fn message_contains(self, needle: &str) -> Self {
        self.message(PatternSpec::Contains(needle.to_string()))
    }

    pub fn message_regex(self, pattern: &str) -> Self {
        self.message(PatternSpec::Regex(pattern.to_string()))
    }

    /// Require locator `key` to be present and match `pattern`.
    pub fn locator(mut self, key: &str, pattern: PatternSpec) -> Self {
        self.conditions.push(PendingCondition::Locator {
            key: key.to_string(),
            pattern,
        });
        self
    }

    /// Require locator `key` to be absent or empty.
    pub fn locator_absent(mut self, key: &str) -> Self {
        self.conditions
            .push(PendingCondition::LocatorAbsent(key.to_string()));
        self
    }

    pub fn namespace(self, pattern: PatternSpec) -> Self {
        self.locator(keys::NAMESPACE, pattern)
    }

    pub fn namespace_exact(self, namespace: &str) -> Self {
        self.namespace(PatternSpec::Exact(namespace.to_string()))
    }

    pub fn namespace_prefix(self, prefix: &str) -> Self {
        self.namespace(PatternSpec::Prefix(prefix.to_string()))
    }

    /// Never match events in namespaces matching `pattern`.
    pub fn exclude_namespace(mut self, pattern: PatternSpec) -> Self {
        self.conditions
            .push(PendingCondition::ExcludeNamespace(pattern));
        self
    }

    /// Only match runs on exactly this topology.
    pub fn topology(mut self, topology: Topology) -> Self {
        self.conditions.push(PendingCondition::Topology(topology));
        self
    }

    /// Only match while a masking interval of `family` overlaps the event.
    pub fn masked_by(mut self, family: SuppressionFamily) -> Self {
        self.conditions.push(PendingCondition::Masked(family));
        self
    }

    /// Compile every pattern. A bad regular expression fails the whole
    /// matcher.
    pub fn build(self) -> Result<Matcher> {
        if self.conditions.is_empty() {
            return Err(PathoError::EmptyMatcher(self.name));
        }

        let name = self.name;
        let conditions = self
            .conditions
            .into_iter()
            .map(|pending| {
                Ok(match pending {
                    PendingCondition::Reason(spec) => Condition::Reason(spec.compile(&name)?),
                    PendingCondition::Message(spec) => Condition::Message(spec.compile(&name)?),
                    PendingCondition::Locator { key, pattern } => Condition::Locator {
                        key,
                        pattern: pattern.compile(&name)?,
                    },
                    PendingCondition::LocatorAbsent(key) => Condition::LocatorAbsent(key),
                    PendingCondition::ExcludeNamespace(spec) => {
                        Condition::ExcludeNamespace(spec.compile(&name)?)
                    }
                    PendingCondition::Topology(topology) => Condition::Topology(topology),
                    PendingCondition::Masked(family) => Condition::Masked(family),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Matcher {
            name,
            description: self.description,
            conditions,
        })
    }
}
