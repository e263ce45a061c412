//! Ordered matcher collection answering "is this repetition allowed?".

use crate::context::{JobKind, Topology};
use crate::errors::{PathoError, Result};
use crate::library::{universal_matchers, upgrade_matchers};
use crate::matcher::Matcher;
use crate::model::EventRecord;
use crate::suppression::{DEFAULT_MASK_TOLERANCE_SECS, SuppressionEngine};
use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

/// Outcome of [`MatcherRegistry::matches_any`].
#[derive(Debug, Clone, Copy)]
pub struct AllowVerdict<'a> {
    pub allowed: bool,
    /// Name of the first matching matcher, empty when none matched.
    pub matcher_name: &'a str,
    pub matcher: Option<&'a Matcher>,
}

impl AllowVerdict<'_> {
    const fn denied() -> Self {
        Self {
            allowed: false,
            matcher_name: "",
            matcher: None,
        }
    }
}

/// What a registry is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryContext {
    pub job: JobKind,
    /// Slack applied by interval-dependent matchers.
    pub mask_tolerance: Duration,
}

impl Default for RegistryContext {
    fn default() -> Self {
        Self {
            job: JobKind::General,
            mask_tolerance: Duration::seconds(DEFAULT_MASK_TOLERANCE_SECS),
        }
    }
}

impl RegistryContext {
    /// Context for `job` with zero mask tolerance.
    pub fn new(job: JobKind) -> Self {
        Self {
            job,
            ..Self::default()
        }
    }
}

/// Matchers in evaluation order plus the interval set that masking
/// conditions consult.
#[derive(Debug, Clone)]
pub struct MatcherRegistry {
    matchers: Vec<Matcher>,
    intervals: Arc<[EventRecord]>,
    mask_tolerance: Duration,
}

impl MatcherRegistry {
    /// Empty registry over `intervals`.
    pub fn new(intervals: Option<Arc<[EventRecord]>>) -> Self {
        Self {
            matchers: Vec::new(),
            intervals: intervals.unwrap_or_else(|| Arc::from(Vec::new())),
            mask_tolerance: Duration::seconds(DEFAULT_MASK_TOLERANCE_SECS),
        }
    }

    /// Registry holding `matchers` in the given order. Fails on the first
    /// repeated name.
    pub fn from_matchers(
        matchers: Vec<Matcher>,
        intervals: Option<Arc<[EventRecord]>>,
    ) -> Result<Self> {
        let mut registry = Self::new(intervals);
        for matcher in matchers {
            registry.register(matcher)?;
        }
        Ok(registry)
    }

    #[must_use]
    /// Slack added around masking intervals.
    pub fn with_mask_tolerance(mut self, tolerance: Duration) -> Self {
        self.mask_tolerance = tolerance;
        self
    }

    /// Append a matcher after the existing ones.
    pub fn register(&mut self, matcher: Matcher) -> Result<()> {
        if self.get(matcher.name()).is_some() {
            return Err(PathoError::DuplicateMatcher(matcher.name().to_string()));
        }
        self.matchers.push(matcher);
        Ok(())
    }

    /// First matcher allowing `event`, in registration order.
    pub fn matches_any(&self, event: &EventRecord, topology: Option<Topology>) -> AllowVerdict<'_> {
        let masks = SuppressionEngine::new(&self.intervals).with_tolerance(self.mask_tolerance);
        match self
            .matchers
            .iter()
            .find(|matcher| matcher.matches_with(event, topology, Some(&masks)))
        {
            Some(matcher) => {
                debug!(matcher = matcher.name(), reason = %event.message.reason, "repeated event allowed");
                AllowVerdict {
                    allowed: true,
                    matcher_name: matcher.name(),
                    matcher: Some(matcher),
                }
            }
            None => AllowVerdict::denied(),
        }
    }

    /// Matcher registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Matcher> {
        self.matchers.iter().find(|matcher| matcher.name() == name)
    }

    /// All matchers in evaluation order.
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Matcher names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(Matcher::name)
    }

    /// Number of registered matchers.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Interval set masking conditions consult; empty when the registry was
    /// built without one.
    pub fn intervals(&self) -> &[EventRecord] {
        &self.intervals
    }
}

/// Build the matcher set for `ctx.job` over the run's intervals.
pub fn build_registry(
    ctx: &RegistryContext,
    intervals: Option<Arc<[EventRecord]>>,
) -> Result<MatcherRegistry> {
    let matchers = match ctx.job {
        JobKind::General => universal_matchers()?,
        JobKind::Upgrade => upgrade_matchers()?,
    };
    let registry = MatcherRegistry::from_matchers(matchers, intervals)?
        .with_mask_tolerance(ctx.mask_tolerance);
    debug!(
        job = %ctx.job,
        matchers = registry.len(),
        intervals = registry.intervals().len(),
        "matcher registry built"
    );
    Ok(registry)
}
