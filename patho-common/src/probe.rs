//! Threshold counting for probe-error events.
//!
//! Probe failures are judged per component rather than per namespace bucket:
//! events one matcher accepts inside one namespace are split by whether their
//! count reached the threshold, and only the ones that did are reported.

use crate::errors::ErrorCode;
use crate::evaluator::{EvaluationResult, malformed_count_line, subject, too_frequent};
use crate::matcher::Matcher;
use crate::model::{EventRecord, clock_time};
use crate::namespaces::result_name;
use tracing::{info, warn};

/// Matched events on either side of the threshold.
#[derive(Debug, Default)]
pub struct ThresholdSplit<'a> {
    pub before: Vec<&'a EventRecord>,
    pub after: Vec<(&'a EventRecord, u64)>,
    /// Matched events whose count annotation could not be read, with the
    /// parse problem.
    pub unreadable: Vec<(&'a EventRecord, String)>,
}

/// Partition the events `matcher` accepts in `scope_name` around `threshold`.
///
/// An event without a count annotation was seen once.
pub fn split_at_threshold<'a>(
    events: &'a [EventRecord],
    scope_name: &str,
    matcher: &Matcher,
    threshold: u64,
) -> ThresholdSplit<'a> {
    let mut split = ThresholdSplit::default();
    for event in events {
        if event.namespace().unwrap_or_default() != scope_name || !matcher.matches(event, None) {
            continue;
        }
        match event.message.count() {
            Ok(count) => {
                let count = count.unwrap_or(1);
                if count >= threshold {
                    split.after.push((event, count));
                } else {
                    split.before.push(event);
                }
            }
            Err(err) => {
                warn!(
                    code = %ErrorCode::EvaluationMalformedCount.code_string(),
                    matcher = matcher.name(),
                    scope = scope_name,
                    "{err}"
                );
                split.unreadable.push((event, err.to_string()));
            }
        }
    }
    split
}

/// `<L> namespace/<ns> [pod/<pod> ]count/<N> reason/<reason> <text>\n`
fn probe_line(event: &EventRecord, count: u64) -> String {
    let mut line = String::new();
    line.push(event.level.initial());
    if let Some(ns) = event.namespace() {
        line.push_str(&format!(" namespace/{ns}"));
    }
    if let Some(pod) = event.locator.pod() {
        line.push_str(&format!(" pod/{pod}"));
    }
    line.push_str(&format!(" count/{count} {}\n", event.message.display()));
    line
}

/// Failure line for a matched event whose count could not be read.
fn unreadable_line(event: &EventRecord, problem: &str) -> String {
    let mut line = malformed_count_line(
        problem,
        &subject(event),
        &clock_time(event.from),
        &clock_time(event.to),
    );
    line.push('\n');
    line
}

/// One result for `scope_name`, failing when any matched event reached
/// `threshold` or carried an unreadable count.
pub fn count_threshold_crossings(
    test_name: &str,
    events: &[EventRecord],
    scope_name: &str,
    matcher: &Matcher,
    threshold: u64,
) -> Vec<EvaluationResult> {
    let split = split_at_threshold(events, scope_name, matcher, threshold);
    info!(
        matcher = matcher.name(),
        scope = scope_name,
        threshold,
        before = split.before.len(),
        after = split.after.len(),
        unreadable = split.unreadable.len(),
        "probe events counted"
    );

    let name = result_name(test_name, scope_name);
    let lines = split.after.len() + split.unreadable.len();
    if lines == 0 {
        return vec![EvaluationResult::pass(name)];
    }
    let body: String = split
        .after
        .iter()
        .map(|(event, count)| probe_line(event, *count))
        .chain(
            split
                .unreadable
                .iter()
                .map(|(event, problem)| unreadable_line(event, problem)),
        )
        .collect();
    vec![EvaluationResult::fail(name, too_frequent(lines, &body))]
}
