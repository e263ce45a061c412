//! Temporal masking of would-be failures.
//!
//! Some repeated events are only benign while another condition holds in the
//! cluster, for example scheduling failures while control-plane nodes are
//! being updated. Each such case is a [`SuppressionRule`] in
//! [`SUPPRESSION_RULES`]: which events it covers, what a masking interval
//! looks like, and how the two must relate in time. Events no rule covers are
//! never suppressed.

use crate::model::{EventRecord, Source, annotations, keys, reasons};
use crate::namespaces::{DNS_NAMESPACE, is_platform_namespace};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Default slack added on both sides of a masking interval, in seconds.
pub const DEFAULT_MASK_TOLERANCE_SECS: i64 = 0;

/// Event families that can be masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuppressionFamily {
    /// `FailedScheduling` in a platform namespace during a control-plane
    /// node update.
    FailedSchedulingDuringControlPlaneUpdate,
    /// `TopologyAwareHintsDisabled` in the DNS namespace while a deleted DNS
    /// pod is being replaced.
    TopologyHintsDisabledBeforeDnsReady,
}

impl SuppressionFamily {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailedSchedulingDuringControlPlaneUpdate => {
                "FailedSchedulingDuringControlPlaneUpdate"
            }
            Self::TopologyHintsDisabledBeforeDnsReady => "TopologyHintsDisabledBeforeDnsReady",
        }
    }
}

impl fmt::Display for SuppressionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the interval that masks a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskShape {
    /// Node-state `NodeUpdate` window in phase `Update` on a control-plane
    /// node.
    ControlPlaneNodeUpdate,
    /// Ready-container window of a DNS pod that entered graceful deletion at
    /// or before the candidate started.
    DnsContainerReadyAfterDeletion,
}

/// Required relation between candidate and mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalRelation {
    /// Spans intersect, boundaries inclusive.
    Overlaps,
    /// Mask starts at or after the candidate ends.
    StartsAfterEnd,
}

impl TemporalRelation {
    fn holds(self, candidate: &EventRecord, mask: &EventRecord, tolerance: Duration) -> bool {
        match self {
            Self::Overlaps => candidate.overlaps(mask, tolerance),
            Self::StartsAfterEnd => mask.from + tolerance >= candidate.to,
        }
    }
}

pub struct SuppressionRule {
    pub family: SuppressionFamily,
    pub applies_to: fn(&EventRecord) -> bool,
    pub mask: MaskShape,
    pub relation: TemporalRelation,
}

impl fmt::Debug for SuppressionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressionRule")
            .field("family", &self.family)
            .field("mask", &self.mask)
            .field("relation", &self.relation)
            .finish_non_exhaustive()
    }
}

pub static SUPPRESSION_RULES: &[SuppressionRule] = &[
    SuppressionRule {
        family: SuppressionFamily::FailedSchedulingDuringControlPlaneUpdate,
        applies_to: failed_scheduling_in_platform_namespace,
        mask: MaskShape::ControlPlaneNodeUpdate,
        relation: TemporalRelation::Overlaps,
    },
    SuppressionRule {
        family: SuppressionFamily::TopologyHintsDisabledBeforeDnsReady,
        applies_to: dns_topology_hints_disabled,
        mask: MaskShape::DnsContainerReadyAfterDeletion,
        relation: TemporalRelation::StartsAfterEnd,
    },
];

fn failed_scheduling_in_platform_namespace(event: &EventRecord) -> bool {
    event.message.reason == reasons::FAILED_SCHEDULING
        && event.namespace().is_some_and(is_platform_namespace)
}

fn dns_topology_hints_disabled(event: &EventRecord) -> bool {
    event.message.reason == reasons::TOPOLOGY_AWARE_HINTS_DISABLED
        && event.namespace() == Some(DNS_NAMESPACE)
}

/// Rule covering `family`.
pub fn rule_for(family: SuppressionFamily) -> Option<&'static SuppressionRule> {
    SUPPRESSION_RULES.iter().find(|rule| rule.family == family)
}

fn is_control_plane_update(interval: &EventRecord) -> bool {
    interval.source == Source::NodeState
        && interval.message.reason == reasons::NODE_UPDATE
        && interval.message.get_annotation(annotations::PHASE) == Some("Update")
        && interval
            .message
            .get_annotation(annotations::ROLES)
            .is_some_and(|roles| {
                roles
                    .split(',')
                    .map(str::trim)
                    .any(|role| role == "master" || role == "control-plane")
            })
}

fn is_dns_pod_window(interval: &EventRecord, reason: &str) -> bool {
    interval.source == Source::PodState
        && interval.message.reason == reason
        && interval.namespace() == Some(DNS_NAMESPACE)
        && interval.locator.pod().is_some()
}

/// Answers "is this candidate masked?" over one run's intervals.
#[derive(Debug, Clone, Copy)]
pub struct SuppressionEngine<'a> {
    intervals: &'a [EventRecord],
    tolerance: Duration,
}

impl<'a> SuppressionEngine<'a> {
    pub fn new(intervals: &'a [EventRecord]) -> Self {
        Self {
            intervals,
            tolerance: Duration::seconds(DEFAULT_MASK_TOLERANCE_SECS),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Family masking `event`, if any rule covers it and its mask is present.
    pub fn suppressed(&self, event: &EventRecord) -> Option<SuppressionFamily> {
        SUPPRESSION_RULES
            .iter()
            .filter(|rule| (rule.applies_to)(event))
            .find(|rule| self.mask_present(rule, event))
            .map(|rule| rule.family)
    }

    /// Whether `family` covers `event` and its mask is present.
    pub fn masks(&self, family: SuppressionFamily, event: &EventRecord) -> bool {
        rule_for(family)
            .is_some_and(|rule| (rule.applies_to)(event) && self.mask_present(rule, event))
    }

    fn mask_present(&self, rule: &SuppressionRule, event: &EventRecord) -> bool {
        match rule.mask {
            MaskShape::ControlPlaneNodeUpdate => self
                .intervals
                .iter()
                .filter(|interval| is_control_plane_update(interval))
                .any(|mask| rule.relation.holds(event, mask, self.tolerance)),
            MaskShape::DnsContainerReadyAfterDeletion => {
                let deleted: BTreeSet<&str> = self
                    .intervals
                    .iter()
                    .filter(|interval| {
                        is_dns_pod_window(interval, reasons::GRACEFUL_DELETE_STARTED)
                            && interval.from <= event.from
                    })
                    .filter_map(|interval| interval.locator.pod())
                    .collect();
                if deleted.is_empty() {
                    return false;
                }
                self.intervals
                    .iter()
                    .filter(|interval| {
                        is_dns_pod_window(interval, reasons::CONTAINER_READY)
                            && interval.locator.get(keys::CONTAINER) == Some("dns")
                            && interval
                                .locator
                                .pod()
                                .is_some_and(|pod| deleted.contains(pod))
                    })
                    .any(|mask| rule.relation.holds(event, mask, self.tolerance))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Level, Locator, LocatorKind, Message};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(872_827_200 + secs, 0).single().unwrap()
    }

    fn node_update(from: i64, to: i64, roles: &str) -> EventRecord {
        EventRecord::builder(Source::NodeState, Level::Info)
            .locator(Locator::new(LocatorKind::Node).with(keys::NODE, "master-0"))
            .message(
                Message::new()
                    .reason(reasons::NODE_UPDATE)
                    .annotation(annotations::PHASE, "Update")
                    .annotation(annotations::ROLES, roles),
            )
            .build(at(from), at(to))
    }

    fn failed_scheduling(namespace: &str, from: i64, to: i64) -> EventRecord {
        EventRecord::builder(Source::KubeEvent, Level::Info)
            .locator(Locator::new(LocatorKind::Pod).with(keys::NAMESPACE, namespace))
            .message(
                Message::new()
                    .reason(reasons::FAILED_SCHEDULING)
                    .human("0/6 nodes are available")
                    .annotation(annotations::COUNT, "22"),
            )
            .build(at(from), at(to))
    }

    #[test]
    fn overlapping_control_plane_update_masks_scheduling() {
        let intervals = vec![node_update(0, 600, "control-plane,master")];
        let engine = SuppressionEngine::new(&intervals);
        assert_eq!(
            engine.suppressed(&failed_scheduling("openshift-controller-manager", 60, 120)),
            Some(SuppressionFamily::FailedSchedulingDuringControlPlaneUpdate)
        );
        assert_eq!(
            engine.suppressed(&failed_scheduling("openshift", 600, 700)),
            Some(SuppressionFamily::FailedSchedulingDuringControlPlaneUpdate)
        );
    }

    #[test]
    fn worker_updates_and_user_namespaces_are_not_masked() {
        let intervals = vec![node_update(0, 600, "worker")];
        let engine = SuppressionEngine::new(&intervals);
        assert_eq!(
            engine.suppressed(&failed_scheduling("openshift-etcd", 60, 120)),
            None
        );

        let intervals = vec![node_update(0, 600, "master")];
        let engine = SuppressionEngine::new(&intervals);
        assert_eq!(engine.suppressed(&failed_scheduling("e2e-test", 60, 120)), None);
        assert_eq!(engine.suppressed(&failed_scheduling("openshiftx", 60, 120)), None);
    }

    #[test]
    fn tolerance_widens_the_window() {
        let intervals = vec![node_update(0, 600, "master")];
        let candidate = failed_scheduling("openshift-etcd", 605, 700);
        assert_eq!(SuppressionEngine::new(&intervals).suppressed(&candidate), None);
        assert!(
            SuppressionEngine::new(&intervals)
                .with_tolerance(Duration::seconds(5))
                .suppressed(&candidate)
                .is_some()
        );
    }

    #[test]
    fn masks_checks_family_applicability() {
        let intervals = vec![node_update(0, 600, "master")];
        let engine = SuppressionEngine::new(&intervals);
        let candidate = failed_scheduling("openshift-etcd", 60, 120);
        assert!(engine.masks(
            SuppressionFamily::FailedSchedulingDuringControlPlaneUpdate,
            &candidate
        ));
        assert!(!engine.masks(
            SuppressionFamily::TopologyHintsDisabledBeforeDnsReady,
            &candidate
        ));
    }

    #[test]
    fn rule_table_is_keyed_by_family() {
        for rule in SUPPRESSION_RULES {
            assert_eq!(rule_for(rule.family).map(|r| r.family), Some(rule.family));
        }
    }

    #[test]
    fn empty_interval_set_never_masks() {
        let engine = SuppressionEngine::new(&[]);
        assert_eq!(
            engine.suppressed(&failed_scheduling("openshift-etcd", 60, 120)),
            None
        );
    }
}
