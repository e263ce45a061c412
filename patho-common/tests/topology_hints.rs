mod common;

use common::{
    dns_container_ready, dns_pod_deleted, failing, failure_for, init_test_logging,
    taint_test_window, topology_hints_disabled,
};
use patho_common::{
    DuplicateEvaluator, EventRecord, JobKind, RegistryContext, SuppressionEngine,
    SuppressionFamily, build_registry,
};
use std::sync::Arc;

const HINTS: &str = "Unable to allocate minimum required endpoints to each zone without exceeding overload threshold (5 endpoints, 3 zones), addressType: IPv4";

fn evaluate(events: Vec<EventRecord>) -> Vec<patho_common::EvaluationResult> {
    let events: Arc<[EventRecord]> = events.into();
    let registry =
        build_registry(&RegistryContext::new(JobKind::General), Some(events.clone())).unwrap();
    DuplicateEvaluator::new(&registry).evaluate(common::TEST_NAME, &events, None, None)
}

#[test]
fn test_hints_disabled_ignored_before_dns_container_ready() {
    init_test_logging();
    let events = vec![
        taint_test_window(),
        dns_pod_deleted("dns-default-jq2qn", -5, 1),
        topology_hints_disabled(23),
        dns_container_ready("dns-default-jq2qn", 15, 16),
    ];

    let results = evaluate(events.clone());
    assert!(failing(&results).is_empty(), "{:?}", failing(&results));

    let engine = SuppressionEngine::new(&events);
    assert_eq!(
        engine.suppressed(&events[2]),
        Some(SuppressionFamily::TopologyHintsDisabledBeforeDnsReady)
    );
}

#[test]
fn test_hints_disabled_fires_without_dns_container_ready() {
    init_test_logging();
    let results = evaluate(vec![
        taint_test_window(),
        dns_pod_deleted("dns-default-jq2qn", -5, 1),
        topology_hints_disabled(23),
    ]);

    assert_eq!(
        failure_for(&results, "openshift-dns"),
        Some(
            format!(
                "1 events happened too frequently\n\nevent happened 23 times, something is wrong:  - reason/TopologyAwareHintsDisabled {HINTS} From: 04:11:00Z To: 04:12:00Z result=reject "
            )
            .as_str()
        )
    );
}

#[test]
fn test_ready_container_of_another_pod_does_not_mask() {
    init_test_logging();
    let results = evaluate(vec![
        dns_pod_deleted("dns-default-jq2qn", -5, 1),
        topology_hints_disabled(23),
        dns_container_ready("dns-default-other", 15, 16),
    ]);
    assert!(failure_for(&results, "openshift-dns").is_some());
}

#[test]
fn test_ready_before_event_end_does_not_mask() {
    init_test_logging();
    let results = evaluate(vec![
        dns_pod_deleted("dns-default-jq2qn", -5, 1),
        topology_hints_disabled(23),
        dns_container_ready("dns-default-jq2qn", 2, 3),
    ]);
    assert!(failure_for(&results, "openshift-dns").is_some());
}

#[test]
fn test_deletion_after_event_start_does_not_mask() {
    init_test_logging();
    let results = evaluate(vec![
        dns_pod_deleted("dns-default-jq2qn", 12, 13),
        topology_hints_disabled(23),
        dns_container_ready("dns-default-jq2qn", 15, 16),
    ]);
    assert!(failure_for(&results, "openshift-dns").is_some());
}

#[test]
fn test_ready_exactly_at_event_end_masks() {
    init_test_logging();
    let results = evaluate(vec![
        dns_pod_deleted("dns-default-jq2qn", -5, 1),
        topology_hints_disabled(23),
        dns_container_ready("dns-default-jq2qn", 12, 13),
    ]);
    assert!(failing(&results).is_empty());
}
