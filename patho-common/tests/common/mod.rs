use chrono::{DateTime, Duration, TimeZone, Utc};
use patho_common::model::{annotations, keys, reasons};
use patho_common::{EvaluationResult, EventRecord, Level, Locator, LocatorKind, Message, Source};
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

#[allow(dead_code)]
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .with(filter)
            .init();
    });
}

#[allow(dead_code)]
pub const TEST_NAME: &str = "events should not repeat";

/// 1997-08-29T04:00:00Z, renders as `04:00:00Z`.
#[allow(dead_code)]
pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(872_827_200, 0).single().unwrap()
}

#[allow(dead_code)]
pub fn minutes(n: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(n)
}

#[allow(dead_code)]
pub fn dupe(namespace: &str, reason: &str, human: &str, count: u64) -> EventRecord {
    EventRecord::repeated_kube_event(namespace, "", reason, human, count, base_time())
}

#[allow(dead_code)]
pub fn event_with_locator(locator: Locator, reason: &str, human: &str) -> EventRecord {
    EventRecord::builder(Source::Unspecified, Level::Info)
        .locator(locator)
        .message(Message::new().reason(reason).human(human))
        .build(base_time(), base_time())
}

/// Control-plane node update spanning one minute either side of the base
/// time.
#[allow(dead_code)]
pub fn control_plane_update() -> EventRecord {
    EventRecord::builder(Source::NodeState, Level::Info)
        .locator(Locator::new(LocatorKind::Node))
        .message(
            Message::new()
                .reason(reasons::NODE_UPDATE)
                .human("config/rendered-master-5ab4 phase/Update roles/control-plane,master reached desired config")
                .annotation(annotations::CONSTRUCTED, "node-lifecycle-constructor")
                .annotation(annotations::PHASE, "Update")
                .annotation(annotations::ROLES, "control-plane,master"),
        )
        .build(minutes(-1), minutes(1))
}

#[allow(dead_code)]
pub fn dns_pod_deleted(pod: &str, from: i64, to: i64) -> EventRecord {
    EventRecord::builder(Source::PodState, Level::Info)
        .locator(
            Locator::new(LocatorKind::Pod)
                .with(keys::NAMESPACE, "openshift-dns")
                .with(keys::POD, pod),
        )
        .message(
            Message::new()
                .reason(reasons::GRACEFUL_DELETE_STARTED)
                .annotation(annotations::CONSTRUCTED, "pod-lifecycle-constructor")
                .annotation(annotations::REASON, "GracefulDelete"),
        )
        .build(minutes(from), minutes(to))
}

#[allow(dead_code)]
pub fn dns_container_ready(pod: &str, from: i64, to: i64) -> EventRecord {
    EventRecord::builder(Source::PodState, Level::Info)
        .locator(
            Locator::new(LocatorKind::Container)
                .with(keys::NAMESPACE, "openshift-dns")
                .with(keys::CONTAINER, "dns")
                .with(keys::POD, pod),
        )
        .message(
            Message::new()
                .reason(reasons::CONTAINER_READY)
                .annotation(annotations::CONSTRUCTED, "pod-lifecycle-constructor")
                .annotation(annotations::REASON, "Ready"),
        )
        .build(minutes(from), minutes(to))
}

#[allow(dead_code)]
pub fn taint_test_window() -> EventRecord {
    EventRecord::builder(Source::E2ETest, Level::Info)
        .locator(Locator::new(LocatorKind::E2ETest).with(
            keys::E2E_TEST,
            "[sig-node] NoExecuteTaintManager Single Pod [Serial] doesn't evict pod with tolerations from tainted nodes",
        ))
        .build(minutes(-10), minutes(10))
}

#[allow(dead_code)]
pub fn topology_hints_disabled(count: u64) -> EventRecord {
    EventRecord::builder(Source::Unspecified, Level::Info)
        .locator(
            Locator::new(LocatorKind::Unspecified)
                .with(keys::NAMESPACE, "openshift-dns")
                .with(keys::SERVICE, "dns-default")
                .with(keys::HMSG, "ade328ddf3"),
        )
        .message(
            Message::new()
                .reason(reasons::TOPOLOGY_AWARE_HINTS_DISABLED)
                .human("Unable to allocate minimum required endpoints to each zone without exceeding overload threshold (5 endpoints, 3 zones), addressType: IPv4")
                .annotation(annotations::REASON, "TopologyAwareHintsDisabled")
                .annotation(annotations::PATHOLOGICAL, "true")
                .annotation(annotations::COUNT, count.to_string()),
        )
        .build(minutes(11), minutes(12))
}

/// Failure payload of the result named for `namespace`.
#[allow(dead_code)]
pub fn failure_for<'a>(results: &'a [EvaluationResult], namespace: &str) -> Option<&'a str> {
    let name = patho_common::result_name(TEST_NAME, namespace);
    results
        .iter()
        .find(|result| result.name == name)
        .and_then(|result| result.failure.as_deref())
}

/// Names of every failing result.
#[allow(dead_code)]
pub fn failing(results: &[EvaluationResult]) -> Vec<&str> {
    results
        .iter()
        .filter(|result| result.is_failure())
        .map(|result| result.name.as_str())
        .collect()
}
