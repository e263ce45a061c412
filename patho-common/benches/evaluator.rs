//! Benchmarks for duplicate evaluation over realistic interval sets.
//!
//! A CI run records a few thousand repeated events; evaluating them should
//! stay well under a millisecond per hundred events.

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use patho_common::library::probe_error_connection_refused;
use patho_common::{
    DuplicateEvaluator, EventRecord, JobKind, RegistryContext, Topology, build_registry,
    count_threshold_crossings,
};
use std::hint::black_box;
use std::sync::Arc;

const NAMESPACES: &[&str] = &[
    "openshift-etcd",
    "openshift-dns",
    "openshift-oauth-apiserver",
    "openshift-controller-manager",
    "e2e-test-pods-1234",
    "",
];

const REASONS: &[(&str, &str)] = &[
    ("FailedScheduling", "0/6 nodes are available: 2 node(s) were unschedulable"),
    ("BackOff", "Back-off restarting failed container"),
    ("Unhealthy", "Readiness probe failed: HTTP probe failed with statuscode: 500"),
    (
        "ProbeError",
        "Readiness probe error: Get \"https://10.128.0.38:8443/readyz\": dial tcp 10.128.0.38:8443: connect: connection refused",
    ),
    ("SomeEvent1", "foo"),
];

fn generate(count: usize) -> Vec<EventRecord> {
    let base = Utc.timestamp_opt(872_827_200, 0).single().unwrap();
    (0..count)
        .map(|i| {
            let namespace = NAMESPACES[i % NAMESPACES.len()];
            let (reason, human) = REASONS[i % REASONS.len()];
            let pod = format!("pod-{}", i % 17);
            let repeat = (i % 40) as u64;
            let at = base + Duration::seconds(i as i64);
            EventRecord::repeated_kube_event(namespace, &pod, reason, human, repeat, at)
        })
        .collect()
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for size in [100usize, 1_000, 5_000] {
        let events: Arc<[EventRecord]> = generate(size).into();
        for job in [JobKind::General, JobKind::Upgrade] {
            let registry =
                build_registry(&RegistryContext::new(job), Some(events.clone())).unwrap();
            let evaluator = DuplicateEvaluator::new(&registry);
            group.bench_with_input(
                BenchmarkId::new(job.to_string(), size),
                &events,
                |b, events| {
                    b.iter(|| {
                        evaluator.evaluate(
                            black_box("events should not repeat"),
                            black_box(events),
                            Some(Topology::HighlyAvailable),
                            None,
                        )
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_registry_lookup(c: &mut Criterion) {
    let registry = build_registry(&RegistryContext::new(JobKind::Upgrade), None).unwrap();
    let events = generate(REASONS.len() * NAMESPACES.len());

    c.bench_function("matches_any", |b| {
        b.iter(|| {
            for event in &events {
                black_box(registry.matches_any(black_box(event), Some(Topology::SingleReplica)));
            }
        })
    });
}

fn bench_probe_crossings(c: &mut Criterion) {
    let matcher = probe_error_connection_refused().unwrap();
    let events = generate(1_000);

    c.bench_function("count_threshold_crossings", |b| {
        b.iter(|| {
            count_threshold_crossings(
                black_box("probe errors"),
                black_box(&events),
                "openshift-oauth-apiserver",
                &matcher,
                20,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_evaluate,
    bench_registry_lookup,
    bench_probe_crossings
);
criterion_main!(benches);
