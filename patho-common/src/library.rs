//! Built-in allow-rules for repeated events.
//!
//! Matchers are grouped into the universal set, applied to every run, and the
//! upgrade set, which adds rules for conditions only expected while the
//! cluster is being upgraded. Probe matchers are used on their own with the
//! probe threshold counter.

use crate::context::Topology;
use crate::errors::Result;
use crate::matcher::{Matcher, PatternSpec};
use crate::model::{keys, reasons};
use crate::suppression::SuppressionFamily;

const E2E_NAMESPACE_PREFIX: &str = "e2e-";

// ============================================================================
// Universal matchers
// ============================================================================

/// Matchers applied to every run, in evaluation order.
pub fn universal_matchers() -> Result<Vec<Matcher>> {
    Ok(vec![
        Matcher::builder("KubeletUnhealthyReadinessProbeFailed")
            .description("e2e pods whose readiness probes are expected to fail")
            .namespace_prefix(E2E_NAMESPACE_PREFIX)
            .reason_exact(reasons::UNHEALTHY)
            .message_regex("Readiness probe failed")
            .build()?,
        Matcher::builder("FailedScheduling")
            .description("e2e pods pinned to nodes that cannot take them")
            .namespace_prefix(E2E_NAMESPACE_PREFIX)
            .reason_exact(reasons::FAILED_SCHEDULING)
            .message_regex("nodes are available: .*didn't match Pod's node affinity/selector")
            .build()?,
        Matcher::builder("E2EImagePullBackOff")
            .description("e2e tests that pull missing images on purpose")
            .namespace_prefix(E2E_NAMESPACE_PREFIX)
            .reason_exact(reasons::BACK_OFF)
            .message_contains("Back-off pulling image")
            .build()?,
        Matcher::builder("AllowBackOffRestartingFailedContainer")
            .namespace_prefix(E2E_NAMESPACE_PREFIX)
            .reason_exact(reasons::BACK_OFF)
            .message_contains("Back-off restarting failed container")
            .build()?,
        Matcher::builder("E2ESecurityContextBreaksNonRootPolicy")
            .namespace_prefix(E2E_NAMESPACE_PREFIX)
            .reason_exact("Failed")
            .message_contains("breaks non-root policy")
            .build()?,
        Matcher::builder("E2EFailedMountOutsidePlatform")
            .description("volume tests mount missing secrets and config maps")
            .reason_exact("FailedMount")
            .message_regex(r#"MountVolume\.SetUp failed for volume ".*" : (secret|configmap) ".*" not found"#)
            .exclude_namespace(PatternSpec::Regex("^openshift($|-)".to_string()))
            .exclude_namespace(PatternSpec::Exact("kube-system".to_string()))
            .build()?,
        Matcher::builder("KubeAPIReadinessProbeError503")
            .description("apiserver reports 503 while it finishes starting")
            .namespace_exact("openshift-kube-apiserver")
            .reason_exact(reasons::PROBE_ERROR)
            .message_regex(r"Readiness probe error: HTTP probe failed with statuscode: 503")
            .build()?,
        Matcher::builder("MarketplaceStartupProbeFailure")
            .namespace_exact("openshift-marketplace")
            .reason_exact(reasons::UNHEALTHY)
            .message_regex("Startup probe failed")
            .build()?,
        node_condition("NodeHasNoDiskPressure")?,
        node_condition("NodeHasSufficientMemory")?,
        node_condition("NodeHasSufficientPID")?,
        Matcher::builder("SingleNodeEtcdOperatorGrpcClientClosing")
            .description("single-replica etcd restarts drop client connections")
            .topology(Topology::SingleReplica)
            .namespace_exact("openshift-etcd-operator")
            .reason_exact("UnhealthyEtcdMember")
            .message_contains("grpc: the client connection is closing")
            .build()?,
        Matcher::builder("SingleNodeTopologyAwareHintsDisabled")
            .topology(Topology::SingleReplica)
            .reason_exact(reasons::TOPOLOGY_AWARE_HINTS_DISABLED)
            .build()?,
        Matcher::builder("TopologyAwareHintsDisabledDuringTaintTest")
            .description("DNS endpoints drop while a taint test evicts DNS pods")
            .namespace_exact("openshift-dns")
            .reason_exact(reasons::TOPOLOGY_AWARE_HINTS_DISABLED)
            .masked_by(SuppressionFamily::TopologyHintsDisabledBeforeDnsReady)
            .build()?,
    ])
}

fn node_condition(reason: &str) -> Result<Matcher> {
    Matcher::builder(reason)
        .locator(keys::NODE, PatternSpec::Regex(".+".to_string()))
        .reason_exact(reason)
        .build()
}

// ============================================================================
// Upgrade matchers
// ============================================================================

/// Universal matchers followed by the upgrade-only ones.
pub fn upgrade_matchers() -> Result<Vec<Matcher>> {
    let mut matchers = universal_matchers()?;
    matchers.push(
        Matcher::builder("FailedSchedulingDuringNodeUpdate")
            .description("platform pods cannot schedule while masters roll")
            .reason_exact(reasons::FAILED_SCHEDULING)
            .namespace(PatternSpec::Regex("^openshift($|-)".to_string()))
            .masked_by(SuppressionFamily::FailedSchedulingDuringControlPlaneUpdate)
            .build()?,
    );
    matchers.push(
        Matcher::builder("KubeAPIServerProgressingDuringSingleNodeUpgrade")
            .topology(Topology::SingleReplica)
            .namespace_exact("openshift-kube-apiserver-operator")
            .reason_exact("OperatorStatusChanged")
            .message_contains("Progressing")
            .build()?,
    );
    Ok(matchers)
}

// ============================================================================
// Probe matchers
// ============================================================================

pub fn probe_error_liveness() -> Result<Matcher> {
    Matcher::builder("ProbeErrorLiveness")
        .reason_exact(reasons::PROBE_ERROR)
        .message_regex(r"Liveness probe error: .*Client\.Timeout exceeded while awaiting headers")
        .build()
}

pub fn probe_error_timeout_awaiting_headers() -> Result<Matcher> {
    Matcher::builder("ProbeErrorTimeoutAwaitingHeaders")
        .reason_exact(reasons::PROBE_ERROR)
        .message_regex(r"Readiness probe error: .*Client\.Timeout exceeded while awaiting headers")
        .build()
}

pub fn probe_error_connection_refused() -> Result<Matcher> {
    Matcher::builder("ProbeErrorConnectionRefused")
        .reason_exact(reasons::PROBE_ERROR)
        .message_regex("Readiness probe error: .*connect: connection refused")
        .build()
}

/// Probe matcher by name, for callers that select one from configuration.
pub fn probe_matcher(name: &str) -> Option<Result<Matcher>> {
    match name {
        "ProbeErrorLiveness" => Some(probe_error_liveness()),
        "ProbeErrorTimeoutAwaitingHeaders" => Some(probe_error_timeout_awaiting_headers()),
        "ProbeErrorConnectionRefused" => Some(probe_error_connection_refused()),
        _ => None,
    }
}

pub const PROBE_MATCHER_NAMES: &[&str] = &[
    "ProbeErrorLiveness",
    "ProbeErrorTimeoutAwaitingHeaders",
    "ProbeErrorConnectionRefused",
];
