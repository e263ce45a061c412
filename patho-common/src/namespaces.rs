//! Known-namespace catalog and result naming.
//!
//! The evaluator emits one result per known namespace. Events from any other
//! namespace, or with no namespace at all, land in the catch-all bucket whose
//! key is the empty string.

use std::collections::BTreeSet;

/// Key of the catch-all bucket.
pub const CATCH_ALL: &str = "";

pub const DNS_NAMESPACE: &str = "openshift-dns";

/// Platform namespaces that get their own result.
pub const PLATFORM_NAMESPACES: &[&str] = &[
    "default",
    "kube-system",
    "openshift",
    "openshift-apiserver",
    "openshift-apiserver-operator",
    "openshift-authentication",
    "openshift-authentication-operator",
    "openshift-cloud-controller-manager",
    "openshift-cloud-controller-manager-operator",
    "openshift-cloud-credential-operator",
    "openshift-cluster-csi-drivers",
    "openshift-cluster-machine-approver",
    "openshift-cluster-node-tuning-operator",
    "openshift-cluster-samples-operator",
    "openshift-cluster-storage-operator",
    "openshift-cluster-version",
    "openshift-config",
    "openshift-config-managed",
    "openshift-config-operator",
    "openshift-console",
    "openshift-console-operator",
    "openshift-controller-manager",
    "openshift-controller-manager-operator",
    "openshift-dns",
    "openshift-dns-operator",
    "openshift-etcd",
    "openshift-etcd-operator",
    "openshift-image-registry",
    "openshift-ingress",
    "openshift-ingress-canary",
    "openshift-ingress-operator",
    "openshift-insights",
    "openshift-kube-apiserver",
    "openshift-kube-apiserver-operator",
    "openshift-kube-controller-manager",
    "openshift-kube-controller-manager-operator",
    "openshift-kube-scheduler",
    "openshift-kube-scheduler-operator",
    "openshift-kube-storage-version-migrator",
    "openshift-kube-storage-version-migrator-operator",
    "openshift-machine-api",
    "openshift-machine-config-operator",
    "openshift-marketplace",
    "openshift-monitoring",
    "openshift-multus",
    "openshift-network-diagnostics",
    "openshift-network-node-identity",
    "openshift-network-operator",
    "openshift-oauth-apiserver",
    "openshift-operator-lifecycle-manager",
    "openshift-ovn-kubernetes",
    "openshift-route-controller-manager",
    "openshift-sdn",
    "openshift-service-ca",
    "openshift-service-ca-operator",
];

/// `openshift` itself or any `openshift-` namespace.
pub fn is_platform_namespace(namespace: &str) -> bool {
    namespace == "openshift" || namespace.starts_with("openshift-")
}

/// Result name for `namespace`: the bare test name for the catch-all bucket.
pub fn result_name(test_name: &str, namespace: &str) -> String {
    if namespace.is_empty() {
        test_name.to_string()
    } else {
        format!("{test_name} for ns/{namespace}")
    }
}

/// Ordered set of namespaces that get a result, always including the
/// catch-all bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownNamespaces {
    names: BTreeSet<String>,
}

impl Default for KnownNamespaces {
    fn default() -> Self {
        let mut names: BTreeSet<String> =
            PLATFORM_NAMESPACES.iter().map(|ns| (*ns).to_string()).collect();
        names.insert(CATCH_ALL.to_string());
        Self { names }
    }
}

impl KnownNamespaces {
    /// Add namespaces on top of the platform catalog. Blank entries are
    /// ignored.
    #[must_use]
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names.extend(
            extra
                .into_iter()
                .map(|ns| ns.as_ref().trim().to_string())
                .filter(|ns| !ns.is_empty()),
        );
        self
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.names.contains(namespace)
    }

    /// Bucket an event namespace falls into.
    pub fn partition_for<'a>(&self, namespace: Option<&'a str>) -> &'a str {
        match namespace {
            Some(ns) if self.contains(ns) => ns,
            _ => CATCH_ALL,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
