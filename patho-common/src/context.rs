//! Ambient cluster context supplied alongside the interval set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cluster redundancy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    HighlyAvailable,
    SingleReplica,
    DualReplica,
    External,
}

impl Topology {
    /// Name as it appears in cluster status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighlyAvailable => "HighlyAvailable",
            Self::SingleReplica => "SingleReplica",
            Self::DualReplica => "DualReplica",
            Self::External => "External",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "highlyavailable" | "ha" => Ok(Self::HighlyAvailable),
            "singlereplica" | "sno" => Ok(Self::SingleReplica),
            "dualreplica" => Ok(Self::DualReplica),
            "external" => Ok(Self::External),
            _ => Err(format!("unknown topology '{s}'")),
        }
    }
}

/// Infrastructure platform the cluster runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Aws,
    Azure,
    Gcp,
    BareMetal,
    VSphere,
    OpenStack,
    Ovirt,
    Nutanix,
    Ibm,
    None,
}

impl Platform {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Azure => "Azure",
            Self::Gcp => "GCP",
            Self::BareMetal => "BareMetal",
            Self::VSphere => "VSphere",
            Self::OpenStack => "OpenStack",
            Self::Ovirt => "oVirt",
            Self::Nutanix => "Nutanix",
            Self::Ibm => "IBMCloud",
            Self::None => "None",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "aws" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            "gcp" => Ok(Self::Gcp),
            "baremetal" | "metal" => Ok(Self::BareMetal),
            "vsphere" => Ok(Self::VSphere),
            "openstack" => Ok(Self::OpenStack),
            "ovirt" => Ok(Self::Ovirt),
            "nutanix" => Ok(Self::Nutanix),
            "ibm" | "ibmcloud" => Ok(Self::Ibm),
            "none" => Ok(Self::None),
            _ => Err(format!("unknown platform '{s}'")),
        }
    }
}

/// Which family of allow-rules applies to a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    #[default]
    General,
    Upgrade,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str("general"),
            Self::Upgrade => f.write_str("upgrade"),
        }
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "conformance" => Ok(Self::General),
            "upgrade" => Ok(Self::Upgrade),
            _ => Err(format!("unknown job kind '{s}'")),
        }
    }
}
