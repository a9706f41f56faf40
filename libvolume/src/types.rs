//! Core types shared by the catalog, the resolver and the record models.
//!
//! Everything here is [`Serialize`]/[`Deserialize`] so that the (external)
//! transport layer can hand the values to callers as-is.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::VolumeError;

/// Volume type backed by the platform's shared file storage. Always available
/// and used as the universal fallback.
pub const SHARE_FILE_VOLUME_TYPE: &str = "share-file";

/// Volume type backed by node-local storage. Always available.
pub const LOCAL_VOLUME_TYPE: &str = "local";

/// Volume type whose content is a configuration file supplied with the request.
pub const CONFIG_FILE_VOLUME_TYPE: &str = "config-file";

/// Returns `true` for the volume types that exist on every cluster and never
/// need a storage-class lookup.
pub fn is_builtin_volume_type(volume_type: &str) -> bool {
    volume_type == SHARE_FILE_VOLUME_TYPE || volume_type == LOCAL_VOLUME_TYPE
}

// ---------------------------------------------------------------------------
// Cluster input
// ---------------------------------------------------------------------------

/// A storage class as reported by the cluster status client.
///
/// The catalog only ever reads these; ownership stays with the cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageClassDescriptor {
    pub name: String,
    pub provisioner: String,
    #[serde(default)]
    pub reclaim_policy: String,
    #[serde(default)]
    pub volume_binding_mode: String,
    #[serde(default)]
    pub allow_volume_expansion: Option<bool>,
    /// Access modes advertised by the class, if any. Many provisioners leave
    /// this empty.
    #[serde(default)]
    pub access_modes: Vec<String>,
    /// Raw backend-specific parameters.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Provider kind
// ---------------------------------------------------------------------------

/// Normalized category of storage backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {
    #[serde(rename = "share-file")]
    ShareFile,
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "aws-ebs")]
    AwsEbs,
    #[serde(rename = "gce-pd")]
    GcePd,
    #[serde(rename = "azure-disk")]
    AzureDisk,
    #[serde(rename = "azure-file")]
    AzureFile,
    #[serde(rename = "ceph-rbd")]
    CephRbd,
    #[serde(rename = "cephfs")]
    CephFs,
    #[serde(rename = "cinder")]
    Cinder,
    #[serde(rename = "alicloud-disk")]
    AliCloudDisk,
    #[serde(rename = "alicloud-nas")]
    AliCloudNas,
    #[serde(rename = "glusterfs")]
    GlusterFs,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 12] = [
        ProviderKind::ShareFile,
        ProviderKind::Local,
        ProviderKind::AwsEbs,
        ProviderKind::GcePd,
        ProviderKind::AzureDisk,
        ProviderKind::AzureFile,
        ProviderKind::CephRbd,
        ProviderKind::CephFs,
        ProviderKind::Cinder,
        ProviderKind::AliCloudDisk,
        ProviderKind::AliCloudNas,
        ProviderKind::GlusterFs,
    ];

    /// The tag used as a volume type by callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ShareFile => SHARE_FILE_VOLUME_TYPE,
            ProviderKind::Local => LOCAL_VOLUME_TYPE,
            ProviderKind::AwsEbs => "aws-ebs",
            ProviderKind::GcePd => "gce-pd",
            ProviderKind::AzureDisk => "azure-disk",
            ProviderKind::AzureFile => "azure-file",
            ProviderKind::CephRbd => "ceph-rbd",
            ProviderKind::CephFs => "cephfs",
            ProviderKind::Cinder => "cinder",
            ProviderKind::AliCloudDisk => "alicloud-disk",
            ProviderKind::AliCloudNas => "alicloud-nas",
            ProviderKind::GlusterFs => "glusterfs",
        }
    }

    /// Network filesystems that can be mounted by many consumers on
    /// different nodes at once. Node-local storage is not one of them.
    pub fn is_shared_filesystem(&self) -> bool {
        matches!(
            self,
            ProviderKind::ShareFile
                | ProviderKind::AzureFile
                | ProviderKind::CephFs
                | ProviderKind::AliCloudNas
                | ProviderKind::GlusterFs
        )
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| VolumeError::InvalidInput(format!("unknown provider kind {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Access mode
// ---------------------------------------------------------------------------

/// Describes how many consumers may mount a volume and with what permissions.
///
/// Serialized as the short upper-case token; the long Kubernetes spelling is
/// accepted on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Single-node read-write.
    #[serde(rename = "RWO", alias = "ReadWriteOnce")]
    ReadWriteOnce,
    /// Multi-node read-only.
    #[serde(rename = "ROX", alias = "ReadOnlyMany")]
    ReadOnlyMany,
    /// Multi-node read-write.
    #[serde(rename = "RWX", alias = "ReadWriteMany")]
    ReadWriteMany,
    /// Single-pod read-write.
    #[serde(rename = "RWOP", alias = "ReadWriteOncePod")]
    ReadWriteOncePod,
}

impl AccessMode {
    /// Parse a token case-insensitively, in either short (`rwx`) or long
    /// (`ReadWriteMany`) form.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "RWO" | "READWRITEONCE" => Some(AccessMode::ReadWriteOnce),
            "ROX" | "READONLYMANY" => Some(AccessMode::ReadOnlyMany),
            "RWX" | "READWRITEMANY" => Some(AccessMode::ReadWriteMany),
            "RWOP" | "READWRITEONCEPOD" => Some(AccessMode::ReadWriteOncePod),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadWriteOnce => "RWO",
            AccessMode::ReadOnlyMany => "ROX",
            AccessMode::ReadWriteMany => "RWX",
            AccessMode::ReadWriteOncePod => "RWOP",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessMode::parse(s)
            .ok_or_else(|| VolumeError::InvalidInput(format!("unknown access mode {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Catalog output
// ---------------------------------------------------------------------------

/// Normalized capabilities of one storage class.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderDetail {
    pub name: String,
    pub provisioner: String,
    pub reclaim_policy: String,
    pub volume_binding_mode: String,
    /// `None` means unknown; the platform default applies.
    pub allow_volume_expansion: Option<bool>,
    pub access_modes: Vec<AccessMode>,
    #[serde(default)]
    pub share_policy: Vec<String>,
    #[serde(default)]
    pub backup_policy: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl ProviderDetail {
    pub fn supports(&self, mode: AccessMode) -> bool {
        self.access_modes.contains(&mode)
    }
}

/// One group of the provider listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeProvider {
    pub kind: ProviderKind,
    pub provisioner: Vec<ProviderDetail>,
}

// ---------------------------------------------------------------------------
// Best-fit selection
// ---------------------------------------------------------------------------

/// A request to check whether a volume type can serve an access mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeBestRequest {
    pub volume_type: String,
    #[serde(default)]
    pub access_mode: String,
}

/// Outcome of best-fit selection.
///
/// When `changed` is `true`, `volume_type` holds the replacement type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeBestDecision {
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

impl VolumeBestDecision {
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            volume_type: None,
        }
    }

    pub fn fallback(volume_type: impl Into<String>) -> Self {
        Self {
            changed: true,
            volume_type: Some(volume_type.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Status and verbs
// ---------------------------------------------------------------------------

/// Claim phase of a volume as reported by the cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VolumePhase {
    Pending,
    Bound,
    Lost,
    Unknown,
}

impl fmt::Display for VolumePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolumePhase::Pending => "Pending",
            VolumePhase::Bound => "Bound",
            VolumePhase::Lost => "Lost",
            VolumePhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Mutation requested from the persistence collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => f.write_str("add"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}
