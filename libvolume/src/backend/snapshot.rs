//! Cluster state read from a snapshot file.
//!
//! [`SnapshotCluster`] re-reads its file on every query, so edits take
//! effect without a restart and a missing or broken file surfaces as
//! [`VolumeError::CatalogUnavailable`] exactly like an unreachable API.
//!
//! # File format
//!
//! YAML, or JSON when the file name ends in `.json`:
//!
//! ```yaml
//! storage_classes:
//!   - name: gp2
//!     provisioner: kubernetes.io/aws-ebs
//!     reclaim_policy: Delete
//! volume_status:
//!   svc-1:
//!     data: Bound
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::ClusterStatus;
use crate::error::VolumeError;
use crate::types::{StorageClassDescriptor, VolumePhase};

/// Parsed snapshot contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub storage_classes: Vec<StorageClassDescriptor>,
    /// Volume phases keyed by service id, then volume name.
    #[serde(default)]
    pub volume_status: HashMap<String, HashMap<String, VolumePhase>>,
}

impl ClusterSnapshot {
    /// Parse snapshot text. `json` selects the JSON parser, otherwise YAML.
    pub fn parse(text: &str, json: bool) -> Result<Self, VolumeError> {
        if json {
            serde_json::from_str(text).map_err(VolumeError::catalog)
        } else {
            serde_yaml::from_str(text).map_err(VolumeError::catalog)
        }
    }
}

/// A [`ClusterStatus`] backed by a snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotCluster {
    path: PathBuf,
}

impl SnapshotCluster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the snapshot file.
    pub async fn load(&self) -> Result<ClusterSnapshot, VolumeError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            VolumeError::CatalogUnavailable(format!("read {}: {e}", self.path.display()))
        })?;
        let json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let snapshot = ClusterSnapshot::parse(&text, json)?;
        debug!(
            path = %self.path.display(),
            storage_classes = snapshot.storage_classes.len(),
            "cluster snapshot loaded"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl ClusterStatus for SnapshotCluster {
    async fn get_app_volume_status(
        &self,
        service_id: &str,
    ) -> Result<HashMap<String, VolumePhase>, VolumeError> {
        let mut snapshot = self.load().await?;
        Ok(snapshot.volume_status.remove(service_id).unwrap_or_default())
    }

    async fn get_storage_classes(&self) -> Result<Vec<StorageClassDescriptor>, VolumeError> {
        Ok(self.load().await?.storage_classes)
    }
}
