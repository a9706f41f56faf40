//! Cluster status collaborator.
//!
//! The cluster status client owns the connection to the orchestrator. This
//! crate only consumes two of its queries.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::VolumeError;
use crate::types::{StorageClassDescriptor, VolumePhase};

/// Read-only view of cluster state used for provider resolution and volume
/// status reporting.
#[async_trait]
pub trait ClusterStatus: Send + Sync {
    /// Claim phase of each volume of a service, keyed by volume name.
    ///
    /// Callers treat failures as "no status yet".
    async fn get_app_volume_status(
        &self,
        service_id: &str,
    ) -> Result<HashMap<String, VolumePhase>, VolumeError>;

    /// Current storage-class snapshot.
    ///
    /// Implementations report failures as [`VolumeError::CatalogUnavailable`].
    async fn get_storage_classes(&self) -> Result<Vec<StorageClassDescriptor>, VolumeError>;
}
