//! Persistence collaborator.
//!
//! The service manager owns the database rows for volumes and mount
//! relations. Managers in this crate validate requests and then hand the
//! resulting intent to a [`ServiceStore`] implementation injected at
//! construction.

use async_trait::async_trait;

use crate::dependency::{DependencyChange, MountRelation};
use crate::error::VolumeError;
use crate::volume::{ServiceVolume, VolumeChange, VolumeUpdate};

/// Storage of service volumes and mount relations.
///
/// "Record not found" conditions are reported as [`VolumeError::NotFound`];
/// failed writes as [`VolumeError::PersistenceFailure`]. Concurrent writes to
/// the same service are not serialized by callers; implementations decide the
/// ordering (last write wins for the in-memory store).
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Volumes owned by the service.
    async fn get_volumes(&self, service_id: &str) -> Result<Vec<ServiceVolume>, VolumeError>;

    /// Mount relations in which the service is the consumer.
    async fn get_dep_volumes(&self, service_id: &str) -> Result<Vec<MountRelation>, VolumeError>;

    /// Add a mount relation, or delete the relations matching a key.
    async fn volume_dependency(&self, change: DependencyChange<'_>) -> Result<(), VolumeError>;

    /// Add a volume, or delete the volume matching a key.
    ///
    /// Deleting a legacy (path-addressed) volume that does not exist is a
    /// no-op; deleting a missing named volume is [`VolumeError::NotFound`].
    async fn volume_var(&self, tenant_id: &str, change: VolumeChange<'_>)
    -> Result<(), VolumeError>;

    /// Replace the mutable fields of an existing volume.
    async fn update_volume(&self, service_id: &str, patch: &VolumeUpdate)
    -> Result<(), VolumeError>;
}
