//! In-memory collaborators.
//!
//! [`MemoryStore`] implements [`ServiceStore`] and [`MemoryCluster`]
//! implements [`ClusterStatus`]. They back the integration tests and let
//! embedders run the managers without a database or a cluster.
//!
//! # Thread safety
//!
//! All state sits behind concurrent maps ([`DashMap`]). Writes to the same
//! service are not ordered beyond what the map provides: last write wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cluster::ClusterStatus;
use crate::dependency::{DependencyChange, DependencyKey, MountRelation};
use crate::error::VolumeError;
use crate::store::ServiceStore;
use crate::types::{StorageClassDescriptor, VolumePhase};
use crate::volume::{ServiceVolume, VolumeChange, VolumeKey, VolumeUpdate};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Volume and mount-relation records held in process memory.
#[derive(Default)]
pub struct MemoryStore {
    /// Volumes keyed by owning service. A present entry, even empty, means
    /// the service is known.
    volumes: DashMap<String, Vec<ServiceVolume>>,
    /// Mount relations keyed by consuming service.
    relations: DashMap<String, Vec<MountRelation>>,
    /// Config-file bodies keyed by volume identity.
    file_contents: DashMap<VolumeKey, String>,
    /// When set, every write fails with [`VolumeError::PersistenceFailure`].
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `service_id` known without giving it any volume.
    pub fn register_service(&self, service_id: &str) {
        self.volumes.entry(service_id.to_owned()).or_default();
    }

    /// Config-file content stored with a volume, if any.
    pub fn file_content(&self, key: &VolumeKey) -> Option<String> {
        self.file_contents.get(key).map(|c| c.clone())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), VolumeError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VolumeError::persistence("store is read-only"));
        }
        Ok(())
    }

    fn add_volume(
        &self,
        volume: &ServiceVolume,
        file_content: Option<&str>,
    ) -> Result<(), VolumeError> {
        let mut volumes = self.volumes.entry(volume.service_id.clone()).or_default();
        if let Some(name) = &volume.volume_name
            && volumes
                .iter()
                .any(|v| v.volume_name.as_deref() == Some(name.as_str()))
        {
            return Err(VolumeError::InvalidInput(format!(
                "volume name {name} already exists in service {}",
                volume.service_id
            )));
        }
        if volumes.iter().any(|v| v.volume_path == volume.volume_path) {
            return Err(VolumeError::InvalidInput(format!(
                "volume path {} already exists in service {}",
                volume.volume_path, volume.service_id
            )));
        }
        volumes.push(volume.clone());
        drop(volumes);

        if let Some(content) = file_content {
            self.file_contents.insert(volume.key(), content.to_owned());
        }
        Ok(())
    }

    fn delete_volume(&self, key: &VolumeKey) -> Result<(), VolumeError> {
        let removed = self
            .volumes
            .get_mut(key.service_id())
            .and_then(|mut volumes| {
                let idx = volumes.iter().position(|v| key.matches(v))?;
                Some(volumes.remove(idx))
            });

        if let Some(volume) = removed {
            self.file_contents.remove(&volume.key());
            return Ok(());
        }
        if key.is_legacy() {
            debug!(%key, "legacy volume not present, nothing to delete");
            return Ok(());
        }
        Err(VolumeError::NotFound(format!("volume {key}")))
    }

    fn add_relation(&self, relation: &MountRelation) -> Result<(), VolumeError> {
        if let Some(name) = &relation.volume_name {
            let source_exists = self
                .volumes
                .get(&relation.depend_service_id)
                .is_some_and(|vols| {
                    vols.iter()
                        .any(|v| v.volume_name.as_deref() == Some(name.as_str()))
                });
            if !source_exists {
                return Err(VolumeError::NotFound(format!(
                    "volume {name} of service {}",
                    relation.depend_service_id
                )));
            }
        }

        let mut relations = self.relations.entry(relation.service_id.clone()).or_default();
        let duplicate = relations.iter().any(|r| {
            r.depend_service_id == relation.depend_service_id
                && r.volume_name == relation.volume_name
                && r.host_path == relation.host_path
        });
        if duplicate {
            return Err(VolumeError::InvalidInput(format!(
                "volume dependency {} already exists",
                relation.key()
            )));
        }
        relations.push(relation.clone());
        drop(relations);

        self.register_service(&relation.service_id);
        Ok(())
    }

    fn delete_relations(&self, key: &DependencyKey) -> Result<(), VolumeError> {
        let removed = match self.relations.get_mut(&key.service_id) {
            Some(mut relations) => {
                let before = relations.len();
                relations.retain(|r| !key.matches(r));
                before - relations.len()
            }
            None => 0,
        };
        if removed == 0 {
            return Err(VolumeError::NotFound(format!("volume dependency {key}")));
        }
        debug!(%key, removed, "volume dependencies removed");
        Ok(())
    }
}

#[async_trait]
impl ServiceStore for MemoryStore {
    async fn get_volumes(&self, service_id: &str) -> Result<Vec<ServiceVolume>, VolumeError> {
        self.volumes
            .get(service_id)
            .map(|v| v.clone())
            .ok_or_else(|| VolumeError::NotFound(format!("service {service_id}")))
    }

    async fn get_dep_volumes(&self, service_id: &str) -> Result<Vec<MountRelation>, VolumeError> {
        Ok(self
            .relations
            .get(service_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn volume_dependency(&self, change: DependencyChange<'_>) -> Result<(), VolumeError> {
        self.check_writable()?;
        debug!(operation = %change.operation(), "volume dependency write");
        match change {
            DependencyChange::Add(relation) => self.add_relation(relation),
            DependencyChange::Delete(key) => self.delete_relations(key),
        }
    }

    async fn volume_var(
        &self,
        tenant_id: &str,
        change: VolumeChange<'_>,
    ) -> Result<(), VolumeError> {
        self.check_writable()?;
        debug!(tenant_id, operation = %change.operation(), "volume write");
        match change {
            VolumeChange::Add {
                volume,
                file_content,
            } => self.add_volume(volume, file_content),
            VolumeChange::Delete(key) => self.delete_volume(key),
        }
    }

    async fn update_volume(
        &self,
        service_id: &str,
        patch: &VolumeUpdate,
    ) -> Result<(), VolumeError> {
        self.check_writable()?;
        let mut volumes = self
            .volumes
            .get_mut(service_id)
            .ok_or_else(|| VolumeError::NotFound(format!("service {service_id}")))?;
        let volume = volumes
            .iter_mut()
            .find(|v| v.volume_name.as_deref() == Some(patch.volume_name.as_str()))
            .ok_or_else(|| {
                VolumeError::NotFound(format!(
                    "volume {} of service {service_id}",
                    patch.volume_name
                ))
            })?;
        volume.apply(patch);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryCluster
// ---------------------------------------------------------------------------

/// A cluster whose storage classes and volume phases are set by the caller.
#[derive(Default)]
pub struct MemoryCluster {
    storage_classes: RwLock<Vec<StorageClassDescriptor>>,
    phases: DashMap<String, HashMap<String, VolumePhase>>,
    unavailable: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage_classes(storage_classes: Vec<StorageClassDescriptor>) -> Self {
        Self {
            storage_classes: RwLock::new(storage_classes),
            ..Default::default()
        }
    }

    pub async fn set_storage_classes(&self, storage_classes: Vec<StorageClassDescriptor>) {
        *self.storage_classes.write().await = storage_classes;
    }

    pub fn set_volume_phase(&self, service_id: &str, volume_name: &str, phase: VolumePhase) {
        self.phases
            .entry(service_id.to_owned())
            .or_default()
            .insert(volume_name.to_owned(), phase);
    }

    /// Simulate an unreachable cluster API.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of storage-class listings served so far.
    pub fn storage_class_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterStatus for MemoryCluster {
    async fn get_app_volume_status(
        &self,
        service_id: &str,
    ) -> Result<HashMap<String, VolumePhase>, VolumeError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VolumeError::catalog("cluster status unavailable"));
        }
        Ok(self
            .phases
            .get(service_id)
            .map(|p| p.clone())
            .unwrap_or_default())
    }

    async fn get_storage_classes(&self) -> Result<Vec<StorageClassDescriptor>, VolumeError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VolumeError::catalog("cluster status unavailable"));
        }
        Ok(self.storage_classes.read().await.clone())
    }
}
