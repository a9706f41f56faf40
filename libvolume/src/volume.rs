//! Volume record model.
//!
//! A service's own volumes exist in two schema generations:
//!
//! - **legacy**: addressed by mount path and category, always backed by
//!   shared file storage, optionally carrying a host path;
//! - **current**: addressed by a volume name unique within the service, with
//!   a free-form volume type resolved against the cluster's providers.
//!
//! Both are stored as a single [`ServiceVolume`] entity. Request payloads
//! arrive as [`VolumeRequest`] variants and cross into the entity through
//! [`VolumeRequest::into_parts`], which is where validation happens.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cluster::ClusterStatus;
use crate::dependency::MountRelation;
use crate::error::VolumeError;
use crate::store::ServiceStore;
use crate::types::{
    AccessMode, CONFIG_FILE_VOLUME_TYPE, Operation, SHARE_FILE_VOLUME_TYPE,
};

// ---------------------------------------------------------------------------
// Mount path
// ---------------------------------------------------------------------------

/// An absolute path inside a service's container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MountPath(String);

impl MountPath {
    /// Validate `path`; it must begin with `/`.
    pub fn new(path: impl Into<String>) -> Result<Self, VolumeError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(VolumeError::InvalidInput(format!(
                "volume path {path:?} is invalid, must begin with /"
            )));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MountPath {
    type Error = VolumeError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<MountPath> for String {
    fn from(path: MountPath) -> Self {
        path.0
    }
}

impl fmt::Display for MountPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Identity of a volume within its service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum VolumeKey {
    /// Current schema: the volume name is unique per service.
    Named {
        service_id: String,
        volume_name: String,
    },
    /// Legacy schema: mount path plus category.
    Path {
        service_id: String,
        volume_path: String,
        category: String,
    },
}

impl VolumeKey {
    pub fn named(service_id: impl Into<String>, volume_name: impl Into<String>) -> Self {
        Self::Named {
            service_id: service_id.into(),
            volume_name: volume_name.into(),
        }
    }

    pub fn path(
        service_id: impl Into<String>,
        volume_path: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self::Path {
            service_id: service_id.into(),
            volume_path: volume_path.into(),
            category: category.into(),
        }
    }

    pub fn service_id(&self) -> &str {
        match self {
            Self::Named { service_id, .. } | Self::Path { service_id, .. } => service_id,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Path { .. })
    }

    /// Whether `volume` is addressed by this key.
    ///
    /// A path key matches on mount path and category, so it also reaches
    /// volumes that were created with a name.
    pub fn matches(&self, volume: &ServiceVolume) -> bool {
        match self {
            Self::Named {
                service_id,
                volume_name,
            } => {
                volume.service_id == *service_id
                    && volume.volume_name.as_deref() == Some(volume_name.as_str())
            }
            Self::Path {
                service_id,
                volume_path,
                category,
            } => {
                volume.service_id == *service_id
                    && volume.volume_path.as_str() == volume_path
                    && volume.category == *category
            }
        }
    }
}

impl fmt::Display for VolumeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named {
                service_id,
                volume_name,
            } => write!(f, "{service_id}/{volume_name}"),
            Self::Path {
                service_id,
                volume_path,
                category,
            } => write!(f, "{service_id}:{volume_path} ({category})"),
        }
    }
}

/// A volume attached to a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceVolume {
    pub service_id: String,
    /// Absent for legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    pub volume_path: MountPath,
    /// Legacy records may pin the data to a host directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_path: Option<String>,
    pub volume_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub volume_provider_name: String,
    #[serde(default)]
    pub is_read_only: bool,
    /// Capacity in GiB; `0` means unbounded.
    #[serde(default)]
    pub volume_capacity: u64,
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
    #[serde(default)]
    pub share_policy: String,
    #[serde(default)]
    pub backup_policy: String,
    #[serde(default)]
    pub reclaim_policy: String,
    #[serde(default)]
    pub allow_expansion: bool,
}

impl ServiceVolume {
    pub fn key(&self) -> VolumeKey {
        match &self.volume_name {
            Some(name) => VolumeKey::named(&self.service_id, name),
            None => VolumeKey::path(&self.service_id, self.volume_path.as_str(), &self.category),
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.volume_name.is_none()
    }

    /// Overwrite the mutable fields present in `patch`. Identity is kept.
    pub fn apply(&mut self, patch: &VolumeUpdate) {
        if let Some(capacity) = patch.volume_capacity {
            self.volume_capacity = capacity;
        }
        if let Some(mode) = patch.access_mode {
            self.access_mode = Some(mode);
        }
        if let Some(policy) = &patch.share_policy {
            self.share_policy = policy.clone();
        }
        if let Some(policy) = &patch.backup_policy {
            self.backup_policy = policy.clone();
        }
        if let Some(policy) = &patch.reclaim_policy {
            self.reclaim_policy = policy.clone();
        }
        if let Some(allow) = patch.allow_expansion {
            self.allow_expansion = allow;
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

fn default_volume_type() -> String {
    SHARE_FILE_VOLUME_TYPE.to_owned()
}

/// Current-schema add-volume payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeBody {
    pub volume_name: String,
    pub volume_path: String,
    #[serde(default = "default_volume_type")]
    pub volume_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub volume_provider_name: String,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub volume_capacity: u64,
    #[serde(default)]
    pub access_mode: String,
    #[serde(default)]
    pub share_policy: String,
    #[serde(default)]
    pub backup_policy: String,
    #[serde(default)]
    pub reclaim_policy: String,
    #[serde(default)]
    pub allow_expansion: bool,
    /// Body of a config-file volume.
    #[serde(default)]
    pub file_content: Option<String>,
}

/// Legacy add-volume payload. The volume type is always shared file storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyVolumeBody {
    pub volume_path: String,
    #[serde(default)]
    pub host_path: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub volume_capacity: u64,
    #[serde(default)]
    pub volume_provider_name: String,
    #[serde(default)]
    pub access_mode: String,
    #[serde(default)]
    pub share_policy: String,
    #[serde(default)]
    pub backup_policy: String,
    #[serde(default)]
    pub reclaim_policy: String,
}

/// Legacy delete-volume payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyDeleteVolumeBody {
    pub volume_path: String,
    #[serde(default)]
    pub category: String,
}

impl LegacyDeleteVolumeBody {
    pub fn into_key(self, service_id: &str) -> VolumeKey {
        VolumeKey::path(service_id, self.volume_path, self.category)
    }
}

/// An add-volume request in either schema generation.
#[derive(Debug, Clone)]
pub enum VolumeRequest {
    Legacy(LegacyVolumeBody),
    Current(VolumeBody),
}

fn parse_access_mode(token: &str) -> Result<Option<AccessMode>, VolumeError> {
    if token.trim().is_empty() {
        return Ok(None);
    }
    token.parse().map(Some)
}

impl VolumeRequest {
    pub fn current_from_json(body: &str) -> Result<Self, VolumeError> {
        Ok(Self::Current(serde_json::from_str(body)?))
    }

    pub fn legacy_from_json(body: &str) -> Result<Self, VolumeError> {
        Ok(Self::Legacy(serde_json::from_str(body)?))
    }

    /// Validate the payload and build the entity for `service_id`, along with
    /// the config-file content to persist next to it.
    pub fn into_parts(
        self,
        service_id: &str,
    ) -> Result<(ServiceVolume, Option<String>), VolumeError> {
        match self {
            Self::Legacy(body) => {
                let volume = ServiceVolume {
                    service_id: service_id.to_owned(),
                    volume_name: None,
                    volume_path: MountPath::new(body.volume_path)?,
                    host_path: Some(body.host_path).filter(|p| !p.is_empty()),
                    volume_type: SHARE_FILE_VOLUME_TYPE.to_owned(),
                    category: body.category,
                    volume_provider_name: body.volume_provider_name,
                    is_read_only: false,
                    volume_capacity: body.volume_capacity,
                    access_mode: parse_access_mode(&body.access_mode)?,
                    share_policy: body.share_policy,
                    backup_policy: body.backup_policy,
                    reclaim_policy: body.reclaim_policy,
                    allow_expansion: false,
                };
                Ok((volume, None))
            }
            Self::Current(body) => {
                let volume_path = MountPath::new(body.volume_path)?;
                let volume_name = body.volume_name.trim();
                if volume_name.is_empty() {
                    return Err(VolumeError::invalid("volume_name is required"));
                }
                let volume_type = body.volume_type.trim();
                if volume_type.is_empty() {
                    return Err(VolumeError::invalid("volume_type is required"));
                }
                let file_content = body.file_content.filter(|c| !c.is_empty());
                if volume_type == CONFIG_FILE_VOLUME_TYPE && file_content.is_none() {
                    return Err(VolumeError::invalid(
                        "config-file volumes require file_content",
                    ));
                }
                let volume = ServiceVolume {
                    service_id: service_id.to_owned(),
                    volume_name: Some(volume_name.to_owned()),
                    volume_path,
                    host_path: None,
                    volume_type: volume_type.to_owned(),
                    category: body.category,
                    volume_provider_name: body.volume_provider_name,
                    is_read_only: body.is_read_only,
                    volume_capacity: body.volume_capacity,
                    access_mode: parse_access_mode(&body.access_mode)?,
                    share_policy: body.share_policy,
                    backup_policy: body.backup_policy,
                    reclaim_policy: body.reclaim_policy,
                    allow_expansion: body.allow_expansion,
                };
                Ok((volume, file_content))
            }
        }
    }
}

/// Replacement values for the mutable fields of a named volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeUpdate {
    pub volume_name: String,
    #[serde(default)]
    pub volume_capacity: Option<u64>,
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
    #[serde(default)]
    pub share_policy: Option<String>,
    #[serde(default)]
    pub backup_policy: Option<String>,
    #[serde(default)]
    pub reclaim_policy: Option<String>,
    #[serde(default)]
    pub allow_expansion: Option<bool>,
}

impl VolumeUpdate {
    pub fn from_json(body: &str) -> Result<Self, VolumeError> {
        let update: Self = serde_json::from_str(body)?;
        update.validate()?;
        Ok(update)
    }

    pub fn validate(&self) -> Result<(), VolumeError> {
        if self.volume_name.trim().is_empty() {
            return Err(VolumeError::invalid("volume_name is required"));
        }
        let empty = self.volume_capacity.is_none()
            && self.access_mode.is_none()
            && self.share_policy.is_none()
            && self.backup_policy.is_none()
            && self.reclaim_policy.is_none()
            && self.allow_expansion.is_none();
        if empty {
            return Err(VolumeError::invalid("update carries no changes"));
        }
        Ok(())
    }
}

/// A volume mutation handed to the [`ServiceStore`].
#[derive(Debug, Clone, Copy)]
pub enum VolumeChange<'a> {
    Add {
        volume: &'a ServiceVolume,
        file_content: Option<&'a str>,
    },
    Delete(&'a VolumeKey),
}

impl VolumeChange<'_> {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Add { .. } => Operation::Add,
            Self::Delete(_) => Operation::Delete,
        }
    }
}

// ---------------------------------------------------------------------------
// Read projections
// ---------------------------------------------------------------------------

/// Where a volume visible to a service comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VolumeOrigin {
    Own,
    Dependency { depend_service_id: String },
}

/// A volume as seen from a consuming service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedVolume {
    pub volume: ServiceVolume,
    pub origin: VolumeOrigin,
}

/// Claim phases of a service's named volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStatusReport {
    pub status: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Validates volume requests and forwards them to the store.
pub struct VolumeManager<S, C> {
    store: Arc<S>,
    cluster: Arc<C>,
}

impl<S: ServiceStore, C: ClusterStatus> VolumeManager<S, C> {
    pub fn new(store: Arc<S>, cluster: Arc<C>) -> Self {
        Self { store, cluster }
    }

    /// Validate and persist a new volume. Returns the stored entity.
    ///
    /// Nothing reaches the store when validation fails.
    #[instrument(skip(self, request))]
    pub async fn add_volume(
        &self,
        tenant_id: &str,
        service_id: &str,
        request: VolumeRequest,
    ) -> Result<ServiceVolume, VolumeError> {
        let (volume, file_content) = request.into_parts(service_id)?;
        self.store
            .volume_var(
                tenant_id,
                VolumeChange::Add {
                    volume: &volume,
                    file_content: file_content.as_deref(),
                },
            )
            .await?;
        info!(key = %volume.key(), volume_type = %volume.volume_type, "volume added");
        Ok(volume)
    }

    /// Replace the mutable fields of a named volume.
    ///
    /// The caller re-reads the volume to observe the result.
    #[instrument(skip(self, patch), fields(volume_name = %patch.volume_name))]
    pub async fn update_volume(
        &self,
        service_id: &str,
        patch: &VolumeUpdate,
    ) -> Result<(), VolumeError> {
        patch.validate()?;
        let volumes = self.store.get_volumes(service_id).await?;
        let exists = volumes
            .iter()
            .any(|v| v.volume_name.as_deref() == Some(patch.volume_name.as_str()));
        if !exists {
            return Err(VolumeError::NotFound(format!(
                "volume {} of service {service_id}",
                patch.volume_name
            )));
        }
        self.store.update_volume(service_id, patch).await?;
        info!(%service_id, "volume updated");
        Ok(())
    }

    /// Delete a volume by its identity.
    ///
    /// A missing legacy volume is not an error. For named volumes every store
    /// error, including [`VolumeError::NotFound`], is returned.
    #[instrument(skip(self))]
    pub async fn delete_volume(&self, tenant_id: &str, key: &VolumeKey) -> Result<(), VolumeError> {
        match self.store.volume_var(tenant_id, VolumeChange::Delete(key)).await {
            Ok(()) => {
                info!(%key, "volume deleted");
                Ok(())
            }
            Err(e) if key.is_legacy() && e.is_not_found() => {
                debug!(%key, "legacy volume already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The service's own volumes followed by the volumes it mounts from
    /// other services.
    ///
    /// Dependency volumes report the mount path inside the consuming service.
    /// Relations whose source volume cannot be found are skipped.
    #[instrument(skip(self))]
    pub async fn get_volumes(&self, service_id: &str) -> Result<Vec<AttachedVolume>, VolumeError> {
        let own = self.store.get_volumes(service_id).await?;
        let relations = self.store.get_dep_volumes(service_id).await?;

        let mut attached: Vec<AttachedVolume> = own
            .into_iter()
            .map(|volume| AttachedVolume {
                volume,
                origin: VolumeOrigin::Own,
            })
            .collect();

        let mut sources: HashMap<String, Vec<ServiceVolume>> = HashMap::new();
        for relation in relations {
            if !sources.contains_key(&relation.depend_service_id) {
                let volumes = match self.store.get_volumes(&relation.depend_service_id).await {
                    Ok(v) => v,
                    Err(e) if e.is_not_found() => Vec::new(),
                    Err(e) => return Err(e),
                };
                sources.insert(relation.depend_service_id.clone(), volumes);
            }
            let candidates = sources
                .get(&relation.depend_service_id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            match resolve_relation(&relation, candidates) {
                Some(volume) => attached.push(AttachedVolume {
                    volume,
                    origin: VolumeOrigin::Dependency {
                        depend_service_id: relation.depend_service_id.clone(),
                    },
                }),
                None => warn!(
                    depend_service_id = %relation.depend_service_id,
                    volume_name = ?relation.volume_name,
                    "dependency source volume not found, skipping"
                ),
            }
        }

        Ok(attached)
    }

    /// Mount relations in which the service is the consumer.
    #[instrument(skip(self))]
    pub async fn get_dep_volumes(
        &self,
        service_id: &str,
    ) -> Result<Vec<MountRelation>, VolumeError> {
        self.store.get_dep_volumes(service_id).await
    }

    /// Claim phase of each named volume of the service.
    ///
    /// A service without volume records yields an empty report, and so does
    /// a failing cluster status query.
    #[instrument(skip(self))]
    pub async fn get_volumes_status(
        &self,
        service_id: &str,
    ) -> Result<VolumeStatusReport, VolumeError> {
        let volumes = match self.store.get_volumes(service_id).await {
            Ok(v) => v,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        let phases = match self.cluster.get_app_volume_status(service_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(%service_id, error = %e, "get volume status error");
                return Ok(VolumeStatusReport::default());
            }
        };

        let status = volumes
            .iter()
            .filter_map(|v| v.volume_name.as_ref())
            .filter_map(|name| phases.get(name).map(|phase| (name.clone(), phase.to_string())))
            .collect();
        Ok(VolumeStatusReport { status })
    }
}

/// Find the source volume of a relation and project it into the consumer.
fn resolve_relation(
    relation: &MountRelation,
    candidates: &[ServiceVolume],
) -> Option<ServiceVolume> {
    let source = match (&relation.volume_name, &relation.host_path) {
        (Some(name), _) => candidates
            .iter()
            .find(|v| v.volume_name.as_deref() == Some(name.as_str())),
        (None, Some(host_path)) => candidates.iter().find(|v| {
            v.host_path.as_deref() == Some(host_path.as_str())
                || v.volume_path.as_str() == host_path
        }),
        (None, None) => None,
    }?;

    let mut volume = source.clone();
    if let Some(path) = relation
        .volume_path
        .as_ref()
        .and_then(|p| MountPath::new(p.as_str()).ok())
    {
        volume.volume_path = path;
    }
    Some(volume)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str, path: &str) -> VolumeBody {
        VolumeBody {
            volume_name: name.to_owned(),
            volume_path: path.to_owned(),
            volume_type: "aws-ebs".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn mount_path_must_be_absolute() {
        assert!(MountPath::new("/data").is_ok());
        assert!(matches!(
            MountPath::new("data"),
            Err(VolumeError::InvalidInput(_))
        ));
        assert!(MountPath::new("").is_err());
    }

    #[test]
    fn mount_path_deserialization_validates() {
        assert!(serde_json::from_str::<MountPath>("\"/var/lib\"").is_ok());
        assert!(serde_json::from_str::<MountPath>("\"var/lib\"").is_err());
    }

    #[test]
    fn current_request_builds_named_volume() {
        let mut b = body("data", "/data");
        b.access_mode = "rwo".into();
        let (volume, content) = VolumeRequest::Current(b).into_parts("svc").unwrap();
        assert_eq!(volume.key(), VolumeKey::named("svc", "data"));
        assert_eq!(volume.access_mode, Some(AccessMode::ReadWriteOnce));
        assert_eq!(volume.volume_type, "aws-ebs");
        assert!(content.is_none());
    }

    #[test]
    fn legacy_request_forces_share_file_and_path_identity() {
        let req = VolumeRequest::Legacy(LegacyVolumeBody {
            volume_path: "/logs".into(),
            host_path: "/grdata/logs".into(),
            category: "app".into(),
            ..Default::default()
        });
        let (volume, _) = req.into_parts("svc").unwrap();
        assert_eq!(volume.volume_type, "share-file");
        assert!(volume.is_legacy());
        assert_eq!(volume.key(), VolumeKey::path("svc", "/logs", "app"));
        assert_eq!(volume.host_path.as_deref(), Some("/grdata/logs"));
    }

    #[test]
    fn relative_path_is_rejected_in_both_schemas() {
        let err = VolumeRequest::Current(body("data", "data"))
            .into_parts("svc")
            .unwrap_err();
        assert!(matches!(err, VolumeError::InvalidInput(_)));

        let err = VolumeRequest::Legacy(LegacyVolumeBody {
            volume_path: "logs".into(),
            ..Default::default()
        })
        .into_parts("svc")
        .unwrap_err();
        assert!(matches!(err, VolumeError::InvalidInput(_)));
    }

    #[test]
    fn current_request_requires_name_and_valid_mode() {
        assert!(
            VolumeRequest::Current(body(" ", "/data"))
                .into_parts("svc")
                .is_err()
        );
        let mut b = body("data", "/data");
        b.access_mode = "sometimes".into();
        assert!(VolumeRequest::Current(b).into_parts("svc").is_err());
    }

    #[test]
    fn config_file_requires_content() {
        let mut b = body("conf", "/etc/app.conf");
        b.volume_type = "config-file".into();
        assert!(VolumeRequest::Current(b.clone()).into_parts("svc").is_err());

        b.file_content = Some("key=value".into());
        let (_, content) = VolumeRequest::Current(b).into_parts("svc").unwrap();
        assert_eq!(content.as_deref(), Some("key=value"));
    }

    #[test]
    fn request_from_json() {
        let req = VolumeRequest::current_from_json(
            r#"{"volume_name":"data","volume_path":"/data","volume_capacity":10}"#,
        )
        .unwrap();
        let (volume, _) = req.into_parts("svc").unwrap();
        assert_eq!(volume.volume_type, "share-file");
        assert_eq!(volume.volume_capacity, 10);

        let err = VolumeRequest::current_from_json(r#"{"volume_name":"data"}"#).unwrap_err();
        assert!(matches!(err, VolumeError::InvalidInput(_)));
        let err = VolumeRequest::legacy_from_json(r#"{"volume_path":"/x","volume_capacity":-1}"#)
            .unwrap_err();
        assert!(matches!(err, VolumeError::InvalidInput(_)));
    }

    #[test]
    fn update_validation() {
        assert!(VolumeUpdate::from_json(r#"{"volume_name":"data"}"#).is_err());
        assert!(VolumeUpdate::from_json(r#"{"volume_name":"","volume_capacity":5}"#).is_err());
        let update =
            VolumeUpdate::from_json(r#"{"volume_name":"data","access_mode":"RWX"}"#).unwrap();
        assert_eq!(update.access_mode, Some(AccessMode::ReadWriteMany));
    }

    #[test]
    fn apply_keeps_identity() {
        let (mut volume, _) = VolumeRequest::Current(body("data", "/data"))
            .into_parts("svc")
            .unwrap();
        let key = volume.key();
        volume.apply(&VolumeUpdate {
            volume_name: "data".into(),
            volume_capacity: Some(20),
            reclaim_policy: Some("Retain".into()),
            ..Default::default()
        });
        assert_eq!(volume.key(), key);
        assert_eq!(volume.volume_capacity, 20);
        assert_eq!(volume.reclaim_policy, "Retain");
        assert_eq!(volume.volume_path.as_str(), "/data");
    }

    #[test]
    fn path_key_matches_named_volumes_too() {
        let mut b = body("data", "/data");
        b.category = "app".into();
        let (volume, _) = VolumeRequest::Current(b).into_parts("svc").unwrap();

        assert!(VolumeKey::path("svc", "/data", "app").matches(&volume));
        assert!(VolumeKey::named("svc", "data").matches(&volume));
        assert!(!VolumeKey::path("svc", "/data", "").matches(&volume));
        assert!(!VolumeKey::path("other", "/data", "app").matches(&volume));
        assert!(!VolumeKey::named("svc", "logs").matches(&volume));
    }

    #[test]
    fn change_reports_its_operation() {
        let (volume, _) = VolumeRequest::Current(body("data", "/data"))
            .into_parts("svc")
            .unwrap();
        let add = VolumeChange::Add {
            volume: &volume,
            file_content: None,
        };
        assert_eq!(add.operation(), Operation::Add);
        let key = volume.key();
        assert_eq!(VolumeChange::Delete(&key).operation(), Operation::Delete);
        assert_eq!(Operation::Delete.to_string(), "delete");
    }

    #[test]
    fn relation_resolution_prefers_volume_name() {
        let (source, _) = VolumeRequest::Current(body("shared", "/shared"))
            .into_parts("db")
            .unwrap();
        let relation = MountRelation {
            tenant_id: "t".into(),
            service_id: "web".into(),
            depend_service_id: "db".into(),
            volume_name: Some("shared".into()),
            volume_path: Some("/mnt/shared".into()),
            host_path: None,
            volume_type: None,
        };
        let resolved = resolve_relation(&relation, &[source]).unwrap();
        assert_eq!(resolved.volume_path.as_str(), "/mnt/shared");
        assert_eq!(resolved.service_id, "db");
    }

    #[test]
    fn legacy_relation_resolves_by_host_path() {
        let (source, _) = VolumeRequest::Legacy(LegacyVolumeBody {
            volume_path: "/logs".into(),
            host_path: "/grdata/db/logs".into(),
            ..Default::default()
        })
        .into_parts("db")
        .unwrap();
        let relation = MountRelation {
            tenant_id: "t".into(),
            service_id: "web".into(),
            depend_service_id: "db".into(),
            volume_name: None,
            volume_path: Some("/db-logs".into()),
            host_path: Some("/grdata/db/logs".into()),
            volume_type: None,
        };
        let resolved = resolve_relation(&relation, std::slice::from_ref(&source)).unwrap();
        assert_eq!(resolved.volume_path.as_str(), "/db-logs");

        let dangling = MountRelation {
            host_path: Some("/elsewhere".into()),
            ..relation
        };
        assert!(resolve_relation(&dangling, &[source]).is_none());
    }
}
