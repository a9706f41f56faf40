//! Mount dependency edges between services.
//!
//! A [`MountRelation`] lets a consuming service mount a volume owned by
//! another service. Legacy payloads address the source by host directory
//! (`mnt_dir`) and give the target as `mnt_name`; current payloads address it
//! by volume name.
//!
//! Only add and delete exist. This module performs no cycle detection and no
//! batching: each call handles exactly one edge.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::VolumeError;
use crate::store::ServiceStore;
use crate::types::Operation;
use crate::volume::MountPath;

/// A mount dependency of `service_id` on a volume of `depend_service_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRelation {
    pub tenant_id: String,
    pub service_id: String,
    pub depend_service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    /// Mount path inside the consuming service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_path: Option<String>,
    /// Legacy source directory of the depended-on service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

impl MountRelation {
    pub fn key(&self) -> DependencyKey {
        DependencyKey {
            tenant_id: self.tenant_id.clone(),
            service_id: self.service_id.clone(),
            depend_service_id: self.depend_service_id.clone(),
            volume_name: self.volume_name.clone(),
        }
    }
}

/// Identity of one or more relations within a tenant.
///
/// Without a volume name the key addresses every relation between the two
/// services, which is how legacy deletes behave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyKey {
    pub tenant_id: String,
    pub service_id: String,
    pub depend_service_id: String,
    #[serde(default)]
    pub volume_name: Option<String>,
}

impl DependencyKey {
    pub fn matches(&self, relation: &MountRelation) -> bool {
        self.tenant_id == relation.tenant_id
            && self.service_id == relation.service_id
            && self.depend_service_id == relation.depend_service_id
            && match &self.volume_name {
                Some(name) => relation.volume_name.as_deref() == Some(name.as_str()),
                None => true,
            }
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.service_id, self.depend_service_id)?;
        if let Some(name) = &self.volume_name {
            write!(f, "/{name}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Current-schema add-dependency payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyBody {
    pub depend_service_id: String,
    pub volume_name: String,
    pub volume_path: String,
    #[serde(default)]
    pub volume_type: String,
}

/// Legacy add-dependency payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyDependencyBody {
    pub depend_service_id: String,
    /// Mount path inside the consuming service.
    pub mnt_name: String,
    /// Source directory of the depended-on service.
    pub mnt_dir: String,
}

/// An add-dependency request in either schema generation.
#[derive(Debug, Clone)]
pub enum DependencyRequest {
    Legacy(LegacyDependencyBody),
    Current(DependencyBody),
}

fn require(field: &str, value: &str) -> Result<(), VolumeError> {
    if value.trim().is_empty() {
        return Err(VolumeError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

impl DependencyRequest {
    pub fn current_from_json(body: &str) -> Result<Self, VolumeError> {
        Ok(Self::Current(serde_json::from_str(body)?))
    }

    pub fn legacy_from_json(body: &str) -> Result<Self, VolumeError> {
        Ok(Self::Legacy(serde_json::from_str(body)?))
    }

    /// Validate the payload and build the edge owned by `service_id`.
    pub fn into_relation(
        self,
        tenant_id: &str,
        service_id: &str,
    ) -> Result<MountRelation, VolumeError> {
        match self {
            Self::Legacy(body) => {
                require("depend_service_id", &body.depend_service_id)?;
                require("mnt_dir", &body.mnt_dir)?;
                let target = MountPath::new(body.mnt_name)?;
                Ok(MountRelation {
                    tenant_id: tenant_id.to_owned(),
                    service_id: service_id.to_owned(),
                    depend_service_id: body.depend_service_id,
                    volume_name: None,
                    volume_path: Some(target.into()),
                    host_path: Some(body.mnt_dir),
                    volume_type: None,
                })
            }
            Self::Current(body) => {
                require("depend_service_id", &body.depend_service_id)?;
                require("volume_name", &body.volume_name)?;
                let target = MountPath::new(body.volume_path)?;
                Ok(MountRelation {
                    tenant_id: tenant_id.to_owned(),
                    service_id: service_id.to_owned(),
                    depend_service_id: body.depend_service_id,
                    volume_name: Some(body.volume_name),
                    volume_path: Some(target.into()),
                    host_path: None,
                    volume_type: Some(body.volume_type).filter(|t| !t.is_empty()),
                })
            }
        }
    }
}

/// Delete-dependency payload. Legacy callers omit the volume name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteDependencyBody {
    pub depend_service_id: String,
    #[serde(default)]
    pub volume_name: Option<String>,
}

impl DeleteDependencyBody {
    pub fn from_json(body: &str) -> Result<Self, VolumeError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn into_key(
        self,
        tenant_id: &str,
        service_id: &str,
    ) -> Result<DependencyKey, VolumeError> {
        require("depend_service_id", &self.depend_service_id)?;
        Ok(DependencyKey {
            tenant_id: tenant_id.to_owned(),
            service_id: service_id.to_owned(),
            depend_service_id: self.depend_service_id,
            volume_name: self.volume_name.filter(|n| !n.is_empty()),
        })
    }
}

/// A dependency mutation handed to the [`ServiceStore`].
#[derive(Debug, Clone, Copy)]
pub enum DependencyChange<'a> {
    Add(&'a MountRelation),
    Delete(&'a DependencyKey),
}

impl DependencyChange<'_> {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Add(_) => Operation::Add,
            Self::Delete(_) => Operation::Delete,
        }
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Validates dependency requests and forwards them to the store.
pub struct DependencyManager<S> {
    store: Arc<S>,
}

impl<S: ServiceStore> DependencyManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request))]
    pub async fn add_dependency(
        &self,
        tenant_id: &str,
        service_id: &str,
        request: DependencyRequest,
    ) -> Result<MountRelation, VolumeError> {
        let relation = request.into_relation(tenant_id, service_id)?;
        self.store
            .volume_dependency(DependencyChange::Add(&relation))
            .await?;
        info!(key = %relation.key(), "volume dependency added");
        Ok(relation)
    }

    /// Delete by identity: tenant, owner, depended-on service and, when
    /// given, the volume name.
    #[instrument(skip(self, body))]
    pub async fn delete_dependency(
        &self,
        tenant_id: &str,
        service_id: &str,
        body: DeleteDependencyBody,
    ) -> Result<(), VolumeError> {
        let key = body.into_key(tenant_id, service_id)?;
        self.store
            .volume_dependency(DependencyChange::Delete(&key))
            .await?;
        info!(%key, "volume dependency deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(volume_name: Option<&str>) -> MountRelation {
        MountRelation {
            tenant_id: "t".into(),
            service_id: "web".into(),
            depend_service_id: "db".into(),
            volume_name: volume_name.map(str::to_owned),
            volume_path: Some("/mnt".into()),
            host_path: None,
            volume_type: None,
        }
    }

    #[test]
    fn current_request_builds_named_edge() {
        let edge = DependencyRequest::Current(DependencyBody {
            depend_service_id: "db".into(),
            volume_name: "data".into(),
            volume_path: "/mnt/data".into(),
            volume_type: "aws-ebs".into(),
        })
        .into_relation("t", "web")
        .unwrap();
        assert_eq!(edge.volume_name.as_deref(), Some("data"));
        assert_eq!(edge.volume_path.as_deref(), Some("/mnt/data"));
        assert_eq!(edge.volume_type.as_deref(), Some("aws-ebs"));
        assert_eq!(edge.host_path, None);
    }

    #[test]
    fn legacy_request_maps_mount_dir() {
        let edge = DependencyRequest::legacy_from_json(
            r#"{"depend_service_id":"db","mnt_name":"/db-logs","mnt_dir":"/grdata/db/logs"}"#,
        )
        .unwrap()
        .into_relation("t", "web")
        .unwrap();
        assert_eq!(edge.volume_name, None);
        assert_eq!(edge.volume_path.as_deref(), Some("/db-logs"));
        assert_eq!(edge.host_path.as_deref(), Some("/grdata/db/logs"));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let relative = DependencyRequest::Current(DependencyBody {
            depend_service_id: "db".into(),
            volume_name: "data".into(),
            volume_path: "mnt".into(),
            ..Default::default()
        });
        assert!(matches!(
            relative.into_relation("t", "web"),
            Err(VolumeError::InvalidInput(_))
        ));

        let no_target = DependencyRequest::Current(DependencyBody {
            depend_service_id: " ".into(),
            volume_name: "data".into(),
            volume_path: "/mnt".into(),
            ..Default::default()
        });
        assert!(no_target.into_relation("t", "web").is_err());

        assert!(DependencyRequest::current_from_json("{").is_err());
    }

    #[test]
    fn key_matching() {
        let named = relation(Some("data"));
        assert!(named.key().matches(&named));
        assert!(!named.key().matches(&relation(Some("other"))));

        let pair = DependencyKey {
            tenant_id: "t".into(),
            service_id: "web".into(),
            depend_service_id: "db".into(),
            volume_name: None,
        };
        assert!(pair.matches(&named));
        assert!(pair.matches(&relation(None)));

        let other_owner = DependencyKey {
            service_id: "api".into(),
            ..pair.clone()
        };
        assert!(!other_owner.matches(&named));

        let other_tenant = DependencyKey {
            tenant_id: "t2".into(),
            ..pair
        };
        assert!(!other_tenant.matches(&named));
    }

    #[test]
    fn change_reports_its_operation() {
        let edge = relation(Some("data"));
        assert_eq!(DependencyChange::Add(&edge).operation(), Operation::Add);
        let key = edge.key();
        assert_eq!(DependencyChange::Delete(&key).operation(), Operation::Delete);
        assert_eq!(Operation::Add.to_string(), "add");
    }

    #[test]
    fn delete_body_builds_identity() {
        let key = DeleteDependencyBody::from_json(r#"{"depend_service_id":"db","volume_name":""}"#)
            .unwrap()
            .into_key("t", "web")
            .unwrap();
        assert_eq!(key.tenant_id, "t");
        assert_eq!(key.volume_name, None);
        assert_eq!(key.to_string(), "web -> db");

        assert!(
            DeleteDependencyBody::default()
                .into_key("t", "web")
                .is_err()
        );
    }
}
