//! Provider resolver: best-fit selection and provider listing on top of the
//! [capability catalog](crate::catalog).

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::catalog::{Catalog, build_catalog};
use crate::cluster::ClusterStatus;
use crate::config::{ResolverConfig, TieBreak};
use crate::error::VolumeError;
use crate::types::{
    AccessMode, ProviderDetail, ProviderKind, VolumeBestDecision, VolumeBestRequest,
    VolumeProvider, is_builtin_volume_type,
};

/// Resolves requested volume types against the cluster's storage classes.
///
/// Holds no per-request state. Every call takes a fresh storage-class
/// snapshot from the injected [`ClusterStatus`].
pub struct ProviderResolver<C> {
    cluster: Arc<C>,
    config: ResolverConfig,
}

impl<C: ClusterStatus> ProviderResolver<C> {
    pub fn new(cluster: Arc<C>, config: ResolverConfig) -> Self {
        Self { cluster, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Decide whether `request.volume_type` can serve `request.access_mode`
    /// on this cluster, or which type to use instead.
    ///
    /// Built-in types are always available and never hit the cluster.
    #[instrument(
        skip(self),
        fields(volume_type = %request.volume_type, access_mode = %request.access_mode)
    )]
    pub async fn select_best(
        &self,
        request: &VolumeBestRequest,
    ) -> Result<VolumeBestDecision, VolumeError> {
        if is_builtin_volume_type(&request.volume_type) {
            return Ok(VolumeBestDecision::unchanged());
        }
        let catalog = self.fetch_catalog(Some(&request.volume_type)).await?;
        Ok(select_best_in(&catalog, request, &self.config))
    }

    /// Every provider that satisfies the request, best candidate first.
    pub async fn matching_providers(
        &self,
        request: &VolumeBestRequest,
    ) -> Result<Vec<ProviderDetail>, VolumeError> {
        let catalog = self.fetch_catalog(Some(&request.volume_type)).await?;
        Ok(matching_details(&catalog, request, self.config.tie_break)
            .into_iter()
            .cloned()
            .collect())
    }

    /// The full provider catalog, optionally restricted to one kind tag.
    #[instrument(skip(self))]
    pub async fn list_providers(
        &self,
        kind_filter: Option<&str>,
    ) -> Result<Vec<VolumeProvider>, VolumeError> {
        let catalog = self.fetch_catalog(kind_filter).await?;
        Ok(catalog.into_providers())
    }

    async fn fetch_catalog(&self, kind_filter: Option<&str>) -> Result<Catalog, VolumeError> {
        let storage_classes = self
            .cluster
            .get_storage_classes()
            .await
            .map_err(|e| match e {
                VolumeError::CatalogUnavailable(_) => e,
                other => VolumeError::catalog(other),
            })?;
        debug!(count = storage_classes.len(), "storage classes listed");
        Ok(build_catalog(&storage_classes, kind_filter))
    }
}

/// Details in `catalog` that satisfy `request`, ordered by `tie_break`.
///
/// An empty volume type considers every kind. A volume type that is not a
/// known kind, or an access mode that does not parse, matches nothing.
pub fn matching_details<'a>(
    catalog: &'a Catalog,
    request: &VolumeBestRequest,
    tie_break: TieBreak,
) -> Vec<&'a ProviderDetail> {
    let Some(mode) = AccessMode::parse(&request.access_mode) else {
        return Vec::new();
    };

    let mut matches: Vec<&ProviderDetail> = if request.volume_type.is_empty() {
        catalog
            .iter()
            .flat_map(|(_, details)| details.iter())
            .filter(|d| d.supports(mode))
            .collect()
    } else {
        match request.volume_type.parse::<ProviderKind>() {
            Ok(kind) => catalog.get(kind).iter().filter(|d| d.supports(mode)).collect(),
            Err(_) => Vec::new(),
        }
    };

    if tie_break == TieBreak::ProviderName {
        matches.sort_by(|a, b| a.name.cmp(&b.name));
    }
    matches
}

/// Pure best-fit decision over an already built catalog.
pub fn select_best_in(
    catalog: &Catalog,
    request: &VolumeBestRequest,
    config: &ResolverConfig,
) -> VolumeBestDecision {
    if is_builtin_volume_type(&request.volume_type) {
        return VolumeBestDecision::unchanged();
    }

    match matching_details(catalog, request, config.tie_break).first() {
        Some(detail) => {
            debug!(provider = %detail.name, "found provider for volume");
            VolumeBestDecision::unchanged()
        }
        None => {
            warn!(
                volume_type = %request.volume_type,
                access_mode = %request.access_mode,
                fallback = %config.fallback_volume_type,
                "no suitable provider for volume, falling back"
            );
            VolumeBestDecision::fallback(config.fallback_volume_type.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryCluster;
    use crate::types::StorageClassDescriptor;
    use std::collections::HashMap;

    use async_trait::async_trait;

    struct UnreachableCluster;

    #[async_trait]
    impl ClusterStatus for UnreachableCluster {
        async fn get_app_volume_status(
            &self,
            _service_id: &str,
        ) -> Result<HashMap<String, crate::types::VolumePhase>, VolumeError> {
            Err(VolumeError::catalog("unreachable"))
        }

        async fn get_storage_classes(&self) -> Result<Vec<StorageClassDescriptor>, VolumeError> {
            Err(VolumeError::persistence("connection reset"))
        }
    }

    fn class(name: &str, provisioner: &str, modes: &[&str]) -> StorageClassDescriptor {
        StorageClassDescriptor {
            name: name.to_owned(),
            provisioner: provisioner.to_owned(),
            access_modes: modes.iter().map(|m| (*m).to_owned()).collect(),
            ..Default::default()
        }
    }

    fn request(volume_type: &str, access_mode: &str) -> VolumeBestRequest {
        VolumeBestRequest {
            volume_type: volume_type.to_owned(),
            access_mode: access_mode.to_owned(),
        }
    }

    fn resolver(
        classes: Vec<StorageClassDescriptor>,
    ) -> (Arc<MemoryCluster>, ProviderResolver<MemoryCluster>) {
        let cluster = Arc::new(MemoryCluster::with_storage_classes(classes));
        let resolver = ProviderResolver::new(Arc::clone(&cluster), ResolverConfig::default());
        (cluster, resolver)
    }

    #[tokio::test]
    async fn builtin_types_never_change_or_query_cluster() {
        let (cluster, resolver) = resolver(Vec::new());
        for ty in ["share-file", "local"] {
            for mode in ["RWO", "RWX", "nonsense", ""] {
                let decision = resolver.select_best(&request(ty, mode)).await.unwrap();
                assert!(!decision.changed);
                assert_eq!(decision.volume_type, None);
            }
        }
        assert_eq!(cluster.storage_class_queries(), 0);
    }

    #[tokio::test]
    async fn builtin_types_ignore_unreachable_cluster() {
        let resolver =
            ProviderResolver::new(Arc::new(UnreachableCluster), ResolverConfig::default());
        let decision = resolver.select_best(&request("local", "RWX")).await.unwrap();
        assert!(!decision.changed);
    }

    #[tokio::test]
    async fn aws_ebs_rwx_falls_back_to_share_file() {
        let (_, resolver) = resolver(vec![class("gp2", "kubernetes.io/aws-ebs", &[])]);
        let decision = resolver.select_best(&request("aws-ebs", "RWX")).await.unwrap();
        assert_eq!(decision, VolumeBestDecision::fallback("share-file"));

        let decision = resolver.select_best(&request("aws-ebs", "rwo")).await.unwrap();
        assert_eq!(decision, VolumeBestDecision::unchanged());
    }

    #[tokio::test]
    async fn missing_kind_falls_back() {
        let (_, resolver) = resolver(vec![class("gp2", "kubernetes.io/aws-ebs", &[])]);
        let decision = resolver.select_best(&request("ceph-rbd", "RWO")).await.unwrap();
        assert!(decision.changed);
        assert_eq!(decision.volume_type.as_deref(), Some("share-file"));
    }

    #[tokio::test]
    async fn raw_access_modes_are_honoured() {
        let (_, resolver) = resolver(vec![class(
            "gp2-multi",
            "kubernetes.io/aws-ebs",
            &["ReadWriteMany"],
        )]);
        let decision = resolver.select_best(&request("aws-ebs", "RWX")).await.unwrap();
        assert!(!decision.changed);
    }

    #[tokio::test]
    async fn unknown_access_mode_falls_back() {
        let (_, resolver) = resolver(vec![class("gp2", "kubernetes.io/aws-ebs", &[])]);
        let decision = resolver.select_best(&request("aws-ebs", "RW")).await.unwrap();
        assert!(decision.changed);
    }

    #[tokio::test]
    async fn empty_volume_type_considers_all_kinds() {
        let (_, resolver) = resolver(vec![
            class("gp2", "kubernetes.io/aws-ebs", &[]),
            class("nas", "alicloud/nas", &[]),
        ]);
        let decision = resolver.select_best(&request("", "RWX")).await.unwrap();
        assert!(!decision.changed);
    }

    #[tokio::test]
    async fn catalog_failure_is_catalog_unavailable() {
        let resolver =
            ProviderResolver::new(Arc::new(UnreachableCluster), ResolverConfig::default());
        let err = resolver
            .select_best(&request("aws-ebs", "RWO"))
            .await
            .unwrap_err();
        assert!(matches!(err, VolumeError::CatalogUnavailable(_)));
        assert!(err.is_retryable());

        let err = resolver.list_providers(None).await.unwrap_err();
        assert!(matches!(err, VolumeError::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn matching_providers_ordered_by_name() {
        let (_, resolver) = resolver(vec![
            class("zeta", "ebs.csi.aws.com", &[]),
            class("alpha", "kubernetes.io/aws-ebs", &[]),
        ]);
        let names: Vec<_> = resolver
            .matching_providers(&request("aws-ebs", "RWO"))
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn scan_order_keeps_listing_order() {
        let catalog = build_catalog(
            &[
                class("zeta", "ebs.csi.aws.com", &[]),
                class("alpha", "kubernetes.io/aws-ebs", &[]),
            ],
            None,
        );
        let names: Vec<_> =
            matching_details(&catalog, &request("aws-ebs", "RWO"), TieBreak::ScanOrder)
                .into_iter()
                .map(|d| d.name.as_str())
                .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn configured_fallback_type_is_used() {
        let config = ResolverConfig {
            fallback_volume_type: "local".to_owned(),
            ..Default::default()
        };
        let decision = select_best_in(&Catalog::default(), &request("gce-pd", "RWO"), &config);
        assert_eq!(decision, VolumeBestDecision::fallback("local"));
    }

    #[tokio::test]
    async fn list_providers_groups_and_filters() {
        let (_, resolver) = resolver(vec![
            class("gp2", "kubernetes.io/aws-ebs", &[]),
            class("gp3", "ebs.csi.aws.com", &[]),
            class("nas", "alicloud/nas", &[]),
            class("odd", "example.com/odd", &[]),
        ]);
        let all = resolver.list_providers(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let ebs = resolver.list_providers(Some("aws-ebs")).await.unwrap();
        assert_eq!(ebs.len(), 1);
        assert_eq!(ebs[0].kind, ProviderKind::AwsEbs);
        let names: Vec<_> = ebs[0].provisioner.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["gp2", "gp3"]);
    }
}
