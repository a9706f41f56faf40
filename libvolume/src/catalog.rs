//! Capability catalog: turns raw cluster storage classes into provider
//! details grouped by [`ProviderKind`].
//!
//! Building the catalog is a pure transformation. Descriptors whose
//! provisioner is not recognised are skipped with a debug diagnostic rather
//! than failing the whole listing.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{
    AccessMode, ProviderDetail, ProviderKind, StorageClassDescriptor, VolumeProvider,
};

const DEFAULT_RECLAIM_POLICY: &str = "Delete";
const DEFAULT_BINDING_MODE: &str = "Immediate";

/// Derive the provider kind from a provisioner identifier.
///
/// Matching is case-insensitive and ignores surrounding whitespace. Returns
/// `None` for provisioners the platform does not know how to use.
pub fn parse_provider_kind(provisioner: &str) -> Option<ProviderKind> {
    let provisioner = provisioner.trim().to_ascii_lowercase();
    let kind = match provisioner.as_str() {
        "rainbond.io/provisioner-sssc" => ProviderKind::ShareFile,
        "rainbond.io/provisioner-sslc" | "kubernetes.io/no-provisioner" => ProviderKind::Local,
        "kubernetes.io/aws-ebs" | "ebs.csi.aws.com" => ProviderKind::AwsEbs,
        "kubernetes.io/gce-pd" | "pd.csi.storage.gke.io" => ProviderKind::GcePd,
        "kubernetes.io/azure-disk" | "disk.csi.azure.com" => ProviderKind::AzureDisk,
        "kubernetes.io/azure-file" | "file.csi.azure.com" => ProviderKind::AzureFile,
        "kubernetes.io/rbd" | "rbd.csi.ceph.com" | "ceph.rook.io/block" => ProviderKind::CephRbd,
        "cephfs.csi.ceph.com" => ProviderKind::CephFs,
        "kubernetes.io/cinder" | "cinder.csi.openstack.org" => ProviderKind::Cinder,
        "alicloud/disk" | "diskplugin.csi.alibabacloud.com" => ProviderKind::AliCloudDisk,
        "alicloud/nas" | "nasplugin.csi.alibabacloud.com" => ProviderKind::AliCloudNas,
        "kubernetes.io/glusterfs" => ProviderKind::GlusterFs,
        // Rook installs its CSI drivers under a namespace prefix.
        other if other.ends_with(".rbd.csi.ceph.com") => ProviderKind::CephRbd,
        other if other.ends_with(".cephfs.csi.ceph.com") => ProviderKind::CephFs,
        _ => return None,
    };
    Some(kind)
}

/// Provider details grouped by kind.
///
/// Kinds iterate in declaration order of [`ProviderKind`]; details within a
/// kind keep the order in which their storage classes were scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    providers: BTreeMap<ProviderKind, Vec<ProviderDetail>>,
}

impl Catalog {
    /// Details registered under `kind`, in scan order.
    pub fn get(&self, kind: ProviderKind) -> &[ProviderDetail] {
        self.providers.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProviderKind, &[ProviderDetail])> + '_ {
        self.providers.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Total number of details across all kinds.
    pub fn len(&self) -> usize {
        self.providers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn insert(&mut self, kind: ProviderKind, detail: ProviderDetail) {
        self.providers.entry(kind).or_default().push(detail);
    }

    pub fn into_providers(self) -> Vec<VolumeProvider> {
        self.providers
            .into_iter()
            .map(|(kind, provisioner)| VolumeProvider { kind, provisioner })
            .collect()
    }
}

/// Build the catalog from a storage-class snapshot.
///
/// `kind_filter` restricts the output to one kind tag. An empty filter is the
/// same as no filter.
pub fn build_catalog(
    storage_classes: &[StorageClassDescriptor],
    kind_filter: Option<&str>,
) -> Catalog {
    let kind_filter = kind_filter.filter(|f| !f.is_empty());
    let mut catalog = Catalog::default();

    for storage_class in storage_classes {
        let Some(kind) = parse_provider_kind(&storage_class.provisioner) else {
            debug!(
                name = %storage_class.name,
                provisioner = %storage_class.provisioner,
                "unknown storage class provisioner, skipping"
            );
            continue;
        };
        if let Some(filter) = kind_filter
            && kind.as_str() != filter
        {
            continue;
        }

        let detail = apply_capability_overrides(kind, detail_from_descriptor(storage_class));
        catalog.insert(kind, detail);
    }

    catalog
}

/// Seed a provider detail from the raw descriptor, before overrides.
pub fn detail_from_descriptor(storage_class: &StorageClassDescriptor) -> ProviderDetail {
    let mut access_modes = Vec::with_capacity(storage_class.access_modes.len());
    for token in &storage_class.access_modes {
        match AccessMode::parse(token) {
            Some(mode) => access_modes.push(mode),
            None => debug!(
                name = %storage_class.name,
                token = %token,
                "ignoring unrecognised access mode"
            ),
        }
    }

    ProviderDetail {
        name: storage_class.name.clone(),
        provisioner: storage_class.provisioner.clone(),
        reclaim_policy: storage_class.reclaim_policy.clone(),
        volume_binding_mode: storage_class.volume_binding_mode.clone(),
        allow_volume_expansion: storage_class.allow_volume_expansion,
        access_modes,
        ..Default::default()
    }
}

/// Correct a detail according to what the backend actually supports.
///
/// Provisioners commonly under-report their access modes, so each kind adds
/// the modes it is known to serve. Policies and binding modes are normalized
/// to their canonical spelling.
pub fn apply_capability_overrides(
    kind: ProviderKind,
    mut detail: ProviderDetail,
) -> ProviderDetail {
    detail.reclaim_policy = normalize_reclaim_policy(&detail.reclaim_policy).to_owned();
    detail.volume_binding_mode = normalize_binding_mode(&detail.volume_binding_mode).to_owned();

    let known_modes: &[AccessMode] = match kind {
        k if k.is_shared_filesystem() => &[
            AccessMode::ReadWriteOnce,
            AccessMode::ReadOnlyMany,
            AccessMode::ReadWriteMany,
        ],
        ProviderKind::CephRbd => &[AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany],
        _ => &[AccessMode::ReadWriteOnce],
    };
    extend_unique(&mut detail.access_modes, known_modes.iter().copied());

    if kind == ProviderKind::Local {
        // Pinned to one node directory: cannot grow or be shared across nodes.
        detail.allow_volume_expansion = Some(false);
    }

    let mut share_policy = vec!["exclusive".to_owned()];
    if kind.is_shared_filesystem() {
        share_policy.push("shared".to_owned());
    }
    extend_unique(&mut detail.share_policy, share_policy);
    extend_unique(&mut detail.backup_policy, ["exclusive".to_owned()]);

    if detail.description.is_empty() {
        detail.description = kind_description(kind).to_owned();
    }

    detail
}

fn extend_unique<T: PartialEq>(target: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

fn normalize_reclaim_policy(policy: &str) -> &'static str {
    match policy.trim().to_ascii_lowercase().as_str() {
        "retain" => "Retain",
        "recycle" => "Recycle",
        _ => DEFAULT_RECLAIM_POLICY,
    }
}

fn normalize_binding_mode(mode: &str) -> &'static str {
    match mode.trim().to_ascii_lowercase().as_str() {
        "waitforfirstconsumer" => "WaitForFirstConsumer",
        _ => DEFAULT_BINDING_MODE,
    }
}

fn kind_description(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::ShareFile => "platform shared file storage",
        ProviderKind::Local => "node-local storage, bound to the node that created it",
        ProviderKind::AwsEbs => "AWS Elastic Block Store",
        ProviderKind::GcePd => "Google Compute Engine persistent disk",
        ProviderKind::AzureDisk => "Azure managed disk",
        ProviderKind::AzureFile => "Azure Files share",
        ProviderKind::CephRbd => "Ceph RADOS block device",
        ProviderKind::CephFs => "Ceph filesystem",
        ProviderKind::Cinder => "OpenStack Cinder volume",
        ProviderKind::AliCloudDisk => "Alibaba Cloud disk",
        ProviderKind::AliCloudNas => "Alibaba Cloud NAS",
        ProviderKind::GlusterFs => "GlusterFS volume",
    }
}
