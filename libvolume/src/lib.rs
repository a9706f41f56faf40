//! # libvolume: volume provider resolution for RK8s services
//!
//! `libvolume` decides which storage backend a service volume should use and
//! validates the volume and mount-dependency records of each service. It
//! does not provision storage or talk to the cluster itself: both the
//! cluster status client and the persistence layer are injected as traits.
//! It follows the RK8s conventions (Tokio async runtime, `tracing` for
//! observability, `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Storage-class descriptors, provider kinds, access modes, decisions. |
//! | [`error`] | [`VolumeError`] enum covering all failure modes. |
//! | [`catalog`] | Normalizes storage classes into provider details per kind. |
//! | [`resolver`] | [`ProviderResolver`]: best-fit selection and provider listing. |
//! | [`volume`] | [`VolumeManager`]: a service's own volumes, both schemas. |
//! | [`dependency`] | [`DependencyManager`]: mount dependencies between services. |
//! | [`cluster`] | [`ClusterStatus`] trait: storage classes and volume phases. |
//! | [`store`] | [`ServiceStore`] trait: volume and relation persistence. |
//! | [`config`] | [`ResolverConfig`]: fallback type and tie-break policy. |
//! | [`backend`] | In-memory and snapshot-file collaborators. |

pub mod backend;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod dependency;
pub mod error;
pub mod resolver;
pub mod store;
pub mod types;
pub mod volume;

// Re-export the most commonly used items at crate root for convenience.
pub use cluster::ClusterStatus;
pub use config::{ResolverConfig, TieBreak};
pub use dependency::{DependencyManager, DependencyRequest, MountRelation};
pub use error::VolumeError;
pub use resolver::ProviderResolver;
pub use store::ServiceStore;
pub use types::*;
pub use volume::{ServiceVolume, VolumeKey, VolumeManager, VolumeRequest};
