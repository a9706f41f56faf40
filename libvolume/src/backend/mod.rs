//! Collaborator implementations shipped with the crate.
//!
//! Each backend module provides a concrete type that implements
//! [`ServiceStore`](crate::store::ServiceStore) and/or
//! [`ClusterStatus`](crate::cluster::ClusterStatus).

pub mod memory;
pub mod snapshot;
