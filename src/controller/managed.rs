//! The object kinds an AppShare manages
//!
//! Each kind knows how to build its desired state and how to diff an
//! existing object against it. Fetching and writing go through the generic
//! [`ResourceStore`](super::store::ResourceStore), so the reconcile loop is
//! written once for every kind.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;

use crate::crd::AppShare;
use crate::error::Result;

use super::drift::{diff_deployment, Drift};
use super::resources::{build_deployment, build_service};
use super::store::StoredResource;

pub trait ManagedKind: StoredResource {
    /// Short kind name used in logs and metric labels
    const KIND: &'static str;

    fn build(app: &AppShare) -> Result<Self>;

    fn diff(existing: &Self, desired: &Self) -> Drift<Self>;
}

impl ManagedKind for Deployment {
    const KIND: &'static str = "Deployment";

    fn build(app: &AppShare) -> Result<Self> {
        build_deployment(app)
    }

    fn diff(existing: &Self, desired: &Self) -> Drift<Self> {
        diff_deployment(existing, desired)
    }
}

impl ManagedKind for Service {
    const KIND: &'static str = "Service";

    fn build(app: &AppShare) -> Result<Self> {
        build_service(app)
    }

    // The operator owns no Service fields after creation.
    fn diff(existing: &Self, _desired: &Self) -> Drift<Self> {
        Drift::unchanged(existing.clone())
    }
}
