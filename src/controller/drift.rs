//! Drift detection for operator-owned fields
//!
//! Only the Deployment's replica count and the first container's resource
//! limits/requests belong to the operator. Everything else on a managed
//! object may be changed by other actors and is left alone.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::quantity::quantities_equal;

/// Result of comparing an existing object with its desired state
#[derive(Clone, Debug, PartialEq)]
pub struct Drift<K> {
    /// Whether `patched` differs from the existing object
    pub changed: bool,
    /// The existing object with owned fields overwritten from the desired state
    pub patched: K,
}

impl<K> Drift<K> {
    pub fn unchanged(existing: K) -> Self {
        Self {
            changed: false,
            patched: existing,
        }
    }
}

/// Compare a Deployment against its desired state.
pub fn diff_deployment(existing: &Deployment, desired: &Deployment) -> Drift<Deployment> {
    let mut patched = existing.clone();
    let mut changed = false;

    let desired_replicas = desired.spec.as_ref().and_then(|s| s.replicas);
    let spec = patched.spec.get_or_insert_with(Default::default);
    if spec.replicas != desired_replicas {
        spec.replicas = desired_replicas;
        changed = true;
    }

    let desired_resources = first_container(desired).and_then(|c| c.resources.as_ref());
    let container = spec
        .template
        .spec
        .as_mut()
        .and_then(|pod| pod.containers.first_mut());

    if let (Some(container), Some(desired_resources)) = (container, desired_resources) {
        if !resources_equal(container.resources.as_ref(), Some(desired_resources)) {
            let resources = container.resources.get_or_insert_with(Default::default);
            resources.limits = desired_resources.limits.clone();
            resources.requests = desired_resources.requests.clone();
            changed = true;
        }
    }

    Drift { changed, patched }
}

fn first_container(deployment: &Deployment) -> Option<&Container> {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|pod| pod.containers.first())
}

/// Compare limits and requests by amount.
///
/// An absent requirements block equals one with no limits and no requests.
pub fn resources_equal(a: Option<&ResourceRequirements>, b: Option<&ResourceRequirements>) -> bool {
    fn limits(r: Option<&ResourceRequirements>) -> Option<&BTreeMap<String, Quantity>> {
        r.and_then(|r| r.limits.as_ref())
    }
    fn requests(r: Option<&ResourceRequirements>) -> Option<&BTreeMap<String, Quantity>> {
        r.and_then(|r| r.requests.as_ref())
    }

    quantity_maps_equal(limits(a), limits(b)) && quantity_maps_equal(requests(a), requests(b))
}

fn quantity_maps_equal(
    a: Option<&BTreeMap<String, Quantity>>,
    b: Option<&BTreeMap<String, Quantity>>,
) -> bool {
    let empty = BTreeMap::new();
    let a = a.unwrap_or(&empty);
    let b = b.unwrap_or(&empty);

    a.len() == b.len()
        && a.iter().all(|(name, qa)| {
            b.get(name)
                .map(|qb| quantities_equal(qa, qb))
                .unwrap_or(false)
        })
}
