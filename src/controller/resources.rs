//! Desired-state builders for the objects an AppShare manages
//!
//! Everything here is a pure function of the AppShare: no I/O, and the same
//! input always yields the same object (labels live in `BTreeMap`s so
//! serialization order is stable).

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, HTTPGetAction, PodSpec, PodTemplateSpec, Probe, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use crate::crd::AppShare;
use crate::error::{Error, Result};

use super::store::ObjectIdentity;

pub const APP_LABEL_VALUE: &str = "appshare";
pub const OWNER_LABEL: &str = "appshare_cr";
pub const CONTAINER_NAME: &str = "appshare";
pub const CONTAINER_IMAGE: &str = "appshareco/appshare:3.3";
pub const APP_PORT: i32 = 3000;
pub const READINESS_PATH: &str = "/readiness-check";
pub const LIVENESS_PATH: &str = "/live-check";

/// Labels shared by the Deployment, its pods and the Service selector
pub fn standard_labels(app: &AppShare) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), APP_LABEL_VALUE.to_string()),
        (OWNER_LABEL.to_string(), app.name_any()),
    ])
}

/// Create the controller OwnerReference pointing at an AppShare
pub fn owner_reference(app: &AppShare) -> Result<OwnerReference> {
    let uid = app
        .metadata
        .uid
        .clone()
        .ok_or(Error::MissingObjectKey("metadata.uid"))?;
    Ok(OwnerReference {
        api_version: AppShare::api_version(&()).to_string(),
        kind: AppShare::kind(&()).to_string(),
        name: app.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Record `app` as the controlling owner of an object.
///
/// Idempotent when `app` already controls the object. Fails if another
/// object holds the controller reference.
pub fn set_controller_reference(app: &AppShare, meta: &mut ObjectMeta) -> Result<()> {
    let owner = owner_reference(app)?;
    let refs = meta.owner_references.get_or_insert_with(Vec::new);

    if let Some(existing) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(Error::OwnershipConflict(format!(
            "{} is already controlled by {} {}",
            meta.name.as_deref().unwrap_or("<unnamed>"),
            existing.kind,
            existing.name
        )));
    }

    refs.retain(|r| r.uid != owner.uid);
    refs.push(owner);
    Ok(())
}

fn object_meta(app: &AppShare, labels: &BTreeMap<String, String>) -> Result<ObjectMeta> {
    let id = ObjectIdentity::of(app)?;
    let mut meta = ObjectMeta {
        name: Some(id.name),
        namespace: Some(id.namespace),
        labels: Some(labels.clone()),
        ..Default::default()
    };
    set_controller_reference(app, &mut meta)?;
    Ok(meta)
}

// ============================================================================
// Deployment
// ============================================================================

/// Build the desired Deployment for an AppShare
pub fn build_deployment(app: &AppShare) -> Result<Deployment> {
    let labels = standard_labels(app);

    Ok(Deployment {
        metadata: object_meta(app, &labels)?,
        spec: Some(DeploymentSpec {
            replicas: Some(app.spec.replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![build_container(app)],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    })
}

fn build_container(app: &AppShare) -> Container {
    Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(CONTAINER_IMAGE.to_string()),
        ports: Some(vec![ContainerPort {
            container_port: APP_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        readiness_probe: Some(http_probe(READINESS_PATH)),
        liveness_probe: Some(http_probe(LIVENESS_PATH)),
        resources: Some(app.spec.resources.to_k8s()),
        ..Default::default()
    }
}

fn http_probe(path: &str) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(APP_PORT),
            scheme: Some("HTTP".to_string()),
            ..Default::default()
        }),
        period_seconds: Some(10),
        timeout_seconds: Some(1),
        failure_threshold: Some(3),
        success_threshold: Some(1),
        ..Default::default()
    }
}

// ============================================================================
// Service
// ============================================================================

/// Build the desired Service for an AppShare
pub fn build_service(app: &AppShare) -> Result<Service> {
    let labels = standard_labels(app);

    Ok(Service {
        metadata: object_meta(app, &labels)?,
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                port: APP_PORT,
                target_port: Some(IntOrString::Int(APP_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    })
}
