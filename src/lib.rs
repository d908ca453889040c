//! AppShare operator: Kubernetes reconciliation for AppShare resources
//!
//! Each `AppShare` custom resource is turned into a Deployment and a Service
//! of the same name. The operator creates them when missing and keeps the
//! Deployment's replica count and container resources in line with the spec.

pub mod controller;
pub mod crd;
pub mod error;
pub mod quantity;
pub mod rbac;
pub mod telemetry;

#[cfg(feature = "metrics")]
pub mod rest_api;

pub use crate::error::{Error, Result};
