//! Shared types for AppShare specifications
//!
//! These types are used by the CRD definition and by the resource builders.
//!
//! # Type Hierarchy
//!
//! - [`ResourceRequirements`] - CPU and memory requests/limits following Kubernetes conventions
//! - [`ResourceSpec`] - a single CPU/memory pair

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements as K8sResources;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject, SubschemaValidation};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::quantity::parse_quantity;

/// Default CPU limit for the application container
pub const DEFAULT_LIMIT_CPU: &str = "4000m";
/// Default memory limit for the application container
pub const DEFAULT_LIMIT_MEMORY: &str = "4096Mi";
/// Default CPU request for the application container
pub const DEFAULT_REQUEST_CPU: &str = "500m";
/// Default memory request for the application container
pub const DEFAULT_REQUEST_MEMORY: &str = "512Mi";

/// Kubernetes-style resource requirements
///
/// Specifies CPU and memory resource requests and limits for the
/// application container. Quantities use the Kubernetes formats:
/// - CPU: `"500m"` (millicores), `2` (cores), `"1.5"`
/// - Memory: `"512Mi"`, `"1Gi"`, `"4096Mi"`
///
/// When `requests` is omitted each request defaults to 500m CPU / 512Mi
/// memory, capped at the matching limit.
///
/// # Examples
///
/// ```rust
/// use appshare_operator::crd::{ResourceRequirements, ResourceSpec};
///
/// let resources = ResourceRequirements::default();
/// assert_eq!(resources.limits.cpu.0, "4000m");
/// assert_eq!(resources.effective_requests().memory.0, "512Mi");
///
/// let small = ResourceRequirements {
///     limits: ResourceSpec::new("250m", "1Gi"),
///     requests: None,
/// };
/// assert_eq!(small.effective_requests().cpu.0, "250m");
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Maximum resources allowed
    #[serde(default = "default_limits")]
    pub limits: ResourceSpec,
    /// Minimum resources requested; derived from the limits when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceSpec>,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            limits: default_limits(),
            requests: None,
        }
    }
}

fn default_limits() -> ResourceSpec {
    ResourceSpec::new(DEFAULT_LIMIT_CPU, DEFAULT_LIMIT_MEMORY)
}

impl ResourceRequirements {
    /// Requests applied to the container
    ///
    /// Explicit requests are returned as-is. Otherwise each resource gets the
    /// default request, or the limit when the limit is smaller.
    pub fn effective_requests(&self) -> ResourceSpec {
        match &self.requests {
            Some(requests) => requests.clone(),
            None => ResourceSpec {
                cpu: capped_default(DEFAULT_REQUEST_CPU, &self.limits.cpu),
                memory: capped_default(DEFAULT_REQUEST_MEMORY, &self.limits.memory),
            },
        }
    }

    /// Convert into the container-level Kubernetes representation
    pub fn to_k8s(&self) -> K8sResources {
        K8sResources {
            limits: Some(self.limits.to_resource_list()),
            requests: Some(self.effective_requests().to_resource_list()),
            ..Default::default()
        }
    }
}

// A malformed or negative limit keeps the default; validation reports the limit.
fn capped_default(default: &str, limit: &Quantity) -> Quantity {
    match (parse_quantity(default), parse_quantity(&limit.0)) {
        (Ok(d), Ok(l)) if !l.is_negative() && l < d => limit.clone(),
        _ => Quantity(default.to_string()),
    }
}

/// Resource specification for CPU and memory
///
/// Values may be written as strings (`"500m"`) or plain numbers (`2`).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ResourceSpec {
    /// CPU quantity (e.g., "500m", 2)
    #[serde(deserialize_with = "deserialize_quantity")]
    #[schemars(schema_with = "int_or_string_schema")]
    pub cpu: Quantity,
    /// Memory quantity (e.g., "512Mi", "4Gi")
    #[serde(deserialize_with = "deserialize_quantity")]
    #[schemars(schema_with = "int_or_string_schema")]
    pub memory: Quantity,
}

impl ResourceSpec {
    pub fn new(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cpu: Quantity(cpu.into()),
            memory: Quantity(memory.into()),
        }
    }

    fn to_resource_list(&self) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".to_string(), self.cpu.clone()),
            ("memory".to_string(), self.memory.clone()),
        ])
    }
}

/// Accept a quantity written as a string or as a bare number
fn deserialize_quantity<'de, D>(deserializer: D) -> Result<Quantity, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawQuantity {
        String(String),
        Int(i64),
        Float(f64),
    }

    let raw = match RawQuantity::deserialize(deserializer)? {
        RawQuantity::String(s) => s,
        RawQuantity::Int(i) => i.to_string(),
        RawQuantity::Float(f) => f.to_string(),
    };
    Ok(Quantity(raw))
}

/// Same schema the API server uses for core quantities
fn int_or_string_schema(_: &mut SchemaGenerator) -> Schema {
    let typed = |instance: InstanceType| {
        Schema::Object(SchemaObject {
            instance_type: Some(instance.into()),
            ..Default::default()
        })
    };

    let mut schema = SchemaObject {
        subschemas: Some(Box::new(SubschemaValidation {
            any_of: Some(vec![typed(InstanceType::Integer), typed(InstanceType::String)]),
            ..Default::default()
        })),
        ..Default::default()
    };
    schema
        .extensions
        .insert("x-kubernetes-int-or-string".to_string(), true.into());
    Schema::Object(schema)
}
