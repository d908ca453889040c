//! AppShare Custom Resource Definition
//!
//! An AppShare describes one deployment of the AppShare application: how
//! many replicas to run and the compute resources of each replica. The
//! operator turns it into a Deployment and a Service of the same name.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ResourceRequirements;
use crate::quantity::{parse_quantity, ParsedQuantity};

/// Structured validation error for `AppShareSpec`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecValidationError {
    pub field: String,
    pub message: String,
    pub how_to_fix: String,
}

impl SpecValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            how_to_fix: how_to_fix.into(),
        }
    }
}

impl std::fmt::Display for SpecValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.message, self.how_to_fix)
    }
}

#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "appshare.appshare.co",
    version = "v1",
    kind = "AppShare",
    namespaced,
    status = "AppShareStatus",
    shortname = "as",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppShareSpec {
    /// Number of application replicas
    #[schemars(range(min = 0))]
    pub replicas: i32,

    /// Container resource requirements; defaults apply when omitted
    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Observed state of an AppShare
///
/// Owned by the operator. Carries no fields yet.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct AppShareStatus {}

impl AppShareSpec {
    /// Validate the spec
    ///
    /// Collects every problem instead of stopping at the first one:
    /// - replicas must be non-negative
    /// - every quantity must parse and be non-negative
    /// - a request may not exceed the limit of the same resource
    pub fn validate(&self) -> Result<(), Vec<SpecValidationError>> {
        let mut errors = Vec::new();

        if self.replicas < 0 {
            errors.push(SpecValidationError::new(
                "spec.replicas",
                format!("replicas must be >= 0, got {}", self.replicas),
                "Set spec.replicas to zero or a positive number.",
            ));
        }

        let requests = self.resources.effective_requests();
        let pairs = [
            (
                "cpu",
                &requests.cpu,
                &self.resources.limits.cpu,
            ),
            (
                "memory",
                &requests.memory,
                &self.resources.limits.memory,
            ),
        ];

        for (resource, request, limit) in pairs {
            let request = check_quantity(
                &format!("spec.resources.requests.{resource}"),
                &request.0,
                &mut errors,
            );
            let limit = check_quantity(
                &format!("spec.resources.limits.{resource}"),
                &limit.0,
                &mut errors,
            );

            if let (Some(request), Some(limit)) = (request, limit) {
                if request > limit {
                    errors.push(SpecValidationError::new(
                        format!("spec.resources.requests.{resource}"),
                        format!("{resource} request exceeds its limit"),
                        format!(
                            "Lower spec.resources.requests.{resource} or raise spec.resources.limits.{resource}."
                        ),
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_quantity(
    field: &str,
    raw: &str,
    errors: &mut Vec<SpecValidationError>,
) -> Option<ParsedQuantity> {
    match parse_quantity(raw) {
        Ok(q) if q.is_negative() => {
            errors.push(SpecValidationError::new(
                field,
                format!("quantity '{raw}' is negative"),
                "Use a positive quantity such as 500m or 512Mi.",
            ));
            None
        }
        Ok(q) => Some(q),
        Err(e) => {
            errors.push(SpecValidationError::new(
                field,
                e.to_string(),
                "Use a Kubernetes quantity such as 500m, 2, 512Mi or 4Gi.",
            ));
            None
        }
    }
}
