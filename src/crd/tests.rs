//! Unit tests for the AppShare CRD
//!
//! Covers spec defaults, serialization shape and `AppShareSpec::validate()`.

#[cfg(test)]
mod app_share_spec {
    use kube::CustomResourceExt;

    use crate::crd::{AppShare, AppShareSpec, ResourceRequirements, ResourceSpec};

    fn spec_with(replicas: i32, resources: ResourceRequirements) -> AppShareSpec {
        AppShareSpec {
            replicas,
            resources,
        }
    }

    #[test]
    fn test_resources_default_when_omitted() {
        let spec: AppShareSpec = serde_json::from_value(serde_json::json!({
            "replicas": 2
        }))
        .unwrap();

        assert_eq!(spec.replicas, 2);
        assert_eq!(spec.resources.limits.cpu.0, "4000m");
        assert_eq!(spec.resources.limits.memory.0, "4096Mi");
        assert_eq!(spec.resources.effective_requests().cpu.0, "500m");
        assert_eq!(spec.resources.effective_requests().memory.0, "512Mi");
    }

    #[test]
    fn test_partial_resources_keep_other_defaults() {
        let spec: AppShareSpec = serde_json::from_value(serde_json::json!({
            "replicas": 1,
            "resources": { "limits": { "cpu": "2", "memory": "2Gi" } }
        }))
        .unwrap();

        assert_eq!(spec.resources.limits.cpu.0, "2");
        assert_eq!(spec.resources.effective_requests().cpu.0, "500m");
    }

    #[test]
    fn test_replicas_is_required() {
        let result: Result<AppShareSpec, _> = serde_json::from_value(serde_json::json!({}));
        assert!(result.is_err(), "replicas must be required");
    }

    #[test]
    fn test_crd_metadata() {
        let crd = AppShare::crd();
        assert_eq!(crd.spec.group, "appshare.appshare.co");
        assert_eq!(crd.spec.names.kind, "AppShare");
        assert_eq!(crd.spec.names.plural, "appshares");
        assert_eq!(crd.spec.scope, "Namespaced");

        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1");
        let has_status = version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some();
        assert!(has_status, "status subresource must be registered");
    }

    #[test]
    fn test_default_spec_is_valid() {
        let spec = spec_with(3, ResourceRequirements::default());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_zero_replicas_is_valid() {
        let spec = spec_with(0, ResourceRequirements::default());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_negative_replicas_rejected() {
        let spec = spec_with(-1, ResourceRequirements::default());
        let errors = spec.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "spec.replicas");
    }

    #[test]
    fn test_malformed_quantity_rejected() {
        let spec = spec_with(
            1,
            ResourceRequirements {
                limits: ResourceSpec::new("four", "4Gi"),
                requests: Some(ResourceSpec::new("500m", "512Mi")),
            },
        );
        let errors = spec.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "spec.resources.limits.cpu"));
    }

    #[test]
    fn test_request_above_limit_rejected() {
        let spec = spec_with(
            1,
            ResourceRequirements {
                limits: ResourceSpec::new("1", "1Gi"),
                requests: Some(ResourceSpec::new("1500m", "512Mi")),
            },
        );
        let errors = spec.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "spec.resources.requests.cpu");
    }

    #[test]
    fn test_request_equal_to_limit_in_other_units_is_valid() {
        let spec = spec_with(
            1,
            ResourceRequirements {
                limits: ResourceSpec::new("1", "1Gi"),
                requests: Some(ResourceSpec::new("1000m", "1024Mi")),
            },
        );
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let spec = spec_with(
            -5,
            ResourceRequirements {
                limits: ResourceSpec::new("-1", "lots"),
                requests: Some(ResourceSpec::new("500m", "512Mi")),
            },
        );
        let errors = spec.validate().unwrap_err();
        assert_eq!(errors.len(), 3, "got {errors:?}");
    }

    #[test]
    fn test_limits_only_below_default_requests_is_valid() {
        let spec: AppShareSpec = serde_json::from_value(serde_json::json!({
            "replicas": 1,
            "resources": { "limits": { "cpu": "250m", "memory": "256Mi" } }
        }))
        .unwrap();

        assert_eq!(spec.resources.requests, None);
        let requests = spec.resources.effective_requests();
        assert_eq!(requests.cpu.0, "250m");
        assert_eq!(requests.memory.0, "256Mi");
        assert!(spec.validate().is_ok(), "got {:?}", spec.validate());
    }

    #[test]
    fn test_limits_only_above_default_requests_keeps_defaults() {
        let spec = spec_with(
            1,
            ResourceRequirements {
                limits: ResourceSpec::new("250m", "8Gi"),
                requests: None,
            },
        );
        let requests = spec.resources.effective_requests();
        assert_eq!(requests.cpu.0, "250m");
        assert_eq!(requests.memory.0, "512Mi");
    }

    #[test]
    fn test_explicit_requests_are_not_capped() {
        let spec = spec_with(
            1,
            ResourceRequirements {
                limits: ResourceSpec::new("250m", "256Mi"),
                requests: Some(ResourceSpec::new("500m", "256Mi")),
            },
        );
        let errors = spec.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "spec.resources.requests.cpu");
    }

    #[test]
    fn test_numeric_quantities_are_accepted() {
        let spec: AppShareSpec = serde_json::from_value(serde_json::json!({
            "replicas": 1,
            "resources": { "limits": { "cpu": 2, "memory": "2Gi" } }
        }))
        .unwrap();

        assert_eq!(spec.resources.limits.cpu.0, "2");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_quantity_schema_is_int_or_string() {
        let crd = serde_json::to_value(AppShare::crd()).unwrap();
        let cpu = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]["spec"]
            ["properties"]["resources"]["properties"]["limits"]["properties"]["cpu"];
        assert_eq!(cpu["x-kubernetes-int-or-string"], serde_json::json!(true));
    }
}
