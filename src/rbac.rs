//! RBAC rules required by the operator's service account
//!
//! The operator reads and writes AppShares and creates, reads and updates
//! the Deployments and Services it manages. It never deletes them: removal
//! happens through owner-reference garbage collection.

use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule};
use kube::api::ObjectMeta;
use kube::Resource;

use crate::crd::AppShare;

pub const CLUSTER_ROLE_NAME: &str = "appshare-operator";

const MANAGED_VERBS: &[&str] = &["get", "list", "watch", "create", "update", "patch"];

fn rule(group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![group.to_string()]),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        ..Default::default()
    }
}

/// The ClusterRole granting the operator everything it needs
pub fn cluster_role() -> ClusterRole {
    let group = AppShare::group(&()).to_string();
    let plural = AppShare::plural(&()).to_string();

    ClusterRole {
        metadata: ObjectMeta {
            name: Some(CLUSTER_ROLE_NAME.to_string()),
            ..Default::default()
        },
        rules: Some(vec![
            rule(
                &group,
                &[plural.as_str()],
                &["get", "list", "watch", "create", "update", "patch", "delete"],
            ),
            rule(&group, &[format!("{plural}/status").as_str()], &["get", "update", "patch"]),
            rule(&group, &[format!("{plural}/finalizers").as_str()], &["update"]),
            rule("apps", &["deployments"], MANAGED_VERBS),
            rule("", &["services"], MANAGED_VERBS),
        ]),
        ..Default::default()
    }
}
