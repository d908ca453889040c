//! Controller module for AppShare reconciliation
//!
//! This module contains the reconcile loop, the desired-state builders,
//! drift detection and the store abstraction the loop runs against.

pub mod drift;
pub mod managed;
#[cfg(feature = "metrics")]
pub mod metrics;
mod reconciler;
pub mod resources;
pub mod store;
#[cfg(test)]
mod testing;

pub use drift::{diff_deployment, resources_equal, Drift};
pub use managed::ManagedKind;
pub use reconciler::{
    run_controller, AppShareReconciler, ControllerState, ReconcileOutcome, ReconcilerConfig,
};
pub use resources::{build_deployment, build_service, set_controller_reference};
pub use store::{KubeStore, ObjectIdentity, ResourceStore, StoredResource};
