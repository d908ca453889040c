//! Prometheus metrics for the AppShare operator
//!
//! # Exported metrics
//! The `/metrics` endpoint (when built with `--features metrics`) exports:
//! - `appshare_reconcile_duration_seconds` (histogram): duration of reconcile passes.
//! - `appshare_reconcile_errors_total` (counter): failed passes labeled by error kind.
//! - `appshare_managed_objects_created_total` (counter): creations labeled by object kind.
//! - `appshare_drift_corrections_total` (counter): drift patches labeled by object kind.

use std::sync::atomic::AtomicU64;
use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

use crate::error::{Error, Result};

use super::reconciler::ReconcileOutcome;

/// Labels for error metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    /// Error kind/category, e.g. "kube", "validation"
    pub kind: String,
}

/// Labels for per-object-kind metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ObjectKindLabels {
    /// Managed object kind, e.g. "Deployment"
    pub kind: String,
}

/// Histogram tracking reconcile duration (seconds)
pub static RECONCILE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    // 1ms .. ~32s across 16 buckets.
    Histogram::new(exponential_buckets(0.001, 2.0, 16))
});

/// Counter tracking reconcile errors
pub static RECONCILE_ERRORS_TOTAL: Lazy<Family<ErrorLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Counter tracking managed objects created
pub static MANAGED_OBJECTS_CREATED_TOTAL: Lazy<Family<ObjectKindLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Counter tracking drift corrections applied
pub static DRIFT_CORRECTIONS_TOTAL: Lazy<Family<ObjectKindLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Registry served on `/metrics`. Counter names get their `_total` suffix
/// from the encoder.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();

    registry.register(
        "appshare_reconcile_duration_seconds",
        "Duration of reconcile passes in seconds",
        RECONCILE_DURATION_SECONDS.clone(),
    );
    registry.register(
        "appshare_reconcile_errors",
        "Total number of failed reconcile passes",
        RECONCILE_ERRORS_TOTAL.clone(),
    );
    registry.register(
        "appshare_managed_objects_created",
        "Total number of managed objects created",
        MANAGED_OBJECTS_CREATED_TOTAL.clone(),
    );
    registry.register(
        "appshare_drift_corrections",
        "Total number of drift patches applied to managed objects",
        DRIFT_CORRECTIONS_TOTAL.clone(),
    );

    registry
});

/// Record the result of one reconcile pass
pub fn observe_reconcile(result: &Result<ReconcileOutcome>, elapsed: Duration) {
    RECONCILE_DURATION_SECONDS.observe(elapsed.as_secs_f64());

    match result {
        Ok(ReconcileOutcome::Created(kind)) => inc_created(kind),
        Ok(ReconcileOutcome::Converged { patched }) => {
            for kind in patched {
                inc_drift_correction(kind);
            }
        }
        Ok(ReconcileOutcome::Gone) => {}
        Err(e) => inc_reconcile_error(e),
    }
}

pub fn inc_reconcile_error(error: &Error) {
    RECONCILE_ERRORS_TOTAL
        .get_or_create(&ErrorLabels {
            kind: error.metric_label().to_string(),
        })
        .inc();
}

pub fn inc_created(kind: &str) {
    MANAGED_OBJECTS_CREATED_TOTAL
        .get_or_create(&ObjectKindLabels {
            kind: kind.to_string(),
        })
        .inc();
}

pub fn inc_drift_correction(kind: &str) {
    DRIFT_CORRECTIONS_TOTAL
        .get_or_create(&ObjectKindLabels {
            kind: kind.to_string(),
        })
        .inc();
}

/// Encode the registry in the Prometheus text format
pub fn encode_registry() -> Result<String> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &REGISTRY)
        .map_err(|e| Error::ConfigError(format!("Failed to encode metrics: {e}")))?;
    Ok(buffer)
}
