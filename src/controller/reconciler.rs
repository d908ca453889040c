//! Main reconciler for AppShare resources
//!
//! [`AppShareReconciler`] holds the reconcile algorithm and depends only on a
//! [`ResourceStore`]. The rest of this module wires it into the kube-rs
//! controller runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{
    api::Api,
    client::Client,
    runtime::{
        controller::{Action, Config as ControllerConfig, Controller},
        watcher::Config,
    },
    ResourceExt,
};
use tracing::{debug, error, info, instrument, warn};

use crate::crd::AppShare;
use crate::error::{Error, Result};

use super::managed::ManagedKind;
use super::store::{KubeStore, ObjectIdentity, ResourceStore};

/// What a single reconcile pass did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The AppShare no longer exists; cascade deletion handles the rest
    Gone,
    /// A managed object of this kind was created; another pass is needed
    Created(&'static str),
    /// Every managed object exists; lists the kinds patched this pass
    Converged { patched: Vec<&'static str> },
}

impl ReconcileOutcome {
    pub fn requeue(&self) -> bool {
        matches!(self, ReconcileOutcome::Created(_))
    }

    /// Whether the pass wrote anything
    pub fn changed(&self) -> bool {
        match self {
            ReconcileOutcome::Gone => false,
            ReconcileOutcome::Created(_) => true,
            ReconcileOutcome::Converged { patched } => !patched.is_empty(),
        }
    }
}

enum Presence<K> {
    Created,
    Existing(K),
}

/// Drives the managed objects of one AppShare toward its spec
///
/// Stateless between passes: everything a pass needs is fetched from the
/// store when it starts, so repeating or abandoning a pass is always safe.
pub struct AppShareReconciler<S> {
    store: S,
}

impl<S: ResourceStore> AppShareReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one reconcile pass for `id`.
    ///
    /// The Deployment is handled before the Service. Creating either one
    /// ends the pass with a requeue; drift is only corrected once both
    /// exist.
    #[instrument(skip(self), fields(appshare = %id))]
    pub async fn reconcile(&self, id: &ObjectIdentity) -> Result<ReconcileOutcome> {
        let Some(app) = self.store.fetch::<AppShare>(id).await? else {
            info!("AppShare {} not found, assuming it has been deleted", id);
            return Ok(ReconcileOutcome::Gone);
        };

        // Recreating dependents here would race the garbage collector.
        if app.metadata.deletion_timestamp.is_some() {
            info!("AppShare {} is being deleted, skipping", id);
            return Ok(ReconcileOutcome::Gone);
        }

        if let Err(errors) = app.spec.validate() {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            warn!("Validation failed for {}: {}", id, message);
            return Err(Error::ValidationError(message));
        }

        let deployment = match self.ensure_exists::<Deployment>(&app, id).await? {
            Presence::Created => return Ok(ReconcileOutcome::Created(Deployment::KIND)),
            Presence::Existing(deployment) => deployment,
        };

        let service = match self.ensure_exists::<Service>(&app, id).await? {
            Presence::Created => return Ok(ReconcileOutcome::Created(Service::KIND)),
            Presence::Existing(service) => service,
        };

        let mut patched = Vec::new();
        if self.converge(&app, id, &deployment).await? {
            patched.push(Deployment::KIND);
        }
        if self.converge(&app, id, &service).await? {
            patched.push(Service::KIND);
        }

        Ok(ReconcileOutcome::Converged { patched })
    }

    async fn ensure_exists<K: ManagedKind>(
        &self,
        app: &AppShare,
        id: &ObjectIdentity,
    ) -> Result<Presence<K>> {
        match self.store.fetch::<K>(id).await {
            Ok(Some(existing)) => return Ok(Presence::Existing(existing)),
            Ok(None) => {}
            Err(e) => {
                error!("Failed to get {} {}, check permissions: {}", K::KIND, id, e);
                return Err(e);
            }
        }

        let desired = K::build(app)?;
        info!("Creating a new {} {}", K::KIND, id);
        if let Err(e) = self.store.create(&desired).await {
            error!("Failed to create {} {}: {}", K::KIND, id, e);
            return Err(e);
        }

        Ok(Presence::Created)
    }

    /// Patch drifted owned fields. Returns whether an update was issued.
    async fn converge<K: ManagedKind>(
        &self,
        app: &AppShare,
        id: &ObjectIdentity,
        existing: &K,
    ) -> Result<bool> {
        let desired = K::build(app)?;
        let drift = K::diff(existing, &desired);
        if !drift.changed {
            debug!("{} {} is in sync", K::KIND, id);
            return Ok(false);
        }

        info!("Patching drifted {} {}", K::KIND, id);
        self.store.update(&drift.patched).await?;
        Ok(true)
    }
}

/// Tunables for the controller runtime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Namespace to watch; `None` watches every namespace
    pub namespace: Option<String>,
    /// Maximum number of AppShares reconciled at once (0 = unbounded)
    pub concurrency: u16,
    /// Delay before the follow-up pass after creating an object
    pub requeue_after_create: Duration,
    /// Periodic resync of converged AppShares
    pub resync_interval: Duration,
    /// Backoff after a retriable error
    pub error_backoff: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            concurrency: 4,
            requeue_after_create: Duration::from_secs(1),
            resync_interval: Duration::from_secs(300),
            error_backoff: Duration::from_secs(15),
        }
    }
}

impl ReconcilerConfig {
    /// Map a pass outcome to the runtime's next action
    pub fn action_for(&self, outcome: &ReconcileOutcome) -> Action {
        match outcome {
            ReconcileOutcome::Gone => Action::await_change(),
            ReconcileOutcome::Created(_) => Action::requeue(self.requeue_after_create),
            ReconcileOutcome::Converged { .. } => Action::requeue(self.resync_interval),
        }
    }

    /// Backoff for a failed pass. Errors that need a user fix wait a full
    /// resync interval.
    pub fn action_for_error(&self, error: &Error) -> Action {
        if error.is_retriable() {
            Action::requeue(self.error_backoff)
        } else {
            Action::requeue(self.resync_interval)
        }
    }
}

/// Shared state for the controller
pub struct ControllerState {
    pub reconciler: AppShareReconciler<KubeStore>,
    pub config: ReconcilerConfig,
}

impl ControllerState {
    pub fn new(client: Client, config: ReconcilerConfig) -> Self {
        Self {
            reconciler: AppShareReconciler::new(KubeStore::new(client)),
            config,
        }
    }
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Main entry point to start the controller
pub async fn run_controller(client: Client, config: ReconcilerConfig) -> Result<()> {
    let namespace = config.namespace.clone();
    let app_shares: Api<AppShare> = scoped_api(&client, namespace.as_deref());

    info!(
        "Starting AppShare controller (namespace: {})",
        namespace.as_deref().unwrap_or("<all>")
    );

    // Verify CRD exists
    match app_shares.list(&Default::default()).await {
        Ok(_) => info!("AppShare CRD is available"),
        Err(e) => {
            error!(
                "AppShare CRD not found. Please install the CRD first: {:?}",
                e
            );
            return Err(Error::ConfigError("AppShare CRD not installed".to_string()));
        }
    }

    let controller_config = ControllerConfig::default().concurrency(config.concurrency);
    let state = Arc::new(ControllerState::new(client.clone(), config));

    Controller::new(app_shares, Config::default())
        .owns::<Deployment>(scoped_api(&client, namespace.as_deref()), Config::default())
        .owns::<Service>(scoped_api(&client, namespace.as_deref()), Config::default())
        .with_config(controller_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            match res {
                Ok(obj) => debug!("Reconciled: {:?}", obj),
                Err(e) => warn!("Reconcile error: {:?}", e),
            }
        })
        .await;

    info!("AppShare controller stopped");
    Ok(())
}

/// The reconcile callback handed to the runtime
///
/// This function is called whenever:
/// - An AppShare is created, updated, or deleted
/// - An owned Deployment or Service changes
/// - A requeue timer expires
#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<AppShare>, ctx: Arc<ControllerState>) -> Result<Action> {
    let id = ObjectIdentity::of(obj.as_ref())?;
    let started = Instant::now();

    let result = ctx.reconciler.reconcile(&id).await;

    #[cfg(feature = "metrics")]
    super::metrics::observe_reconcile(&result, started.elapsed());
    #[cfg(not(feature = "metrics"))]
    let _ = started;

    let outcome = result?;
    if outcome.changed() {
        info!("Reconciled {}: {:?}", id, outcome);
    }
    Ok(ctx.config.action_for(&outcome))
}

/// Error policy determines how to handle reconciliation errors
fn error_policy(app: Arc<AppShare>, error: &Error, ctx: Arc<ControllerState>) -> Action {
    error!("Reconciliation error for {}: {:?}", app.name_any(), error);
    ctx.config.action_for_error(error)
}
