//! Access to the cluster's object store
//!
//! [`ResourceStore`] is the only seam through which reconciliation touches
//! the API server. [`KubeStore`] implements it with `kube::Api`; tests use an
//! in-memory store instead.

use std::fmt;
use std::fmt::Debug;

use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Namespaced identity shared by an AppShare and the objects it manages
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentity {
    pub namespace: String,
    pub name: String,
}

impl ObjectIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of an existing object; both name and namespace must be set.
    pub fn of<K: Resource>(obj: &K) -> Result<Self> {
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or(Error::MissingObjectKey("metadata.name"))?;
        let namespace = obj
            .namespace()
            .ok_or(Error::MissingObjectKey("metadata.namespace"))?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Bounds every object passing through a [`ResourceStore`] satisfies.
pub trait StoredResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoredResource for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Fetch, create and update namespaced objects
///
/// `fetch` maps "not found" to `Ok(None)`; every other failure is an error
/// the caller surfaces. Implementations never retry on their own.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn fetch<K: StoredResource>(&self, id: &ObjectIdentity) -> Result<Option<K>>;

    async fn create<K: StoredResource>(&self, obj: &K) -> Result<()>;

    /// Replace an object. The object's resourceVersion guards against
    /// overwriting a concurrent change.
    async fn update<K: StoredResource>(&self, obj: &K) -> Result<()>;
}

/// [`ResourceStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoredResource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    #[instrument(skip(self), fields(kind = %K::kind(&())))]
    async fn fetch<K: StoredResource>(&self, id: &ObjectIdentity) -> Result<Option<K>> {
        match self.api::<K>(&id.namespace).get(&id.name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!("{} {} not found", K::kind(&()), id);
                Ok(None)
            }
            Err(e) => Err(Error::KubeError(e)),
        }
    }

    async fn create<K: StoredResource>(&self, obj: &K) -> Result<()> {
        let id = ObjectIdentity::of(obj)?;
        self.api::<K>(&id.namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(Error::KubeError)?;
        Ok(())
    }

    async fn update<K: StoredResource>(&self, obj: &K) -> Result<()> {
        let id = ObjectIdentity::of(obj)?;
        self.api::<K>(&id.namespace)
            .replace(&id.name, &PostParams::default(), obj)
            .await
            .map_err(Error::KubeError)?;
        Ok(())
    }
}
