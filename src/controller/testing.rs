//! In-memory [`ResourceStore`] for reconciler tests

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use kube::core::ErrorResponse;

use crate::error::{Error, Result};

use super::store::{ObjectIdentity, ResourceStore, StoredResource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Fetch,
    Create,
    Update,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub kind: String,
    pub id: ObjectIdentity,
}

type Key = (String, ObjectIdentity);

/// Objects are kept as JSON so one map can hold every kind.
#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<BTreeMap<Key, serde_json::Value>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<VecDeque<(Op, String, u16)>>,
}

pub fn api_error(code: u16, reason: &str) -> Error {
    Error::KubeError(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("simulated {reason}"),
        reason: reason.to_string(),
        code,
    }))
}

fn key_of<K: StoredResource>(id: &ObjectIdentity) -> Key {
    (K::kind(&()).to_string(), id.clone())
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: StoredResource>(&self, obj: &K) {
        let id = ObjectIdentity::of(obj).unwrap();
        let value = serde_json::to_value(obj).unwrap();
        self.objects.lock().unwrap().insert(key_of::<K>(&id), value);
    }

    pub fn get<K: StoredResource>(&self, id: &ObjectIdentity) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&key_of::<K>(id))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn count<K: StoredResource>(&self) -> usize {
        let kind = K::kind(&()).to_string();
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Make the next `op` on kind `K` fail with an API error of `code`.
    pub fn fail_next<K: StoredResource>(&self, op: Op, code: u16) {
        self.failures
            .lock()
            .unwrap()
            .push_back((op, K::kind(&()).to_string(), code));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Creates and updates issued so far
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.op != Op::Fetch)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record<K: StoredResource>(&self, op: Op, id: &ObjectIdentity) -> Result<()> {
        let kind = K::kind(&()).to_string();
        self.calls.lock().unwrap().push(Call {
            op,
            kind: kind.clone(),
            id: id.clone(),
        });

        let mut failures = self.failures.lock().unwrap();
        if let Some(pos) = failures
            .iter()
            .position(|(fop, fkind, _)| *fop == op && *fkind == kind)
        {
            let (_, _, code) = failures.remove(pos).unwrap();
            return Err(api_error(code, "Injected"));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn fetch<K: StoredResource>(&self, id: &ObjectIdentity) -> Result<Option<K>> {
        self.record::<K>(Op::Fetch, id)?;
        let value = self.objects.lock().unwrap().get(&key_of::<K>(id)).cloned();
        match value {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    async fn create<K: StoredResource>(&self, obj: &K) -> Result<()> {
        let id = ObjectIdentity::of(obj)?;
        self.record::<K>(Op::Create, &id)?;
        let mut objects = self.objects.lock().unwrap();
        let key = key_of::<K>(&id);
        if objects.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists"));
        }
        objects.insert(key, serde_json::to_value(obj)?);
        Ok(())
    }

    async fn update<K: StoredResource>(&self, obj: &K) -> Result<()> {
        let id = ObjectIdentity::of(obj)?;
        self.record::<K>(Op::Update, &id)?;
        let mut objects = self.objects.lock().unwrap();
        let key = key_of::<K>(&id);
        if !objects.contains_key(&key) {
            return Err(api_error(404, "NotFound"));
        }
        objects.insert(key, serde_json::to_value(obj)?);
        Ok(())
    }
}
