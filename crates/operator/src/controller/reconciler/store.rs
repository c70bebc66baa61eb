//! # Resource Store
//!
//! The reconciler's only view of the cluster. Every write carries the resource
//! version read at fetch time; a stale version surfaces as [`StoreError::Conflict`]
//! instead of silently overwriting.

use crate::constants::FIELD_MANAGER;
use crate::crd::GenezioManager;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use std::fmt;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Namespace and name of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an object, defaulting the namespace like the API server does
    pub fn of<K: kube::Resource>(obj: &K) -> Self {
        Self::new(
            obj.namespace().unwrap_or_else(|| "default".to_string()),
            obj.name_any(),
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object changed since it was read
    #[error("conflict writing {kind} {key}: the object has been modified, refetch and retry")]
    Conflict { kind: &'static str, key: ObjectKey },
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: ObjectKey },
    #[error("kubernetes API error on {kind} {key}: {source}")]
    Kube {
        kind: &'static str,
        key: ObjectKey,
        #[source]
        source: kube::Error,
    },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Cluster operations used by the reconciler
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a `GenezioManager`; `None` if it does not exist
    async fn get_manager(&self, key: &ObjectKey) -> Result<Option<GenezioManager>, StoreError>;

    /// Write the status subresource, guarded by the resource version
    async fn update_manager_status(
        &self,
        manager: &GenezioManager,
    ) -> Result<GenezioManager, StoreError>;

    /// Write metadata and spec (finalizers), guarded by the resource version
    async fn update_manager(&self, manager: &GenezioManager)
        -> Result<GenezioManager, StoreError>;

    /// Fetch the owned Deployment; `None` if it does not exist
    async fn get_workload(&self, key: &ObjectKey) -> Result<Option<Deployment>, StoreError>;

    async fn create_workload(&self, workload: &Deployment) -> Result<Deployment, StoreError>;
}

/// Kubernetes-backed store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn managers(&self, namespace: &str) -> Api<GenezioManager> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a write error, turning 409 into the given variant
fn classify_write(
    kind: &'static str,
    key: ObjectKey,
    err: kube::Error,
    on_conflict: fn(&'static str, ObjectKey) -> StoreError,
) -> StoreError {
    match err {
        kube::Error::Api(ref api_err) if api_err.code == 409 => on_conflict(kind, key),
        source => StoreError::Kube { kind, key, source },
    }
}

fn conflict(kind: &'static str, key: ObjectKey) -> StoreError {
    StoreError::Conflict { kind, key }
}

fn already_exists(kind: &'static str, key: ObjectKey) -> StoreError {
    StoreError::AlreadyExists { kind, key }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_manager(&self, key: &ObjectKey) -> Result<Option<GenezioManager>, StoreError> {
        self.managers(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|source| StoreError::Kube {
                kind: "GenezioManager",
                key: key.clone(),
                source,
            })
    }

    async fn update_manager_status(
        &self,
        manager: &GenezioManager,
    ) -> Result<GenezioManager, StoreError> {
        let key = ObjectKey::of(manager);
        // resourceVersion in a merge patch makes the API server reject stale writes
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": manager.resource_version() },
            "status": manager.status,
        });
        self.managers(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|err| classify_write("GenezioManager", key, err, conflict))
    }

    async fn update_manager(
        &self,
        manager: &GenezioManager,
    ) -> Result<GenezioManager, StoreError> {
        let key = ObjectKey::of(manager);
        self.managers(&key.namespace)
            .replace(&key.name, &PostParams::default(), manager)
            .await
            .map_err(|err| classify_write("GenezioManager", key, err, conflict))
    }

    async fn get_workload(&self, key: &ObjectKey) -> Result<Option<Deployment>, StoreError> {
        self.deployments(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|source| StoreError::Kube {
                kind: "Deployment",
                key: key.clone(),
                source,
            })
    }

    async fn create_workload(&self, workload: &Deployment) -> Result<Deployment, StoreError> {
        let key = ObjectKey::of(workload);
        self.deployments(&key.namespace)
            .create(&PostParams::default(), workload)
            .await
            .map_err(|err| classify_write("Deployment", key, err, already_exists))
    }
}
