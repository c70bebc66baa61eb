//! Shared test fixtures: an in-memory `ResourceStore` and `GenezioManager` builders.
//!
//! The store behaves like the API server for the operations the reconciler uses:
//! every write checks and bumps the resource version, status and metadata writes
//! only touch their own part of the object, and clearing the last finalizer of a
//! deleting resource removes it together with the Deployments it owns.

#![allow(dead_code, reason = "Each test binary uses a different subset of the fixtures")]

use async_trait::async_trait;
use genezio_operator::config::ControllerConfig;
use genezio_operator::controller::reconciler::{
    reconcile_manager, FinalizeHook, ObjectKey, ReconcileOutcome, Reconciler, ReconcilerError,
    ResourceStore, StoreError,
};
use genezio_operator::controller::workload::{ImageResolver, StaticImageResolver};
use genezio_operator::crd::{Condition, GenezioManager, GenezioManagerSpec};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "genezio-system";
pub const NAME: &str = "genezio";
pub const IMAGE: &str = "registry.genez.io/manager:v1.2.3";

/// Write operations as recorded by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Status {
        key: ObjectKey,
        conditions: Vec<Condition>,
    },
    Finalizers {
        key: ObjectKey,
        finalizers: Vec<String>,
    },
    CreateWorkload {
        key: ObjectKey,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Status,
    Finalizers,
    CreateWorkload,
}

impl Write {
    fn kind(&self) -> WriteKind {
        match self {
            Write::Status { .. } => WriteKind::Status,
            Write::Finalizers { .. } => WriteKind::Finalizers,
            Write::CreateWorkload { .. } => WriteKind::CreateWorkload,
        }
    }
}

/// Fail the write of `kind` that comes after `skip` successful ones
#[derive(Debug)]
struct Fault {
    kind: WriteKind,
    skip: usize,
}

#[derive(Debug, Default)]
struct Inner {
    managers: BTreeMap<ObjectKey, GenezioManager>,
    workloads: BTreeMap<ObjectKey, Deployment>,
    version: u64,
    writes: Vec<Write>,
    faults: Vec<Fault>,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    /// Consume a matching fault, if one is due
    fn take_fault(&mut self, kind: WriteKind) -> bool {
        let Some(index) = self.faults.iter().position(|f| f.kind == kind) else {
            return false;
        };
        if self.faults[index].skip == 0 {
            self.faults.remove(index);
            true
        } else {
            self.faults[index].skip -= 1;
            false
        }
    }

    fn check_version(&self, manager: &GenezioManager) -> Result<ObjectKey, StoreError> {
        let key = ObjectKey::of(manager);
        let stored = self.managers.get(&key).ok_or_else(|| StoreError::Conflict {
            kind: "GenezioManager",
            key: key.clone(),
        })?;
        if stored.resource_version() != manager.resource_version() {
            return Err(StoreError::Conflict {
                kind: "GenezioManager",
                key,
            });
        }
        Ok(key)
    }

    /// Remove a released resource and everything it owns
    fn release(&mut self, key: &ObjectKey) {
        let Some(manager) = self.managers.remove(key) else {
            return;
        };
        let uid = manager.uid();
        self.workloads.retain(|_, deployment| {
            !deployment
                .owner_references()
                .iter()
                .any(|owner| Some(&owner.uid) == uid.as_ref())
        });
    }
}

/// In-memory store with optimistic concurrency
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a resource as if a user had created it
    pub fn insert(&self, mut manager: GenezioManager) -> GenezioManager {
        let mut inner = self.inner.lock().unwrap();
        manager.metadata.resource_version = Some(inner.next_version());
        if manager.metadata.uid.is_none() {
            manager.metadata.uid = Some(format!("uid-{}", manager.name_any()));
        }
        inner
            .managers
            .insert(ObjectKey::of(&manager), manager.clone());
        manager
    }

    pub fn insert_workload(&self, mut deployment: Deployment) {
        let mut inner = self.inner.lock().unwrap();
        deployment.metadata.resource_version = Some(inner.next_version());
        inner
            .workloads
            .insert(ObjectKey::of(&deployment), deployment);
    }

    /// Request deletion; without finalizers the resource goes away at once
    pub fn delete(&self, key: &ObjectKey) {
        let mut inner = self.inner.lock().unwrap();
        let version = inner.next_version();
        let Some(manager) = inner.managers.get_mut(key) else {
            return;
        };
        if manager.finalizers().is_empty() {
            inner.release(key);
            return;
        }
        manager.metadata.deletion_timestamp = Some(deletion_time());
        manager.metadata.resource_version = Some(version);
    }

    /// Bump the stored version, as a concurrent writer would
    pub fn touch(&self, key: &ObjectKey) {
        let mut inner = self.inner.lock().unwrap();
        let version = inner.next_version();
        if let Some(manager) = inner.managers.get_mut(key) {
            manager.metadata.resource_version = Some(version);
        }
    }

    /// Fail the next write of `kind` with a conflict, after letting `skip` through
    pub fn fail_write(&self, kind: WriteKind, skip: usize) {
        self.inner
            .lock()
            .unwrap()
            .faults
            .push(Fault { kind, skip });
    }

    pub fn manager(&self, key: &ObjectKey) -> Option<GenezioManager> {
        self.inner.lock().unwrap().managers.get(key).cloned()
    }

    pub fn workload(&self, key: &ObjectKey) -> Option<Deployment> {
        self.inner.lock().unwrap().workloads.get(key).cloned()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner.lock().unwrap().writes.clear();
    }

    fn record(&self, inner: &mut Inner, write: Write) -> Result<(), StoreError> {
        let kind = write.kind();
        if inner.take_fault(kind) {
            let key = match &write {
                Write::Status { key, .. }
                | Write::Finalizers { key, .. }
                | Write::CreateWorkload { key } => key.clone(),
            };
            return Err(StoreError::Conflict {
                kind: "injected",
                key,
            });
        }
        inner.writes.push(write);
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_manager(&self, key: &ObjectKey) -> Result<Option<GenezioManager>, StoreError> {
        Ok(self.manager(key))
    }

    async fn update_manager_status(
        &self,
        manager: &GenezioManager,
    ) -> Result<GenezioManager, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = inner.check_version(manager)?;
        let conditions = manager
            .status
            .as_ref()
            .map(|s| s.conditions.clone())
            .unwrap_or_default();
        self.record(
            &mut inner,
            Write::Status {
                key: key.clone(),
                conditions,
            },
        )?;

        let version = inner.next_version();
        let stored = inner
            .managers
            .get_mut(&key)
            .ok_or_else(|| StoreError::Conflict {
                kind: "GenezioManager",
                key: key.clone(),
            })?;
        stored.status = manager.status.clone();
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn update_manager(
        &self,
        manager: &GenezioManager,
    ) -> Result<GenezioManager, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = inner.check_version(manager)?;
        self.record(
            &mut inner,
            Write::Finalizers {
                key: key.clone(),
                finalizers: manager.finalizers().to_vec(),
            },
        )?;

        let version = inner.next_version();
        let stored = inner
            .managers
            .get_mut(&key)
            .ok_or_else(|| StoreError::Conflict {
                kind: "GenezioManager",
                key: key.clone(),
            })?;
        stored.metadata.finalizers = manager.metadata.finalizers.clone();
        stored.metadata.resource_version = Some(version);
        let updated = stored.clone();

        if updated.metadata.deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            inner.release(&key);
        }
        Ok(updated)
    }

    async fn get_workload(&self, key: &ObjectKey) -> Result<Option<Deployment>, StoreError> {
        Ok(self.workload(key))
    }

    async fn create_workload(&self, workload: &Deployment) -> Result<Deployment, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = ObjectKey::of(workload);
        if inner.workloads.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: "Deployment",
                key,
            });
        }
        self.record(&mut inner, Write::CreateWorkload { key: key.clone() })?;

        let mut created = workload.clone();
        created.metadata.resource_version = Some(inner.next_version());
        inner.workloads.insert(key, created.clone());
        Ok(created)
    }
}

/// Finalizer work that counts its calls and fails the first `failures` of them
#[derive(Debug, Default)]
pub struct CountingFinalizer {
    pub calls: AtomicUsize,
    pub failures: usize,
}

impl CountingFinalizer {
    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FinalizeHook for CountingFinalizer {
    async fn finalize(&self, manager: &GenezioManager) -> anyhow::Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            anyhow::bail!("cleanup for {} not finished", manager.name_any());
        }
        Ok(())
    }
}

pub fn key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, NAME)
}

pub fn spec() -> GenezioManagerSpec {
    serde_json::from_value(serde_json::json!({
        "region": "eu-central-1",
        "containerPort": 8080,
        "chartRepo": "https://github.com/Genez-io/charts",
        "chartRev": "main",
        "argocdConfig": {
            "url": "https://argocd.example.com",
            "password": "argocd-pass"
        },
        "gitConfig": {
            "provider": "gitea",
            "deployementRepoName": "deployments",
            "gitea": {
                "url": "https://gitea.example.com",
                "username": "genezio",
                "password": "gitea-pass",
                "token": "gitea-token"
            }
        },
        "containerRegistryConfig": {
            "url": "registry.example.com",
            "username": "pusher",
            "password": "registry-pass"
        }
    }))
    .unwrap()
}

pub fn manager(spec: GenezioManagerSpec) -> GenezioManager {
    let mut gm = GenezioManager::new(NAME, spec);
    gm.metadata.namespace = Some(NAMESPACE.to_string());
    gm
}

pub fn deletion_time() -> Time {
    serde_json::from_value(serde_json::json!("2024-05-01T10:00:00Z")).unwrap()
}

pub fn config() -> ControllerConfig {
    ControllerConfig {
        workload_settle_secs: 60,
        ..ControllerConfig::default()
    }
}

pub fn reconciler(store: &Arc<MemoryStore>, images: impl ImageResolver + 'static) -> Reconciler {
    Reconciler::new(
        Arc::clone(store) as Arc<dyn ResourceStore>,
        Arc::new(images),
        config(),
    )
}

pub fn default_reconciler(store: &Arc<MemoryStore>) -> Reconciler {
    reconciler(store, StaticImageResolver::new(IMAGE))
}

/// Run passes until one ends with `Done`, treating every requeue as immediate
///
/// Returns the outcomes in order; panics on an error or if it never settles.
pub async fn drive(ctx: &Reconciler, key: &ObjectKey) -> Vec<ReconcileOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..10 {
        let outcome = reconcile_manager(ctx, key)
            .await
            .unwrap_or_else(|e| panic!("pass failed: {e}"));
        outcomes.push(outcome);
        if outcome == ReconcileOutcome::Done {
            return outcomes;
        }
    }
    panic!("reconciliation did not settle: {outcomes:?}");
}

/// Run one pass, expecting an error
pub async fn pass_err(ctx: &Reconciler, key: &ObjectKey) -> ReconcilerError {
    match reconcile_manager(ctx, key).await {
        Ok(outcome) => panic!("expected an error, got {outcome:?}"),
        Err(e) => e,
    }
}
