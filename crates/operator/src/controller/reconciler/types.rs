//! # Reconciler Types
//!
//! Reconciler context, outcomes and errors.

use super::store::{ObjectKey, ResourceStore, StoreError};
use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::controller::workload::{GitProviders, ImageResolver, SynthesisError};
use crate::crd::GenezioManager;
use async_trait::async_trait;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Reconciler errors
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to build workload: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("finalizer operations for {key} failed: {source}")]
    Finalizer {
        key: ObjectKey,
        #[source]
        source: anyhow::Error,
    },
    /// The resource disappeared between a write and the refetch that follows it
    #[error("GenezioManager {0} disappeared during reconciliation")]
    Vanished(ObjectKey),
}

impl ReconcilerError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcilerError::Store(err) if err.is_conflict())
    }

    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcilerError::Synthesis(_) => "synthesis",
            ReconcilerError::Store(err) if err.is_conflict() => "conflict",
            ReconcilerError::Store(_) => "store",
            ReconcilerError::Finalizer { .. } => "finalizer",
            ReconcilerError::Vanished(_) => "vanished",
        }
    }
}

/// What the dispatcher should do after a successful pass
///
/// The next pass always starts from freshly fetched state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Run another pass right away
    RequeueNow,
    /// Run another pass after the delay
    RequeueAfter(Duration),
    /// Nothing left to do until the resource or its workload changes
    Done,
}

impl ReconcileOutcome {
    pub fn into_action(self) -> Action {
        match self {
            ReconcileOutcome::RequeueNow => Action::requeue(Duration::ZERO),
            ReconcileOutcome::RequeueAfter(delay) => Action::requeue(delay),
            ReconcileOutcome::Done => Action::await_change(),
        }
    }

    /// Label for the requeue metric
    pub fn reason(self) -> &'static str {
        match self {
            ReconcileOutcome::RequeueNow => "requeue-now",
            ReconcileOutcome::RequeueAfter(_) => "requeue-after",
            ReconcileOutcome::Done => "done",
        }
    }
}

/// Work performed before the finalizer is released
#[async_trait]
pub trait FinalizeHook: Send + Sync + fmt::Debug {
    async fn finalize(&self, manager: &GenezioManager) -> anyhow::Result<()>;
}

/// Finalizer work that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFinalizer;

#[async_trait]
impl FinalizeHook for NoopFinalizer {
    async fn finalize(&self, _manager: &GenezioManager) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reconciler context shared by every pass
pub struct Reconciler {
    pub store: Arc<dyn ResourceStore>,
    pub images: Arc<dyn ImageResolver>,
    pub git_providers: GitProviders,
    pub finalizer: Arc<dyn FinalizeHook>,
    pub config: ControllerConfig,
    /// Per-resource backoff, keyed by `namespace/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("images", &self.images)
            .field("git_providers", &self.git_providers)
            .field("finalizer", &self.finalizer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Reconciler with the default git providers and no finalizer work
    pub fn new(
        store: Arc<dyn ResourceStore>,
        images: Arc<dyn ImageResolver>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            images,
            git_providers: GitProviders::default(),
            finalizer: Arc::new(NoopFinalizer),
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_finalizer(mut self, finalizer: Arc<dyn FinalizeHook>) -> Self {
        self.finalizer = finalizer;
        self
    }

    /// Forget the error history of a resource after a successful pass
    pub fn reset_backoff(&self, key: &ObjectKey) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(&key.to_string());
        }
    }
}
