//! # Reconciler
//!
//! Drives a `GenezioManager` through its lifecycle: status initialization,
//! finalizer registration, workload creation and finalization on delete.

mod reconcile;
mod state;
mod store;
mod types;

pub use reconcile::{reconcile, reconcile_manager};
pub use state::LifecycleState;
pub use store::{KubeStore, ObjectKey, ResourceStore, StoreError};
pub use types::{FinalizeHook, NoopFinalizer, ReconcileOutcome, Reconciler, ReconcilerError};

#[cfg(test)]
pub use store::MockResourceStore;
