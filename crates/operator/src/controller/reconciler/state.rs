//! # Lifecycle State
//!
//! The lifecycle state of a `GenezioManager`, derived from its stored fields.
//! Every pass derives it again from freshly fetched state; nothing is carried over.

use crate::constants::FINALIZER;
use crate::controller::finalizer::{has_finalizer, is_being_deleted};
use crate::crd::GenezioManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Deletion requested and our finalizer is gone: nothing left for us to do
    Released,
    /// No status conditions recorded yet
    Uninitialized,
    /// Deletion requested while our finalizer is still present
    Terminating,
    /// Not being deleted, finalizer not yet added
    Initializing,
    /// Finalizer present, not being deleted: ensure the workload
    Active,
}

impl LifecycleState {
    pub fn of(manager: &GenezioManager) -> Self {
        let deleting = is_being_deleted(manager);
        let finalized = has_finalizer(manager, FINALIZER);
        let has_conditions = manager
            .status
            .as_ref()
            .is_some_and(|s| !s.conditions.is_empty());

        match (deleting, finalized, has_conditions) {
            (true, false, _) => LifecycleState::Released,
            (_, _, false) => LifecycleState::Uninitialized,
            (true, true, true) => LifecycleState::Terminating,
            (false, false, true) => LifecycleState::Initializing,
            (false, true, true) => LifecycleState::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Released => "Released",
            LifecycleState::Uninitialized => "Uninitialized",
            LifecycleState::Terminating => "Terminating",
            LifecycleState::Initializing => "Initializing",
            LifecycleState::Active => "Active",
        }
    }
}
