//! # Controller
//!
//! Reconciliation logic and supporting pieces for `GenezioManager` resources.

pub mod backoff;
pub mod conditions;
pub mod finalizer;
pub mod reconciler;
pub mod server;
pub mod workload;
