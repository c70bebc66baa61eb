//! # Genezio Operator
//!
//! A Kubernetes controller that deploys the Genezio manager workload for every
//! `GenezioManager` resource.
//!
//! ## Overview
//!
//! For each `GenezioManager` the controller:
//!
//! 1. **Records progress** - `Available` and `Degraded` status conditions
//! 2. **Claims the resource** - adds a finalizer so deletion waits for cleanup
//! 3. **Deploys the workload** - a hardened, owner-referenced `Deployment` configured
//!    with the git provider, container registry and ArgoCD settings of the resource
//! 4. **Releases on delete** - runs finalizer work, then removes the finalizer
//!
//! ## Binaries
//!
//! - `genezio-operator` - the controller
//! - `crdgen` - prints the `GenezioManager` CRD as YAML
//! - `gmctl` - lists resources, shows status and triggers reconciliation

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;
