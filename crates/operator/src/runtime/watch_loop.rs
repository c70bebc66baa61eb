//! # Watch Loop
//!
//! Runs the kube-runtime controller for `GenezioManager` resources and the
//! Deployments they own until a shutdown signal arrives.

use crate::constants;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::GenezioManager;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::Api;
use kube_runtime::controller::{Controller, Error as ControllerError};
use kube_runtime::watcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Run the controller until SIGTERM or SIGINT
///
/// Changes to an owned Deployment trigger a pass for its `GenezioManager`.
pub async fn run_watch_loop(
    managers: Api<GenezioManager>,
    deployments: Api<Deployment>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    let watch_backoff = Arc::new(AtomicU64::new(constants::DEFAULT_WATCH_INITIAL_BACKOFF_MS));

    info!("Starting GenezioManager controller");
    Controller::new(managers, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| {
            let watch_backoff = Arc::clone(&watch_backoff);
            async move {
                match result {
                    Ok((object, action)) => {
                        watch_backoff.store(
                            constants::DEFAULT_WATCH_INITIAL_BACKOFF_MS,
                            Ordering::Relaxed,
                        );
                        debug!("Reconciled {}: {:?}", object, action);
                    }
                    // Already logged and requeued by the error policy
                    Err(ControllerError::ReconcilerFailed(e, object)) => {
                        debug!("Reconciliation of {} failed: {}", object, e);
                    }
                    Err(e) => {
                        handle_watch_stream_error(
                            &e.to_string(),
                            &watch_backoff,
                            constants::DEFAULT_WATCH_MAX_BACKOFF_MS,
                        )
                        .await;
                    }
                }
            }
        })
        .await;

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controller stopped");
    Ok(())
}
