//! # Reconcile Loop
//!
//! One pass fetches the `GenezioManager`, derives its [`LifecycleState`] and
//! performs the single transition that state calls for:
//!
//! - `Uninitialized`: record `Available=Unknown`, requeue now
//! - `Initializing`: add the finalizer, requeue now
//! - `Terminating`: `Degraded=Unknown`, run finalizer work, `Degraded=True`,
//!   release the finalizer
//! - `Active`: create the Deployment if missing (requeue after the settle delay),
//!   otherwise record `Available=True` and stop
//!
//! A failed write aborts the pass with the error; the next pass resumes from
//! whatever was durably stored. Passes for the same resource are serialized by
//! the dispatcher.

use super::state::LifecycleState;
use super::store::ObjectKey;
use super::types::{ReconcileOutcome, Reconciler, ReconcilerError};
use crate::constants::{
    CONDITION_AVAILABLE, CONDITION_DEGRADED, FINALIZER, REASON_FINALIZING, REASON_RECONCILING,
};
use crate::controller::conditions::set_condition;
use crate::controller::finalizer::{add_finalizer, remove_finalizer};
use crate::controller::workload::deployment_for;
use crate::crd::{Condition, ConditionStatus, GenezioManager};
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

/// Entry point for the kube-runtime controller
pub async fn reconcile(
    obj: Arc<GenezioManager>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let key = ObjectKey::of(&*obj);
    let span = info_span!(
        "controller.reconcile",
        resource.namespace = %key.namespace,
        resource.name = %key.name,
    );

    async move {
        let start = Instant::now();
        observability::metrics::increment_reconciliations();

        let result = reconcile_manager(&ctx, &key).await;
        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        let outcome = result?;
        ctx.reset_backoff(&key);
        observability::metrics::increment_requeues_total(outcome.reason());
        Ok(outcome.into_action())
    }
    .instrument(span)
    .await
}

/// Run one reconciliation pass for the resource at `key`
pub async fn reconcile_manager(
    ctx: &Reconciler,
    key: &ObjectKey,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let Some(manager) = ctx.store.get_manager(key).await? else {
        debug!("GenezioManager {} not found, assuming it was deleted", key);
        return Ok(ReconcileOutcome::Done);
    };

    let state = LifecycleState::of(&manager);
    debug!(state = state.as_str(), "Reconciling GenezioManager {}", key);

    match state {
        LifecycleState::Released => Ok(ReconcileOutcome::Done),
        LifecycleState::Uninitialized => initialize_status(ctx, key, manager).await,
        LifecycleState::Initializing => claim(ctx, key, manager).await,
        LifecycleState::Terminating => finalize(ctx, key, manager).await,
        LifecycleState::Active => ensure_workload(ctx, key, manager).await,
    }
}

async fn initialize_status(
    ctx: &Reconciler,
    key: &ObjectKey,
    mut manager: GenezioManager,
) -> Result<ReconcileOutcome, ReconcilerError> {
    set_manager_condition(
        &mut manager,
        Condition::new(
            CONDITION_AVAILABLE,
            ConditionStatus::Unknown,
            REASON_RECONCILING,
            "Starting reconciliation",
        ),
    );
    persist_status(ctx, &manager).await?;
    // Refetch so the next write starts from the latest resource version
    refetch(ctx, key).await?;
    Ok(ReconcileOutcome::RequeueNow)
}

async fn claim(
    ctx: &Reconciler,
    key: &ObjectKey,
    mut manager: GenezioManager,
) -> Result<ReconcileOutcome, ReconcilerError> {
    if add_finalizer(&mut manager, FINALIZER) {
        info!("Adding finalizer to GenezioManager {}", key);
        ctx.store.update_manager(&manager).await.inspect_err(|e| {
            error!("Failed to update GenezioManager {} to add finalizer: {}", key, e);
        })?;
    }
    Ok(ReconcileOutcome::RequeueNow)
}

async fn finalize(
    ctx: &Reconciler,
    key: &ObjectKey,
    mut manager: GenezioManager,
) -> Result<ReconcileOutcome, ReconcilerError> {
    info!("Performing finalizer operations for GenezioManager {} before delete", key);
    let name = manager.name_any();

    if set_manager_condition(
        &mut manager,
        Condition::new(
            CONDITION_DEGRADED,
            ConditionStatus::Unknown,
            REASON_FINALIZING,
            format!("Performing finalizer operations for the custom resource: {name} "),
        ),
    ) {
        persist_status(ctx, &manager).await?;
    }
    let mut manager = refetch(ctx, key).await?;

    ctx.finalizer
        .finalize(&manager)
        .await
        .map_err(|source| ReconcilerError::Finalizer {
            key: key.clone(),
            source,
        })?;

    if set_manager_condition(
        &mut manager,
        Condition::new(
            CONDITION_DEGRADED,
            ConditionStatus::True,
            REASON_FINALIZING,
            format!(
                "Finalizer operations for custom resource {name} name were successfully accomplished"
            ),
        ),
    ) {
        manager = persist_status(ctx, &manager).await?;
    }

    if remove_finalizer(&mut manager, FINALIZER) {
        info!("Removing finalizer from GenezioManager {}", key);
        ctx.store.update_manager(&manager).await.inspect_err(|e| {
            error!("Failed to remove finalizer from GenezioManager {}: {}", key, e);
        })?;
    }
    observability::metrics::increment_finalizations();
    Ok(ReconcileOutcome::Done)
}

async fn ensure_workload(
    ctx: &Reconciler,
    key: &ObjectKey,
    mut manager: GenezioManager,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let name = manager.name_any();

    // Existing Deployments are not compared against the desired state
    if ctx.store.get_workload(key).await?.is_some() {
        if set_manager_condition(
            &mut manager,
            Condition::new(
                CONDITION_AVAILABLE,
                ConditionStatus::True,
                REASON_RECONCILING,
                format!("Deployment for custom resource ({name}) created successfully"),
            ),
        ) {
            persist_status(ctx, &manager).await?;
        }
        return Ok(ReconcileOutcome::Done);
    }

    let deployment = match deployment_for(&manager, ctx.images.as_ref(), &ctx.git_providers) {
        Ok(deployment) => deployment,
        Err(e) => {
            error!("Failed to define new Deployment for GenezioManager {}: {}", key, e);
            if set_manager_condition(
                &mut manager,
                Condition::new(
                    CONDITION_AVAILABLE,
                    ConditionStatus::False,
                    REASON_RECONCILING,
                    format!("Failed to create Deployment for the custom resource ({name}): ({e})"),
                ),
            ) {
                persist_status(ctx, &manager).await?;
            }
            return Err(e.into());
        }
    };

    info!("Creating a new Deployment {}", key);
    ctx.store
        .create_workload(&deployment)
        .await
        .inspect_err(|e| error!("Failed to create new Deployment {}: {}", key, e))?;
    observability::metrics::increment_workloads_created();

    Ok(ReconcileOutcome::RequeueAfter(ctx.config.workload_settle_delay()))
}

/// Set a condition on the manager's status, creating the status if needed
fn set_manager_condition(manager: &mut GenezioManager, condition: Condition) -> bool {
    let status = manager.status.get_or_insert_with(Default::default);
    set_condition(&mut status.conditions, condition)
}

async fn persist_status(
    ctx: &Reconciler,
    manager: &GenezioManager,
) -> Result<GenezioManager, ReconcilerError> {
    ctx.store
        .update_manager_status(manager)
        .await
        .inspect_err(|e| error!("Failed to update GenezioManager status: {}", e))
        .map_err(Into::into)
}

async fn refetch(ctx: &Reconciler, key: &ObjectKey) -> Result<GenezioManager, ReconcilerError> {
    ctx.store
        .get_manager(key)
        .await?
        .ok_or_else(|| ReconcilerError::Vanished(key.clone()))
}
