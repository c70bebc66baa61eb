//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::constants;
use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::{ObjectKey, Reconciler, ReconcilerError};
use crate::crd::GenezioManager;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with per-resource Fibonacci backoff
///
/// Conflicts mean another writer got there first; they are retried after a short fixed
/// delay without growing the backoff. Every other error advances the resource's backoff.
pub fn handle_reconciliation_error(
    obj: Arc<GenezioManager>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let key = ObjectKey::of(&*obj);

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %key.name,
        resource.namespace = %key.namespace,
        error.kind = error.kind(),
    );
    let _error_guard = error_span.enter();

    observability::metrics::increment_reconciliation_errors(error.kind());

    if error.is_conflict() {
        let delay = ctx.config.conflict_requeue_delay();
        warn!(
            "Conflict reconciling GenezioManager {}, retrying in {}s: {}",
            key,
            delay.as_secs(),
            error
        );
        observability::metrics::increment_requeues_total("conflict");
        return Action::requeue(delay);
    }

    error!("Reconciliation error for GenezioManager {}: {:?}", key, error);

    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(key.to_string()).or_insert_with(|| {
                BackoffState::new(ctx.config.backoff_min_secs, ctx.config.backoff_max_secs)
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (ctx.config.backoff_min_secs, 0)
        }
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}), next attempt at {}",
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Classifies watch errors (401, 410, 429, not found) and sleeps where the error
/// calls for it before the watcher retries.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
) {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match WatchErrorKind::classify(error_string) {
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized), RBAC may have been revoked or token expired");
            error!("Verify RBAC permissions are still active:");
            error!("  kubectl auth can-i watch geneziomanagers.init.genezio.com --as=system:serviceaccount:<namespace>:genezio-operator");
            warn!(
                "Waiting {}s before retrying watch",
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS
            );
            tokio::time::sleep(Duration::from_secs(
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS,
            ))
            .await;
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410), watch will restart");
        }
        WatchErrorKind::Throttled => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            let new_backoff = current_backoff.saturating_mul(2).min(max_backoff_ms);
            backoff.store(new_backoff, Ordering::Relaxed);
        }
        WatchErrorKind::NotFound => {
            warn!("Resource not found (likely deleted), continuing watch");
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(Duration::from_secs(
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS,
            ))
            .await;
        }
    }
}

/// Watch error classes that call for different handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

impl WatchErrorKind {
    pub fn classify(error_string: &str) -> Self {
        if error_string.contains("401") || error_string.contains("Unauthorized") {
            WatchErrorKind::Unauthorized
        } else if error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone")
        {
            WatchErrorKind::Expired
        } else if error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests")
        {
            WatchErrorKind::Throttled
        } else if error_string.contains("ObjectNotFound")
            || (error_string.contains("404") && error_string.contains("not found"))
        {
            WatchErrorKind::NotFound
        } else {
            WatchErrorKind::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::reconciler::{MockResourceStore, StoreError};
    use crate::controller::workload::{StaticImageResolver, SynthesisError};
    use crate::crd::GenezioManagerSpec;

    fn manager() -> Arc<GenezioManager> {
        let spec: GenezioManagerSpec = serde_json::from_value(serde_json::json!({
            "argocdConfig": {},
            "gitConfig": { "provider": "gitea", "deployementRepoName": "deployments" },
            "containerRegistryConfig": { "url": "registry", "username": "user" },
            "region": "eu",
            "containerPort": 8080,
            "chartRepo": "repo",
            "chartRev": "main"
        }))
        .unwrap();
        let mut gm = GenezioManager::new("gm", spec);
        gm.metadata.namespace = Some("genezio".to_string());
        Arc::new(gm)
    }

    fn reconciler() -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            Arc::new(MockResourceStore::new()),
            Arc::new(StaticImageResolver::missing()),
            ControllerConfig {
                backoff_min_secs: 5,
                backoff_max_secs: 20,
                conflict_requeue_secs: 1,
                ..ControllerConfig::default()
            },
        ))
    }

    fn missing_image() -> ReconcilerError {
        SynthesisError::MissingImage {
            var: "GENEZIO_MANAGER_IMAGE".to_string(),
        }
        .into()
    }

    #[test]
    fn test_backoff_grows_per_resource_and_caps() {
        let ctx = reconciler();
        let delays: Vec<_> = (0..6)
            .map(|_| handle_reconciliation_error(manager(), &missing_image(), Arc::clone(&ctx)))
            .collect();
        assert_eq!(
            delays,
            [5, 5, 10, 15, 20, 20]
                .map(|s| Action::requeue(Duration::from_secs(s)))
                .to_vec()
        );
    }

    #[test]
    fn test_reset_backoff_restarts_sequence() {
        let ctx = reconciler();
        handle_reconciliation_error(manager(), &missing_image(), Arc::clone(&ctx));
        handle_reconciliation_error(manager(), &missing_image(), Arc::clone(&ctx));
        handle_reconciliation_error(manager(), &missing_image(), Arc::clone(&ctx));

        ctx.reset_backoff(&ObjectKey::new("genezio", "gm"));
        assert_eq!(
            handle_reconciliation_error(manager(), &missing_image(), ctx),
            Action::requeue(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_conflict_uses_short_requeue_without_backoff() {
        let ctx = reconciler();
        let conflict: ReconcilerError = StoreError::Conflict {
            kind: "GenezioManager",
            key: ObjectKey::new("genezio", "gm"),
        }
        .into();

        let action = handle_reconciliation_error(manager(), &conflict, Arc::clone(&ctx));
        assert_eq!(action, Action::requeue(Duration::from_secs(1)));
        assert!(ctx.backoff_states.lock().unwrap().is_empty());
    }

    #[test]
    fn test_classify_watch_errors() {
        let cases = [
            ("ApiError: Unauthorized: 401", WatchErrorKind::Unauthorized),
            ("too old resource version: 123 (456)", WatchErrorKind::Expired),
            ("ApiError: 410 Gone", WatchErrorKind::Expired),
            ("storage is (re)initializing", WatchErrorKind::Throttled),
            ("ObjectNotFound", WatchErrorKind::NotFound),
            ("connection reset by peer", WatchErrorKind::Other),
        ];
        for (input, expected) in cases {
            assert_eq!(WatchErrorKind::classify(input), expected, "{input}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_watch_error_doubles_backoff() {
        let backoff = Arc::new(AtomicU64::new(500));
        handle_watch_stream_error("429 TooManyRequests", &backoff, 30_000).await;
        assert_eq!(backoff.load(Ordering::Relaxed), 1000);

        backoff.store(20_000, Ordering::Relaxed);
        handle_watch_stream_error("429 TooManyRequests", &backoff, 30_000).await;
        assert_eq!(backoff.load(Ordering::Relaxed), 30_000);
    }
}
