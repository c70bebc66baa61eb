//! # Reconciler Configuration
//!
//! Requeue, backoff and watch settings for the reconcile loop.

use super::{env_var_opt, env_var_or_default};
use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_CONFLICT_REQUEUE_SECS,
    DEFAULT_IMAGE_ENV_VAR, DEFAULT_WORKLOAD_SETTLE_SECS,
};
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Name of the environment variable that holds the workload image
    pub image_env_var: String,
    /// Delay before the first drift check after the workload is created (seconds)
    pub workload_settle_secs: u64,
    /// First retry delay after a failed pass (seconds)
    pub backoff_min_secs: u64,
    /// Retry delay ceiling (seconds)
    pub backoff_max_secs: u64,
    /// Retry delay after an optimistic-concurrency conflict (seconds)
    pub conflict_requeue_secs: u64,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            image_env_var: DEFAULT_IMAGE_ENV_VAR.to_string(),
            workload_settle_secs: DEFAULT_WORKLOAD_SETTLE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            watch_namespace: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let backoff_min_secs = env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS);
        // A ceiling below the floor would make the sequence shrink
        let backoff_max_secs =
            env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS).max(backoff_min_secs);

        Self {
            image_env_var: env_var_opt("IMAGE_ENV_VAR")
                .unwrap_or_else(|| DEFAULT_IMAGE_ENV_VAR.to_string()),
            workload_settle_secs: env_var_or_default(
                "WORKLOAD_SETTLE_SECS",
                DEFAULT_WORKLOAD_SETTLE_SECS,
            ),
            backoff_min_secs,
            backoff_max_secs,
            conflict_requeue_secs: env_var_or_default(
                "CONFLICT_REQUEUE_SECS",
                DEFAULT_CONFLICT_REQUEUE_SECS,
            ),
            watch_namespace: env_var_opt("WATCH_NAMESPACE"),
        }
    }

    pub fn workload_settle_delay(&self) -> Duration {
        Duration::from_secs(self.workload_settle_secs)
    }

    pub fn conflict_requeue_delay(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_secs)
    }
}
