//! # Constants
//!
//! Fixed identifiers and default values shared across the controller.

/// Finalizer this controller places on every `GenezioManager` it manages
pub const FINALIZER: &str = "finalizer.init.genezio.com";

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "genezio-operator";

/// Annotation bumped by `gmctl reconcile` to force a watch event
pub const RECONCILE_ANNOTATION: &str = "init.genezio.com/reconcile";

// Condition types
/// Lifecycle health of the managed workload
pub const CONDITION_AVAILABLE: &str = "Available";
/// Set while the resource is being finalized
pub const CONDITION_DEGRADED: &str = "Degraded";

// Condition reasons
pub const REASON_RECONCILING: &str = "Reconciling";
pub const REASON_FINALIZING: &str = "Finalizing";

// Workload
/// Environment variable holding the workload image reference
pub const DEFAULT_IMAGE_ENV_VAR: &str = "GENEZIO_MANAGER_IMAGE";
/// Container and port name on the workload
pub const WORKLOAD_CONTAINER_NAME: &str = "genezio-manager";
/// Non-zero user the workload container is forced to run as
pub const WORKLOAD_RUN_AS_USER: i64 = 1001;
/// Value of the `DOMAIN` environment variable
pub const WORKLOAD_DOMAIN: &str = "local";

// Git providers
pub const GIT_PROVIDER_GITEA: &str = "gitea";

// Requeue and backoff defaults (seconds)
pub const DEFAULT_WORKLOAD_SETTLE_SECS: u64 = 60;
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 1;
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
pub const DEFAULT_WATCH_MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_WATCH_INITIAL_BACKOFF_MS: u64 = 500;

// HTTP server defaults
pub const DEFAULT_METRICS_PORT: u16 = 8080;
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "genezio_operator=info";
