//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{load_config, ServerConfig};
use crate::constants;
use crate::controller::reconciler::{KubeStore, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::controller::workload::EnvImageResolver;
use crate::crd::GenezioManager;
use crate::observability;
use anyhow::{anyhow, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Everything the watch loop needs
#[derive(Debug)]
pub struct InitializationResult {
    /// `GenezioManager` API scoped to the watched namespace(s)
    pub managers: Api<GenezioManager>,
    /// Deployment API with the same scope, for owned-object events
    pub deployments: Api<Deployment>,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
/// - Startup summary of existing resources
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| constants::DEFAULT_LOG_FILTER.into()),
        )
        .init();

    info!("Starting Genezio operator v{}", env!("CARGO_PKG_VERSION"));

    let (controller_config, server_config) = load_config();
    info!(
        image_env_var = %controller_config.image_env_var,
        watch_namespace = controller_config.watch_namespace.as_deref().unwrap_or("<all>"),
        "Loaded controller configuration"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });

    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default().await?;

    let (managers, deployments) = match controller_config.watch_namespace.as_deref() {
        Some(namespace) => (
            Api::namespaced(client.clone(), namespace),
            Api::namespaced(client.clone(), namespace),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    let images = Arc::new(EnvImageResolver::new(controller_config.image_env_var.clone()));
    let store = Arc::new(KubeStore::new(client.clone()));
    let reconciler = Arc::new(Reconciler::new(store, images, controller_config));

    summarize_existing_resources(&managers).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        managers,
        deployments,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = config.startup_timeout();
    let poll_interval = config.poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log the `GenezioManager` resources present at startup, grouped by namespace
///
/// The controller's initial list reconciles them; this only reports what it will find.
async fn summarize_existing_resources(managers: &Api<GenezioManager>) {
    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.summarize_existing",
        operation = "summarize_existing_resources"
    );
    let _guard = span.enter();

    let list = match managers.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
            return;
        }
    };

    if list.items.is_empty() {
        info!("No existing GenezioManager resources found, watch will pick up new resources");
        return;
    }

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        by_namespace
            .entry(item.namespace().unwrap_or_else(|| "default".to_string()))
            .or_default()
            .push(item.name_any());
    }

    info!("Genezio Operator - Startup Resource Summary");
    info!("Resource Kind: GenezioManager");
    info!("Total Resources: {}", list.items.len());
    info!("Namespaces: {}", by_namespace.len());
    for (namespace, mut names) in by_namespace {
        names.sort();
        info!("Namespace: {}", namespace);
        info!("  Resources ({}): {}", names.len(), summarize_names(&names));
    }
}

/// First three names, then a total
fn summarize_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        short if short.len() <= 3 => short.join(", "),
        long => format!("{}, ... ({} total)", long[..3].join(", "), long.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_names() {
        let names: Vec<String> = ["a", "b", "c", "d", "e"].map(String::from).to_vec();
        assert_eq!(summarize_names(&names[..2]), "a, b");
        assert_eq!(summarize_names(&names[..3]), "a, b, c");
        assert_eq!(summarize_names(&names), "a, b, c, ... (5 total)");
        assert_eq!(summarize_names(&[]), "");
    }
}
