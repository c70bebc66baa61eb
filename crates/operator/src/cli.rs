//! # GMCTL CLI
//!
//! Command-line interface for the Genezio operator.
//!
//! ## Usage
//!
//! ```bash
//! # Trigger reconciliation for a specific GenezioManager
//! gmctl reconcile genezio --namespace genezio-system
//!
//! # List all GenezioManager resources
//! gmctl list
//!
//! # Show status of a GenezioManager
//! gmctl status genezio --namespace genezio-system
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genezio_operator::constants::{
    CONDITION_AVAILABLE, CONDITION_DEGRADED, FIELD_MANAGER, RECONCILE_ANNOTATION,
};
use genezio_operator::controller::conditions::find_condition;
use genezio_operator::crd::{Condition, GenezioManager};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

/// Genezio operator CLI
#[derive(Debug, Parser)]
#[command(name = "gmctl")]
#[command(about = "Genezio operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to "default")
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Trigger reconciliation for a GenezioManager resource
    Reconcile {
        /// Name of the GenezioManager resource
        name: String,
    },
    /// List GenezioManager resources (all namespaces unless --namespace is set)
    List,
    /// Show status of a GenezioManager resource
    Status {
        /// Name of the GenezioManager resource
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gmctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::Reconcile { name } => reconcile_command(client, &name, cli.namespace).await,
        Commands::List => list_command(client, cli.namespace).await,
        Commands::Status { name } => status_command(client, &name, cli.namespace).await,
    }
}

/// Trigger reconciliation by updating an annotation; any change to the resource wakes the controller
async fn reconcile_command(client: Client, name: &str, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    println!("Triggering reconciliation for GenezioManager '{ns}/{name}'...");

    let api: Api<GenezioManager> = Api::namespaced(client, ns);
    let timestamp = chrono::Utc::now().to_rfc3339();
    let patch = json!({
        "metadata": {
            "annotations": {
                RECONCILE_ANNOTATION: timestamp
            }
        }
    });

    api.patch(
        name,
        &PatchParams::apply(&format!("{FIELD_MANAGER}-cli")),
        &Patch::Merge(patch),
    )
    .await
    .with_context(|| format!("Failed to trigger reconciliation for '{ns}/{name}'"))?;

    println!("Reconciliation triggered");
    println!("   Resource: {ns}/{name}");
    println!("   Timestamp: {timestamp}");
    Ok(())
}

async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<GenezioManager> = match namespace.as_deref() {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    let managers = api
        .list(&ListParams::default())
        .await
        .context("Failed to list GenezioManager resources")?;

    if managers.items.is_empty() {
        println!("No GenezioManager resources found.");
        return Ok(());
    }

    println!(
        "{:<30} {:<20} {:<15} {:<12} {:<12}",
        "NAME", "NAMESPACE", "REGION", "AVAILABLE", "DEGRADED"
    );
    println!("{}", "-".repeat(92));
    for manager in &managers.items {
        println!(
            "{:<30} {:<20} {:<15} {:<12} {:<12}",
            manager.name_any(),
            manager.namespace().unwrap_or_default(),
            manager.spec.region,
            condition_status(manager, CONDITION_AVAILABLE),
            condition_status(manager, CONDITION_DEGRADED),
        );
    }
    Ok(())
}

async fn status_command(client: Client, name: &str, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<GenezioManager> = Api::namespaced(client, ns);
    let manager = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get GenezioManager '{ns}/{name}'"))?;

    println!("Status for GenezioManager '{ns}/{name}':\n");
    println!("Metadata:");
    if let Some(generation) = manager.metadata.generation {
        println!("  Generation: {generation}");
    }
    println!("  Finalizers: {}", manager.finalizers().join(", "));
    if manager.metadata.deletion_timestamp.is_some() {
        println!("  Deletion requested: yes");
    }

    println!("\nSpec:");
    println!("  Region: {}", manager.spec.region);
    println!("  Container Port: {}", manager.spec.container_port);
    println!("  Chart: {} @ {}", manager.spec.chart_repo, manager.spec.chart_rev);
    println!("  Git Provider: {}", manager.spec.git_config.provider);
    println!("  Registry: {}", manager.spec.container_registry_config.url);

    let conditions = manager
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();
    if conditions.is_empty() {
        println!("\nNo conditions recorded yet.");
        return Ok(());
    }

    println!("\nConditions:");
    for condition in conditions {
        print_condition(condition);
    }
    Ok(())
}

fn condition_status(manager: &GenezioManager, r#type: &str) -> String {
    manager
        .status
        .as_ref()
        .and_then(|s| find_condition(&s.conditions, r#type))
        .map_or_else(|| "-".to_string(), |c| c.status.to_string())
}

fn print_condition(condition: &Condition) {
    println!("  {}: {}", condition.r#type, condition.status);
    println!("    Reason: {}", condition.reason);
    if !condition.message.is_empty() {
        println!("    Message: {}", condition.message);
    }
    if let Some(ref time) = condition.last_transition_time {
        println!("    Last Transition: {time}");
    }
}
