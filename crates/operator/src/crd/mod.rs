//! # Custom Resource Definitions
//!
//! CRD types for the Genezio operator.
//!
//! `GenezioManager` describes where the Genezio manager workload deploys from
//! (git provider, chart coordinates), where it pushes to (container registry),
//! and which ArgoCD instance drives it.

mod provider;
mod status;

pub use provider::{ArgoCdConfig, ContainerRegistryConfig, GitConfig, GiteaProvider};
pub use status::{Condition, ConditionStatus, GenezioManagerStatus};

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// GenezioManager Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: init.genezio.com/v1alpha1
/// kind: GenezioManager
/// metadata:
///   name: genezio
///   namespace: genezio-system
/// spec:
///   region: eu-central-1
///   containerPort: 8080
///   chartRepo: https://github.com/Genez-io/charts
///   chartRev: main
///   argocdConfig:
///     url: https://argocd.example.com
///     password: s3cret
///   gitConfig:
///     provider: gitea
///     deployementRepoName: deployments
///     gitea:
///       url: https://gitea.example.com
///       username: genezio
///       token: abc123
///   containerRegistryConfig:
///     url: registry.example.com
///     username: genezio
///     password: hunter2
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "GenezioManager",
    group = "init.genezio.com",
    version = "v1alpha1",
    namespaced,
    status = "GenezioManagerStatus",
    derive = "PartialEq",
    shortname = "gm",
    printcolumn = r#"{"name":"Region", "type":"string", "jsonPath":".spec.region"}, {"name":"Available", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Available\")].status"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GenezioManagerSpec {
    /// ArgoCD endpoint the workload registers applications with
    #[serde(rename = "argocdConfig")]
    pub argocd_config: ArgoCdConfig,
    /// Git provider hosting the deployment repository
    pub git_config: GitConfig,
    /// Registry the workload pushes built images to
    pub container_registry_config: ContainerRegistryConfig,
    /// Target region (e.g., "eu-central-1")
    pub region: String,
    /// Port exposed by the workload container
    pub container_port: i32,
    /// Helm chart repository URL
    pub chart_repo: String,
    /// Helm chart revision (branch, tag or commit)
    pub chart_rev: String,
}
