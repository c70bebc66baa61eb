//! # Provider Configuration
//!
//! Credential blocks for the git provider, the container registry and ArgoCD.
//!
//! Git providers are nested by provider name under `gitConfig` and selected by
//! `gitConfig.provider`, so sibling providers (github, gitlab, ...) can be added
//! without breaking stored resources.

use serde::{Deserialize, Serialize};

/// Git configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    /// Provider tag selecting the credential block (e.g., "gitea")
    pub provider: String,
    /// Name of the repository deployments are committed to
    /// The stored field name is misspelled and kept that way for compatibility
    #[serde(rename = "deployementRepoName")]
    pub deployment_repo_name: String,
    /// Gitea credentials, used when `provider` is "gitea"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitea: Option<GiteaProvider>,
}

/// Gitea provider credentials
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiteaProvider {
    pub url: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_name: Option<String>,
}

/// Container registry credentials
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRegistryConfig {
    pub url: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_name: Option<String>,
}

/// ArgoCD endpoint credentials
/// Every field is optional; missing values become empty environment values
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCdConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_name: Option<String>,
}
