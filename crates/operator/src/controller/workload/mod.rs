//! # Workload Synthesis
//!
//! Turns a `GenezioManager` into the `Deployment` that runs the Genezio manager.
//!
//! Synthesis is deterministic given the resource and the resolved image. The only
//! fallible steps are resolving the image and attaching the owner reference.

mod git;
mod image;

pub use git::{GitCredentialSource, GitCredentials, GitProviders, GiteaCredentials};
pub use image::{image_tag, EnvImageResolver, ImageResolver, StaticImageResolver};

use crate::constants::{WORKLOAD_CONTAINER_NAME, WORKLOAD_DOMAIN, WORKLOAD_RUN_AS_USER};
use crate::crd::{GenezioManager, GenezioManagerSpec};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, Container, ContainerPort, EnvVar, PodSecurityContext, PodSpec,
    PodTemplateSpec, SeccompProfile, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while building the workload
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("unable to find {var} environment variable with the image")]
    MissingImage { var: String },
    #[error("cannot set owner reference on workload for {name}: resource has no uid yet")]
    OwnerReference { name: String },
}

/// Labels shared by the Deployment selector and its pod template
pub fn workload_labels(name: &str, image: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app.kubernetes.io/name".to_string(), "GenezioManager".to_string()),
        ("app.kubernetes.io/instance".to_string(), name.to_string()),
        ("app.kubernetes.io/version".to_string(), image_tag(image).to_string()),
        ("app.kubernetes.io/part-of".to_string(), "genezio-operator".to_string()),
        ("app.kubernetes.io/created-by".to_string(), "controller-manager".to_string()),
    ])
}

/// Environment for the workload container
///
/// The order is fixed; consumers match on position.
pub fn workload_env(spec: &GenezioManagerSpec, git: &GitCredentials) -> Vec<EnvVar> {
    let argocd = &spec.argocd_config;
    let registry = &spec.container_registry_config;
    [
        ("REGION", spec.region.clone()),
        ("DOMAIN", WORKLOAD_DOMAIN.to_string()),
        ("CHART_REPO", spec.chart_repo.clone()),
        ("CHART_TARGET_REVISION", spec.chart_rev.clone()),
        ("DEPLOYMENT_REPO_NAME", spec.git_config.deployment_repo_name.clone()),
        ("ARGOCD_URL", argocd.url.clone().unwrap_or_default()),
        ("ARGOCD_TOKEN", argocd.password.clone().unwrap_or_default()),
        // Container registry
        ("REGISTRY_URL", registry.url.clone()),
        ("REGISTRY_USER", registry.username.clone()),
        ("REGISTRY_PASSWORD", registry.password.clone().unwrap_or_default()),
        // Git
        ("GIT_USER", git.user.clone()),
        ("GIT_URL", git.url.clone()),
        ("GIT_PASSWORD", git.password.clone()),
        ("GIT_TOKEN", git.token.clone()),
    ]
    .into_iter()
    .map(|(name, value)| EnvVar {
        name: name.to_string(),
        value: Some(value),
        ..EnvVar::default()
    })
    .collect()
}

/// Build the Deployment for a `GenezioManager`
///
/// Same namespace and name as the owner, with a controller owner reference so the
/// Deployment is garbage-collected together with it.
pub fn deployment_for(
    manager: &GenezioManager,
    images: &dyn ImageResolver,
    git_providers: &GitProviders,
) -> Result<Deployment, SynthesisError> {
    let name = manager.name_any();
    let image = images.resolve()?;
    let labels = workload_labels(&name, &image);
    let git = git_providers.credentials(&manager.spec.git_config);

    let owner_ref = manager
        .controller_owner_ref(&())
        .filter(|owner| !owner.uid.is_empty())
        .ok_or_else(|| SynthesisError::OwnerReference { name: name.clone() })?;

    let container = Container {
        name: WORKLOAD_CONTAINER_NAME.to_string(),
        image: Some(image),
        image_pull_policy: Some("Always".to_string()),
        env: Some(workload_env(&manager.spec, &git)),
        // Restricted pod security standard; the image must run as a numeric non-root user
        security_context: Some(SecurityContext {
            run_as_non_root: Some(true),
            run_as_user: Some(WORKLOAD_RUN_AS_USER),
            allow_privilege_escalation: Some(false),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".to_string()]),
                ..Capabilities::default()
            }),
            ..SecurityContext::default()
        }),
        ports: Some(vec![ContainerPort {
            container_port: manager.spec.container_port,
            name: Some(WORKLOAD_CONTAINER_NAME.to_string()),
            ..ContainerPort::default()
        }]),
        ..Container::default()
    };

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: manager.namespace(),
            owner_references: Some(vec![owner_ref]),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    security_context: Some(PodSecurityContext {
                        run_as_non_root: Some(true),
                        seccomp_profile: Some(SeccompProfile {
                            type_: "RuntimeDefault".to_string(),
                            ..SeccompProfile::default()
                        }),
                        ..PodSecurityContext::default()
                    }),
                    containers: vec![container],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    })
}
