//! # Workload Image Resolution
//!
//! The workload image comes from outside the resource. It is resolved on every
//! pass that needs it, through a resolver the reconciler is built with.

use super::SynthesisError;
use std::fmt::Debug;

/// Supplies the container image for the workload
pub trait ImageResolver: Send + Sync + Debug {
    /// Resolve the image reference, failing if it is not configured
    fn resolve(&self) -> Result<String, SynthesisError>;
}

/// Reads the image from a process environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvImageResolver {
    var: String,
}

impl EnvImageResolver {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl ImageResolver for EnvImageResolver {
    fn resolve(&self) -> Result<String, SynthesisError> {
        std::env::var(&self.var)
            .ok()
            .ok_or_else(|| SynthesisError::MissingImage {
                var: self.var.clone(),
            })
    }
}

/// Fixed image, or none at all; used where the environment must not leak in
#[derive(Debug, Clone)]
pub struct StaticImageResolver {
    var: String,
    image: Option<String>,
}

impl StaticImageResolver {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            var: crate::constants::DEFAULT_IMAGE_ENV_VAR.to_string(),
            image: Some(image.into()),
        }
    }

    /// A resolver that always reports the image as missing
    pub fn missing() -> Self {
        Self {
            var: crate::constants::DEFAULT_IMAGE_ENV_VAR.to_string(),
            image: None,
        }
    }
}

impl ImageResolver for StaticImageResolver {
    fn resolve(&self) -> Result<String, SynthesisError> {
        self.image.clone().ok_or_else(|| SynthesisError::MissingImage {
            var: self.var.clone(),
        })
    }
}

/// Tag segment of an image reference
///
/// Only the last path segment is considered, so a registry port is never taken
/// for a tag, and a `@digest` suffix is dropped. An untagged reference yields an
/// empty string.
pub fn image_tag(image: &str) -> &str {
    let reference = image.split_once('@').map_or(image, |(name, _digest)| name);
    let last_segment = reference.rsplit_once('/').map_or(reference, |(_, segment)| segment);
    last_segment.split_once(':').map_or("", |(_, tag)| tag)
}
