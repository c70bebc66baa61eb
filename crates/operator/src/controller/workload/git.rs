//! # Git Provider Credentials
//!
//! Each supported git provider knows how to pull its credentials out of
//! `GitConfig`. Providers are registered by their tag; supporting a new provider
//! means registering one more [`GitCredentialSource`].
//!
//! An unregistered tag yields empty credentials rather than an error. Stored
//! resources rely on this, so it is kept, and a warning is logged so the
//! fallback is never silent.

use crate::constants::GIT_PROVIDER_GITEA;
use crate::crd::GitConfig;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::warn;

/// Git values handed to the workload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitCredentials {
    pub user: String,
    pub url: String,
    pub password: String,
    pub token: String,
}

/// Extracts credentials for one provider
pub trait GitCredentialSource: Send + Sync + Debug {
    /// Provider tag matched against `gitConfig.provider`
    fn provider(&self) -> &'static str;

    fn credentials(&self, config: &GitConfig) -> GitCredentials;
}

/// Gitea: reads the `gitConfig.gitea` block
#[derive(Debug, Clone, Copy, Default)]
pub struct GiteaCredentials;

impl GitCredentialSource for GiteaCredentials {
    fn provider(&self) -> &'static str {
        GIT_PROVIDER_GITEA
    }

    fn credentials(&self, config: &GitConfig) -> GitCredentials {
        let Some(gitea) = &config.gitea else {
            return GitCredentials::default();
        };
        GitCredentials {
            user: gitea.username.clone(),
            url: gitea.url.clone(),
            password: gitea.password.clone().unwrap_or_default(),
            token: gitea.token.clone().unwrap_or_default(),
        }
    }
}

/// Registry of credential sources keyed by provider tag
#[derive(Debug)]
pub struct GitProviders {
    sources: BTreeMap<&'static str, Box<dyn GitCredentialSource>>,
}

impl GitProviders {
    /// A registry with no providers
    pub fn empty() -> Self {
        Self {
            sources: BTreeMap::new(),
        }
    }

    /// Register a source, replacing any source with the same tag
    #[must_use]
    pub fn with(mut self, source: impl GitCredentialSource + 'static) -> Self {
        self.sources.insert(source.provider(), Box::new(source));
        self
    }

    pub fn is_supported(&self, provider: &str) -> bool {
        self.sources.contains_key(provider)
    }

    /// Credentials for the provider selected by `config.provider`
    pub fn credentials(&self, config: &GitConfig) -> GitCredentials {
        if let Some(source) = self.sources.get(config.provider.as_str()) {
            return source.credentials(config);
        }
        warn!(
            provider = %config.provider,
            supported = ?self.sources.keys().collect::<Vec<_>>(),
            "Unrecognized git provider, workload gets empty git credentials"
        );
        GitCredentials::default()
    }
}

impl Default for GitProviders {
    fn default() -> Self {
        Self::empty().with(GiteaCredentials)
    }
}
