//! Stack configuration
//!
//! The trusted repository list and every wire-level name live in a YAML file
//! so the trust scope can change without touching code. All fields other than
//! `repositories` default to the GitHub Actions / AWS STS values.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TrustError};
use crate::policy::TrustedRepoEntry;

/// GitHub Actions token issuer
pub const GITHUB_ISSUER_URL: &str = "https://token.actions.githubusercontent.com";

/// Audience GitHub issues tokens for when federating with AWS STS
pub const STS_AUDIENCE: &str = "sts.amazonaws.com";

/// SHA-1 thumbprint of the GitHub Actions issuer certificate chain
pub const GITHUB_THUMBPRINT: &str = "2b18947a6a9fc7764fd8b5fb18a863b0c6dac24f";

pub const DEFAULT_PROVIDER_NAME: &str = "GithubOidcProvider";

pub const DEFAULT_ROLE_NAME: &str = "GitHubOidcRole";

/// AWS managed policy attached by default
pub const ADMINISTRATOR_ACCESS: &str = "AdministratorAccess";

/// Maximum session duration (1 hour)
pub const DEFAULT_MAX_SESSION_SECS: u64 = 3600;

/// IAM lower bound for MaxSessionDuration (1 hour)
pub const MIN_MAX_SESSION_SECS: u64 = 3600;

/// IAM upper bound for MaxSessionDuration (12 hours)
pub const MAX_MAX_SESSION_SECS: u64 = 43_200;

pub const DEFAULT_OUTPUT_KEY: &str = "GithubOidcRoleOutput";

/// Export name consumers import; renaming it breaks them
pub const DEFAULT_EXPORT_NAME: &str = "GithubOidcRoleArn";

/// Whole-stack configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// OIDC issuer URL
    #[serde(default = "default_issuer_url")]
    pub issuer_url: String,

    /// Accepted audiences (client IDs)
    #[serde(default = "default_audiences")]
    pub audiences: Vec<String>,

    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Pinned certificate thumbprints; empty leaves pinning off
    #[serde(default)]
    pub thumbprints: Vec<String>,

    #[serde(default)]
    pub role: RoleSettings,

    #[serde(default)]
    pub output: OutputSettings,

    /// Repositories allowed to assume the role
    pub repositories: Vec<TrustedRepoEntry>,
}

/// Role name, permissions and session lifetime
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSettings {
    #[serde(default = "default_role_name")]
    pub name: String,

    /// AWS managed policy names or full policy ARNs
    #[serde(default = "default_managed_policies")]
    pub managed_policies: Vec<String>,

    #[serde(default = "default_max_session_secs")]
    pub max_session_duration_secs: u64,
}

/// Stack output publishing the role ARN
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    #[serde(default = "default_output_key")]
    pub key: String,

    #[serde(default = "default_export_name")]
    pub export_name: String,
}

impl Default for RoleSettings {
    fn default() -> Self {
        Self {
            name: default_role_name(),
            managed_policies: default_managed_policies(),
            max_session_duration_secs: default_max_session_secs(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            key: default_output_key(),
            export_name: default_export_name(),
        }
    }
}

impl StackConfig {
    /// GitHub Actions → AWS defaults for the given repositories, unpinned
    pub fn github_default(repositories: Vec<TrustedRepoEntry>) -> Self {
        Self {
            issuer_url: default_issuer_url(),
            audiences: default_audiences(),
            provider_name: default_provider_name(),
            thumbprints: Vec::new(),
            role: RoleSettings::default(),
            output: OutputSettings::default(),
            repositories,
        }
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TrustError::io(format!("failed to read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            repositories = config.repositories.len(),
            "loaded stack config"
        );
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TrustError::invalid_config(format!("invalid config YAML: {}", e)))
    }

    /// Append repositories after the configured ones
    pub fn with_repositories(mut self, extra: impl IntoIterator<Item = TrustedRepoEntry>) -> Self {
        self.repositories.extend(extra);
        self
    }

    /// Pin the known GitHub Actions thumbprint unless it is already listed
    pub fn pin_github_thumbprint(mut self) -> Self {
        if !self
            .thumbprints
            .iter()
            .any(|t| t.eq_ignore_ascii_case(GITHUB_THUMBPRINT))
        {
            self.thumbprints.push(GITHUB_THUMBPRINT.to_string());
        }
        self
    }
}

fn default_issuer_url() -> String {
    GITHUB_ISSUER_URL.to_string()
}

fn default_audiences() -> Vec<String> {
    vec![STS_AUDIENCE.to_string()]
}

fn default_provider_name() -> String {
    DEFAULT_PROVIDER_NAME.to_string()
}

fn default_role_name() -> String {
    DEFAULT_ROLE_NAME.to_string()
}

fn default_managed_policies() -> Vec<String> {
    vec![ADMINISTRATOR_ACCESS.to_string()]
}

fn default_max_session_secs() -> u64 {
    DEFAULT_MAX_SESSION_SECS
}

fn default_output_key() -> String {
    DEFAULT_OUTPUT_KEY.to_string()
}

fn default_export_name() -> String {
    DEFAULT_EXPORT_NAME.to_string()
}
