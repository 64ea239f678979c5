//! Trust stack definition
//!
//! Builds the full object graph (provider, subject patterns, trust policy,
//! role, output) from a [`StackConfig`]. Construction is pure and
//! deterministic: identical configs produce identical stacks.

mod output;
mod role;

pub use output::{check_export_compat, emit_output, StackOutput};
pub use role::{build_role, FederatedRole, ManagedPolicyRef};

use std::time::Duration;

use tracing::{debug, info};

use crate::config::StackConfig;
use crate::oidc::{build_provider, IdentityProviderConfig};
use crate::policy::{build_subject_patterns, build_trust_policy, SubjectPattern, TrustedRepoEntry};

/// The declared resources, in dependency order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStack {
    pub provider: IdentityProviderConfig,
    /// Entries the patterns were derived from, index-aligned with `patterns`
    pub repositories: Vec<TrustedRepoEntry>,
    pub patterns: Vec<SubjectPattern>,
    pub role: FederatedRole,
    pub output: StackOutput,
}

/// Build the trust stack. Never fails; use [`crate::validate`] before apply.
pub fn build_stack(config: &StackConfig) -> TrustStack {
    let provider = build_provider(&config.issuer_url, config.audiences.clone())
        .with_name(config.provider_name.clone())
        .with_thumbprints(config.thumbprints.clone());
    debug!(
        issuer = %provider.issuer_url,
        pinned = provider.is_pinned(),
        "built identity provider"
    );

    let patterns = build_subject_patterns(&config.repositories);

    let trust_policy = build_trust_policy(&provider, &config.audiences, &patterns);

    let managed_policies = config
        .role
        .managed_policies
        .iter()
        .map(|p| ManagedPolicyRef::parse(p))
        .collect();

    let role = build_role(
        &config.role.name,
        trust_policy,
        managed_policies,
        Duration::from_secs(config.role.max_session_duration_secs),
    );

    let output = emit_output(&role, &config.output);

    info!(
        role = %role.name,
        subjects = patterns.len(),
        export = %output.export_name,
        "built trust stack"
    );

    TrustStack {
        provider,
        repositories: config.repositories.clone(),
        patterns,
        role,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GITHUB_THUMBPRINT, MAX_MAX_SESSION_SECS};
    use crate::test_support::{claims, sample_config};

    #[test]
    fn test_default_stack_shape() {
        let stack = build_stack(&sample_config());

        assert_eq!(stack.provider.issuer_url, "https://token.actions.githubusercontent.com");
        assert_eq!(stack.provider.allowed_audiences, vec!["sts.amazonaws.com"]);
        assert!(stack.provider.thumbprints.is_empty());

        assert_eq!(stack.patterns.len(), 3);
        assert_eq!(stack.role.name, "GitHubOidcRole");
        assert_eq!(
            stack.role.managed_policies,
            vec![ManagedPolicyRef::AwsManaged("AdministratorAccess".to_string())]
        );
        assert_eq!(stack.role.max_session_duration, Duration::from_secs(3600));
        assert_eq!(
            stack.role.trust_policy.subject_patterns(),
            stack
                .patterns
                .iter()
                .map(|p| p.as_str().to_string())
                .collect::<Vec<_>>()
                .as_slice()
        );
    }

    #[test]
    fn test_output_always_references_the_role() {
        let stack = build_stack(&sample_config());
        assert_eq!(stack.output.key, "GithubOidcRoleOutput");
        assert_eq!(stack.output.export_name, "GithubOidcRoleArn");
        assert_eq!(stack.output.role_logical_id, stack.role.logical_id());
        assert_ne!(stack.output.role_logical_id, stack.provider.logical_id());
    }

    #[test]
    fn test_trust_policy_references_the_provider() {
        let stack = build_stack(&sample_config());
        assert_eq!(
            stack.role.trust_policy.provider_ref.logical_id,
            stack.provider.logical_id()
        );
        assert_eq!(
            stack.role.trust_policy.provider_ref.issuer_url,
            stack.provider.issuer_url
        );
    }

    #[test]
    fn test_build_twice_is_identical() {
        let config = sample_config();
        assert_eq!(build_stack(&config), build_stack(&config));
    }

    #[test]
    fn test_pinned_thumbprint_flows_through() {
        let stack = build_stack(&sample_config().pin_github_thumbprint());
        assert_eq!(stack.provider.thumbprints, vec![GITHUB_THUMBPRINT]);
    }

    #[test]
    fn test_empty_repositories_build_a_deny_all_stack() {
        let mut config = sample_config();
        config.repositories.clear();

        let stack = build_stack(&config);
        assert!(stack.patterns.is_empty());
        assert!(stack.role.trust_policy.is_unsatisfiable());
        assert!(!stack.role.trust_policy.admits(&claims(
            "https://token.actions.githubusercontent.com",
            "repo:marciocadev/openid-connect-cdk:pull_request",
            &["sts.amazonaws.com"],
        )));
    }

    #[test]
    fn test_invalid_session_duration_does_not_fail_build() {
        let mut config = sample_config();
        config.role.max_session_duration_secs = MAX_MAX_SESSION_SECS + 1;
        let stack = build_stack(&config);
        assert_eq!(
            stack.role.max_session_duration.as_secs(),
            MAX_MAX_SESSION_SECS + 1
        );
    }
}
