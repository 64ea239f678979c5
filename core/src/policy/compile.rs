//! Trust policy compilation
//!
//! Turns the configured repository list into subject patterns and wraps them,
//! together with the audience set, into a role trust policy.

use tracing::debug;

use super::types::{Condition, ConditionOperator, RoleTrustPolicy, SubjectPattern, TrustedRepoEntry};
use crate::oidc::IdentityProviderConfig;

/// Build one subject pattern per entry, preserving input order
///
/// Entry fields are not validated or escaped here; see
/// [`super::validate_repo_entry`].
pub fn build_subject_patterns(entries: &[TrustedRepoEntry]) -> Vec<SubjectPattern> {
    let patterns: Vec<SubjectPattern> = entries.iter().map(SubjectPattern::for_entry).collect();
    debug!(count = patterns.len(), "built subject patterns");
    patterns
}

/// Build the trust policy for a provider
///
/// Never fails. An empty pattern list produces a policy that admits no caller.
pub fn build_trust_policy(
    provider: &IdentityProviderConfig,
    audiences: &[String],
    patterns: &[SubjectPattern],
) -> RoleTrustPolicy {
    let prefix = provider.condition_prefix();

    RoleTrustPolicy {
        provider_ref: provider.reference(),
        audience_condition: Condition {
            operator: ConditionOperator::StringEquals,
            key: format!("{}:aud", prefix),
            values: dedup_preserving_order(audiences.iter().map(String::as_str)),
        },
        subject_condition: Condition {
            operator: ConditionOperator::StringLike,
            key: format!("{}:sub", prefix),
            values: patterns.iter().map(|p| p.as_str().to_string()).collect(),
        },
    }
}

/// Drop repeated values, keeping first occurrences in order
pub(crate) fn dedup_preserving_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
