//! Trust policy type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Job filter substituted when an entry does not narrow the subject
pub const WILDCARD_FILTER: &str = "*";

/// One GitHub repository (optionally scoped to a job filter) allowed to federate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrustedRepoEntry {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    #[serde(alias = "repo")]
    pub repository: String,

    /// Subject suffix after `repo:{owner}/{repository}:`, e.g. `pull_request`
    /// or `ref:refs/heads/main`. Absent means any job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl TrustedRepoEntry {
    pub fn new(owner: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The job filter, or `*` when none was given
    pub fn filter_or_wildcard(&self) -> &str {
        self.filter.as_deref().unwrap_or(WILDCARD_FILTER)
    }
}

/// Subject claim pattern derived from exactly one [`TrustedRepoEntry`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SubjectPattern(String);

impl SubjectPattern {
    /// `repo:{owner}/{repository}:{filter}`; no escaping is applied
    pub fn for_entry(entry: &TrustedRepoEntry) -> Self {
        Self(format!(
            "repo:{}/{}:{}",
            entry.owner,
            entry.repository,
            entry.filter_or_wildcard()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectPattern {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// IAM condition operators used by the trust policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    /// Exact, case-sensitive match against any value in the set
    StringEquals,
    /// Glob match (`*`, `?`) against any value in the set
    StringLike,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringEquals => "StringEquals",
            Self::StringLike => "StringLike",
        }
    }
}

/// A single condition block entry: `{ operator: { key: [values] } }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub operator: ConditionOperator,
    pub key: String,
    pub values: Vec<String>,
}

/// Reference to the identity provider a trust policy federates with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRef {
    /// Template logical id of the provider resource
    pub logical_id: String,
    /// Issuer the presented token must carry in `iss`
    pub issuer_url: String,
}

/// Role trust policy: grants `sts:AssumeRoleWithWebIdentity` when both the
/// audience and the subject conditions hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTrustPolicy {
    pub provider_ref: ProviderRef,
    pub audience_condition: Condition,
    pub subject_condition: Condition,
}

impl RoleTrustPolicy {
    /// IAM action granted by this policy
    pub const ACTION: &'static str = "sts:AssumeRoleWithWebIdentity";

    /// Subject patterns the policy trusts
    pub fn subject_patterns(&self) -> &[String] {
        &self.subject_condition.values
    }

    /// A policy with no subject patterns or no audiences can never be satisfied
    pub fn is_unsatisfiable(&self) -> bool {
        self.subject_condition.values.is_empty() || self.audience_condition.values.is_empty()
    }
}
