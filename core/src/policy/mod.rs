//! Trust policy module
//!
//! Handles subject pattern derivation, trust policy construction, and matching
//! of token claims against the resulting policy.

mod check;
mod compile;
pub mod types;

pub use check::check_claims;
pub use compile::{build_subject_patterns, build_trust_policy};
pub(crate) use compile::dedup_preserving_order;
pub use types::{
    Condition, ConditionOperator, ProviderRef, RoleTrustPolicy, SubjectPattern, TrustedRepoEntry,
    WILDCARD_FILTER,
};

use crate::error::{Result, TrustError};

/// GitHub caps user and organization logins at 39 characters
const MAX_OWNER_LENGTH: usize = 39;

/// GitHub caps repository names at 100 characters
const MAX_REPOSITORY_LENGTH: usize = 100;

/// Maximum allowed length for a job filter
const MAX_FILTER_LENGTH: usize = 256;

/// Validate a repository entry before it is turned into a subject pattern.
///
/// Owner: alphanumerics and hyphens. Repository: alphanumerics, `-`, `_`, `.`
/// and the `*` glob. Neither may contain `:` or `/`, which would shift the
/// subject pattern's field boundaries.
pub fn validate_repo_entry(entry: &TrustedRepoEntry) -> Result<()> {
    validate_owner(&entry.owner)?;
    validate_repository(&entry.repository)?;
    if let Some(ref filter) = entry.filter {
        validate_filter(filter)?;
    }
    Ok(())
}

fn validate_owner(owner: &str) -> Result<()> {
    if owner.is_empty() {
        return Err(TrustError::invalid_repo_entry("owner cannot be empty"));
    }

    if owner.len() > MAX_OWNER_LENGTH {
        return Err(TrustError::invalid_repo_entry(format!(
            "owner too long (max {} characters)",
            MAX_OWNER_LENGTH
        )));
    }

    if owner.contains('*') || owner.contains('?') {
        return Err(TrustError::invalid_repo_entry(format!(
            "owner '{}' must not contain wildcards",
            owner
        )));
    }

    check_separators(owner, "owner")?;

    for c in owner.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(TrustError::invalid_repo_entry(format!(
                "owner contains invalid character: '{}'",
                c
            )));
        }
    }

    Ok(())
}

fn validate_repository(repository: &str) -> Result<()> {
    if repository.is_empty() {
        return Err(TrustError::invalid_repo_entry("repository cannot be empty"));
    }

    if repository.len() > MAX_REPOSITORY_LENGTH {
        return Err(TrustError::invalid_repo_entry(format!(
            "repository too long (max {} characters)",
            MAX_REPOSITORY_LENGTH
        )));
    }

    if repository == "." || repository == ".." {
        return Err(TrustError::invalid_repo_entry(format!(
            "repository name '{}' is reserved",
            repository
        )));
    }

    check_separators(repository, "repository")?;

    for c in repository.chars() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | '*') {
            return Err(TrustError::invalid_repo_entry(format!(
                "repository contains invalid character: '{}'",
                c
            )));
        }
    }

    Ok(())
}

fn validate_filter(filter: &str) -> Result<()> {
    if filter.is_empty() {
        return Err(TrustError::invalid_repo_entry(
            "filter cannot be empty (omit it to allow any job)",
        ));
    }

    if filter.len() > MAX_FILTER_LENGTH {
        return Err(TrustError::invalid_repo_entry(format!(
            "filter too long (max {} characters)",
            MAX_FILTER_LENGTH
        )));
    }

    if filter.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TrustError::invalid_repo_entry(format!(
            "filter '{}' contains whitespace",
            filter
        )));
    }

    Ok(())
}

fn check_separators(value: &str, field: &str) -> Result<()> {
    if value.contains(':') || value.contains('/') {
        return Err(TrustError::invalid_repo_entry(format!(
            "{} '{}' must not contain ':' or '/'",
            field, value
        )));
    }
    Ok(())
}

/// Parse `owner/repository[:filter]` into an entry.
///
/// Everything after the first `:` is the filter, so filters such as
/// `ref:refs/heads/main` keep their own separators.
pub fn parse_repo_slug(slug: &str) -> Result<TrustedRepoEntry> {
    let (repo_part, filter) = match slug.split_once(':') {
        Some((repo_part, filter)) => (repo_part, Some(filter)),
        None => (slug, None),
    };

    let parts: Vec<&str> = repo_part.split('/').collect();
    let entry = match parts.as_slice() {
        [owner, repository] => TrustedRepoEntry::new(*owner, *repository),
        _ => {
            return Err(TrustError::invalid_repo_entry(format!(
                "'{}' must be in format 'owner/repo' or 'owner/repo:filter'",
                slug
            )))
        }
    };

    let entry = match filter {
        Some(f) => entry.with_filter(f),
        None => entry,
    };

    validate_repo_entry(&entry)?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_slug_without_filter() {
        let entry = parse_repo_slug("marciocadev/openid-connect-cdk").unwrap();
        assert_eq!(entry.owner, "marciocadev");
        assert_eq!(entry.repository, "openid-connect-cdk");
        assert!(entry.filter.is_none());
    }

    #[test]
    fn test_parse_repo_slug_with_filter() {
        let entry = parse_repo_slug("a/b:pull_request").unwrap();
        assert_eq!(entry.filter.as_deref(), Some("pull_request"));
    }

    #[test]
    fn test_parse_repo_slug_keeps_separators_in_filter() {
        let entry = parse_repo_slug("a/b:ref:refs/heads/main").unwrap();
        assert_eq!(entry.owner, "a");
        assert_eq!(entry.repository, "b");
        assert_eq!(entry.filter.as_deref(), Some("ref:refs/heads/main"));
    }

    #[test]
    fn test_parse_repo_slug_rejects_bad_shapes() {
        assert!(parse_repo_slug("just-owner").is_err());
        assert!(parse_repo_slug("a/b/c").is_err());
        assert!(parse_repo_slug("/b").is_err());
        assert!(parse_repo_slug("a/").is_err());
        assert!(parse_repo_slug("a/b:").is_err());
    }

    #[test]
    fn test_validate_repo_entry_valid() {
        assert!(validate_repo_entry(&TrustedRepoEntry::new("marciocadev", "openid-connect-cdk")).is_ok());
        assert!(validate_repo_entry(&TrustedRepoEntry::new("my-org", "repo_name.rs")).is_ok());
        assert!(validate_repo_entry(&TrustedRepoEntry::new("my-org", "infra-*")).is_ok());
        assert!(validate_repo_entry(
            &TrustedRepoEntry::new("a", "b").with_filter("environment:production")
        )
        .is_ok());
    }

    #[test]
    fn test_validate_repo_entry_empty_fields() {
        let err = validate_repo_entry(&TrustedRepoEntry::new("", "b")).unwrap_err();
        assert!(err.to_string().contains("owner cannot be empty"));

        let err = validate_repo_entry(&TrustedRepoEntry::new("a", "")).unwrap_err();
        assert!(err.to_string().contains("repository cannot be empty"));

        let err = validate_repo_entry(&TrustedRepoEntry::new("a", "b").with_filter("")).unwrap_err();
        assert!(err.to_string().contains("filter cannot be empty"));
    }

    #[test]
    fn test_validate_repo_entry_rejects_separators() {
        let err = validate_repo_entry(&TrustedRepoEntry::new("a:b", "c")).unwrap_err();
        assert!(err.to_string().contains("must not contain ':' or '/'"));

        let err = validate_repo_entry(&TrustedRepoEntry::new("a", "b/c")).unwrap_err();
        assert!(err.to_string().contains("must not contain ':' or '/'"));
    }

    #[test]
    fn test_validate_repo_entry_rejects_wildcard_owner() {
        let err = validate_repo_entry(&TrustedRepoEntry::new("*", "b")).unwrap_err();
        assert!(err.to_string().contains("wildcards"));
    }

    #[test]
    fn test_validate_repo_entry_invalid_characters() {
        assert!(validate_repo_entry(&TrustedRepoEntry::new("my org", "b")).is_err());
        assert!(validate_repo_entry(&TrustedRepoEntry::new("org_name", "b")).is_err());
        assert!(validate_repo_entry(&TrustedRepoEntry::new("a", "b@c")).is_err());
        assert!(validate_repo_entry(&TrustedRepoEntry::new("a", "..")).is_err());
        assert!(validate_repo_entry(&TrustedRepoEntry::new("a", "b").with_filter("pull request")).is_err());
    }

    #[test]
    fn test_validate_repo_entry_too_long() {
        let err = validate_repo_entry(&TrustedRepoEntry::new("a".repeat(40), "b")).unwrap_err();
        assert!(err.to_string().contains("too long"));

        let err = validate_repo_entry(&TrustedRepoEntry::new("a", "b".repeat(101))).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }
}
