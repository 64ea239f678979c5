//! Trust policy token checking
//!
//! Evaluates web identity token claims against a role trust policy the same
//! way IAM does: issuer must be the federated provider, `aud` is matched with
//! StringEquals and `sub` with StringLike.

use regex::Regex;

use super::types::{Condition, ConditionOperator, RoleTrustPolicy};
use crate::error::{Result, TrustError};
use crate::oidc::WebIdentityClaims;

/// Check if token claims satisfy the trust policy
pub fn check_claims(claims: &WebIdentityClaims, policy: &RoleTrustPolicy) -> Result<()> {
    check_issuer(claims, policy)?;

    // Audience and subject are ANDed
    check_audience(claims, &policy.audience_condition)?;
    check_subject(claims, &policy.subject_condition)?;

    Ok(())
}

impl RoleTrustPolicy {
    /// Whether a caller presenting these claims may assume the role
    pub fn admits(&self, claims: &WebIdentityClaims) -> bool {
        check_claims(claims, self).is_ok()
    }
}

fn check_issuer(claims: &WebIdentityClaims, policy: &RoleTrustPolicy) -> Result<()> {
    let expected = policy.provider_ref.issuer_url.trim_end_matches('/');
    if claims.iss.trim_end_matches('/') != expected {
        return Err(TrustError::access_denied(format!(
            "issuer mismatch: expected '{}', got '{}'",
            expected, claims.iss
        )));
    }
    Ok(())
}

fn check_audience(claims: &WebIdentityClaims, condition: &Condition) -> Result<()> {
    let matched = claims
        .aud
        .iter()
        .any(|a| condition_matches(condition, a).unwrap_or(false));

    if !matched {
        return Err(TrustError::access_denied(format!(
            "audience mismatch: expected one of {:?}, got {:?}",
            condition.values, claims.aud
        )));
    }
    Ok(())
}

fn check_subject(claims: &WebIdentityClaims, condition: &Condition) -> Result<()> {
    if condition.values.is_empty() {
        return Err(TrustError::access_denied(
            "trust policy has no subject patterns",
        ));
    }

    if !condition_matches(condition, &claims.sub)? {
        return Err(TrustError::access_denied(format!(
            "subject '{}' does not match any trusted pattern",
            claims.sub
        )));
    }
    Ok(())
}

/// True when `value` satisfies any value of the condition
fn condition_matches(condition: &Condition, value: &str) -> Result<bool> {
    match condition.operator {
        ConditionOperator::StringEquals => Ok(condition.values.iter().any(|v| v == value)),
        ConditionOperator::StringLike => {
            for pattern in &condition.values {
                if glob_to_regex(pattern)?.is_match(value) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Translate an IAM StringLike glob into an anchored regex.
/// `*` matches any run of characters, `?` exactly one.
pub(crate) fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');

    Regex::new(&pattern)
        .map_err(|e| TrustError::invalid_config(format!("invalid subject pattern '{}': {}", glob, e)))
}
