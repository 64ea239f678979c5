//! Pre-apply validation
//!
//! Building a stack never fails; configuration mistakes the deploy engine
//! would only report at apply time (or silently accept, like an empty subject
//! list) are caught here instead.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::config::{MAX_MAX_SESSION_SECS, MIN_MAX_SESSION_SECS};
use crate::error::{Result, TrustError};
use crate::oidc::{validate_issuer_url, validate_thumbprint, MAX_THUMBPRINTS};
use crate::policy::validate_repo_entry;
use crate::stack::TrustStack;

const MAX_ROLE_NAME_LENGTH: usize = 64;
const MAX_EXPORT_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// Stable machine-readable code, e.g. `empty_subjects`
    pub code: &'static str,
    pub message: String,
}

impl Finding {
    fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.message)
    }
}

/// Run every pre-apply check against a built stack
pub fn validate_stack(stack: &TrustStack) -> Vec<Finding> {
    let mut findings = Vec::new();

    check_provider(stack, &mut findings);
    check_subjects(stack, &mut findings);
    check_role(stack, &mut findings);
    check_output(stack, &mut findings);
    check_logical_ids(stack, &mut findings);

    for finding in &findings {
        debug!(code = finding.code, severity = %finding.severity, "{}", finding.message);
    }

    findings
}

/// Reject when any finding is an error
pub fn ensure_valid(findings: &[Finding]) -> Result<()> {
    let errors: Vec<String> = findings
        .iter()
        .filter(|f| f.is_error())
        .map(|f| f.message.clone())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TrustError::invalid_config(errors.join("; ")))
    }
}

fn check_provider(stack: &TrustStack, findings: &mut Vec<Finding>) {
    let provider = &stack.provider;

    if let Err(e) = validate_issuer_url(&provider.issuer_url) {
        findings.push(Finding::error("issuer_url", e.to_string()));
    }

    if provider.allowed_audiences.is_empty() {
        findings.push(Finding::error(
            "empty_audiences",
            "at least one audience is required; no token can satisfy the trust policy",
        ));
    }

    if provider.allowed_audiences.iter().any(|a| a.trim().is_empty()) {
        findings.push(Finding::error("blank_audience", "audiences must not be blank"));
    }

    if provider.thumbprints.len() > MAX_THUMBPRINTS {
        findings.push(Finding::error(
            "too_many_thumbprints",
            format!("at most {} thumbprints may be pinned", MAX_THUMBPRINTS),
        ));
    }

    for thumbprint in &provider.thumbprints {
        if let Err(e) = validate_thumbprint(thumbprint) {
            findings.push(Finding::error("thumbprint", e.to_string()));
        }
    }
}

fn check_subjects(stack: &TrustStack, findings: &mut Vec<Finding>) {
    if stack.patterns.is_empty() {
        findings.push(Finding::error(
            "empty_subjects",
            "no trusted repositories configured; the trust policy can never be satisfied",
        ));
        return;
    }

    for entry in &stack.repositories {
        if let Err(e) = validate_repo_entry(entry) {
            findings.push(Finding::error("repo_entry", e.to_string()));
        }
    }

    let mut seen = HashSet::new();
    for pattern in &stack.patterns {
        if !seen.insert(pattern.as_str()) {
            findings.push(Finding::warning(
                "duplicate_subject",
                format!("subject pattern '{}' is listed more than once", pattern),
            ));
        }
    }
}

fn check_role(stack: &TrustStack, findings: &mut Vec<Finding>) {
    let role = &stack.role;

    if let Err(message) = check_role_name(&role.name) {
        findings.push(Finding::error("role_name", message));
    }

    let secs = role.max_session_duration.as_secs();
    if !(MIN_MAX_SESSION_SECS..=MAX_MAX_SESSION_SECS).contains(&secs) {
        findings.push(Finding::error(
            "session_duration",
            format!(
                "max session duration {}s is outside {}..={}s",
                secs, MIN_MAX_SESSION_SECS, MAX_MAX_SESSION_SECS
            ),
        ));
    }

    if role.managed_policies.is_empty() {
        findings.push(Finding::warning(
            "no_permissions",
            "role has no managed policies attached and can do nothing once assumed",
        ));
    }

    if let Some(admin) = role.managed_policies.iter().find(|p| p.is_administrative()) {
        findings.push(Finding::warning(
            "broad_permissions",
            format!("role grants full account access through {}", admin),
        ));
    }
}

fn check_output(stack: &TrustStack, findings: &mut Vec<Finding>) {
    let export = &stack.output.export_name;

    if export.is_empty() || export.len() > MAX_EXPORT_NAME_LENGTH {
        findings.push(Finding::error(
            "export_name",
            format!(
                "export name must be 1..={} characters",
                MAX_EXPORT_NAME_LENGTH
            ),
        ));
    } else if let Some(c) = export
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != ':' && *c != '-')
    {
        findings.push(Finding::error(
            "export_name",
            format!("export name contains invalid character: '{}'", c),
        ));
    }

    if stack.output.key.is_empty() || !stack.output.key.chars().all(|c| c.is_ascii_alphanumeric()) {
        findings.push(Finding::error(
            "output_key",
            format!("output key '{}' must be non-empty and alphanumeric", stack.output.key),
        ));
    }
}

/// Provider and role share one Resources map; equal ids drop the provider
fn check_logical_ids(stack: &TrustStack, findings: &mut Vec<Finding>) {
    let provider_id = stack.provider.logical_id();
    if provider_id == stack.role.logical_id() {
        findings.push(Finding::error(
            "logical_id_collision",
            format!(
                "provider '{}' and role '{}' map to the same logical id '{}'",
                stack.provider.provider_name, stack.role.name, provider_id
            ),
        ));
    }
}

fn check_role_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name.len() > MAX_ROLE_NAME_LENGTH {
        return Err(format!(
            "role name must be 1..={} characters",
            MAX_ROLE_NAME_LENGTH
        ));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '_' | '+' | '=' | ',' | '.' | '@' | '-') {
            return Err(format!("role name contains invalid character: '{}'", c));
        }
    }

    Ok(())
}
