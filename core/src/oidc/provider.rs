//! OIDC identity provider registration
//!
//! Describes the issuer trust anchor the role federates with. Construction is
//! pure; the deploy engine performs the registration.

use serde::Serialize;

use crate::config::DEFAULT_PROVIDER_NAME;
use crate::error::{Result, TrustError};
use crate::policy::{dedup_preserving_order, ProviderRef};

/// IAM accepts at most five thumbprints per provider
pub const MAX_THUMBPRINTS: usize = 5;

/// External OIDC issuer trust anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityProviderConfig {
    /// Issuer URL, e.g. `https://token.actions.githubusercontent.com`
    pub issuer_url: String,
    /// Client IDs (audiences) the provider accepts
    pub allowed_audiences: Vec<String>,
    /// Human-readable provider name, also used to derive the logical id
    pub provider_name: String,
    /// Pinned SHA-1 certificate thumbprints. Empty means the provider relies
    /// on AWS-side certificate chain validation.
    pub thumbprints: Vec<String>,
}

/// Build a provider record for an issuer and its accepted audiences.
/// Repeated audiences are listed once.
pub fn build_provider(issuer_url: &str, audiences: Vec<String>) -> IdentityProviderConfig {
    IdentityProviderConfig {
        issuer_url: issuer_url.trim_end_matches('/').to_string(),
        allowed_audiences: dedup_preserving_order(audiences.iter().map(String::as_str)),
        provider_name: DEFAULT_PROVIDER_NAME.to_string(),
        thumbprints: Vec::new(),
    }
}

impl IdentityProviderConfig {
    pub fn with_name(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
    }

    /// Pin certificate thumbprints. Values are lowercased.
    pub fn with_thumbprints(mut self, thumbprints: Vec<String>) -> Self {
        self.thumbprints = thumbprints.into_iter().map(|t| t.to_ascii_lowercase()).collect();
        self
    }

    pub fn is_pinned(&self) -> bool {
        !self.thumbprints.is_empty()
    }

    /// Prefix IAM uses for this provider's condition keys: the issuer URL
    /// without its scheme, e.g. `token.actions.githubusercontent.com`
    pub fn condition_prefix(&self) -> &str {
        let url = self.issuer_url.trim_end_matches('/');
        url.strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url)
    }

    /// Template logical id derived from the provider name
    pub fn logical_id(&self) -> String {
        logical_id_from(&self.provider_name, "OidcProvider")
    }

    pub fn reference(&self) -> ProviderRef {
        ProviderRef {
            logical_id: self.logical_id(),
            issuer_url: self.issuer_url.clone(),
        }
    }
}

/// Keep only ASCII alphanumerics; fall back when nothing is left
pub(crate) fn logical_id_from(name: &str, fallback: &str) -> String {
    let id: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if id.is_empty() {
        fallback.to_string()
    } else {
        id
    }
}

/// Validate issuer URL format: HTTPS, no query, fragment or userinfo
pub fn validate_issuer_url(issuer: &str) -> Result<()> {
    let url = url::Url::parse(issuer).map_err(|_| TrustError::invalid_issuer("invalid issuer URL"))?;

    if url.scheme() != "https" {
        return Err(TrustError::invalid_issuer("issuer must use HTTPS"));
    }

    if url.host_str().is_none() {
        return Err(TrustError::invalid_issuer("issuer URL must have a host"));
    }

    if url.query().is_some() {
        return Err(TrustError::invalid_issuer("issuer URL must not have query string"));
    }

    if url.fragment().is_some() {
        return Err(TrustError::invalid_issuer("issuer URL must not have fragment"));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(TrustError::invalid_issuer("issuer URL must not have userinfo"));
    }

    if let Some(host) = url.host_str() {
        for c in host.chars() {
            if !c.is_ascii() {
                return Err(TrustError::invalid_issuer(
                    "issuer hostname contains non-ASCII characters",
                ));
            }
        }
    }

    Ok(())
}

/// Validate a SHA-1 certificate thumbprint (40 hex characters)
pub fn validate_thumbprint(thumbprint: &str) -> Result<()> {
    if thumbprint.len() != 40 {
        return Err(TrustError::invalid_issuer(format!(
            "thumbprint '{}' must be 40 hex characters",
            thumbprint
        )));
    }

    if !thumbprint.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TrustError::invalid_issuer(format!(
            "thumbprint '{}' contains non-hex characters",
            thumbprint
        )));
    }

    Ok(())
}
