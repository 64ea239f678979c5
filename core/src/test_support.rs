//! Fixtures shared by unit tests

use std::collections::HashMap;

use crate::config::{StackConfig, GITHUB_ISSUER_URL, STS_AUDIENCE};
use crate::oidc::{build_provider, IdentityProviderConfig, WebIdentityClaims};
use crate::policy::TrustedRepoEntry;

/// The three repositories listed in stack.yaml
pub fn sample_entries() -> Vec<TrustedRepoEntry> {
    vec![
        TrustedRepoEntry::new("marciocadev", "openid-connect-cdk"),
        TrustedRepoEntry::new("marciocadev", "aws-apigateway-lambda-cdk"),
        TrustedRepoEntry::new("marciocadev", "aws-apigateway-dynamodb-cdk"),
    ]
}

pub fn sample_config() -> StackConfig {
    StackConfig::github_default(sample_entries())
}

pub fn github_provider() -> IdentityProviderConfig {
    build_provider(GITHUB_ISSUER_URL, vec![STS_AUDIENCE.to_string()])
}

pub fn claims(iss: &str, sub: &str, aud: &[&str]) -> WebIdentityClaims {
    WebIdentityClaims {
        iss: iss.to_string(),
        sub: sub.to_string(),
        aud: aud.iter().map(|a| a.to_string()).collect(),
        extra: HashMap::new(),
    }
}
