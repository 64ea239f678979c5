//! Web identity token claims
//!
//! The subset of a GitHub Actions OIDC token that the trust policy inspects.
//! Signatures are not verified here; the claims come from a decoded token
//! payload supplied by the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, TrustError};

/// Decoded token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebIdentityClaims {
    /// Issuer
    pub iss: String,

    /// Subject, e.g. `repo:owner/repo:ref:refs/heads/main`
    pub sub: String,

    /// Audience (can be string or array)
    #[serde(deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,

    /// Additional claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl WebIdentityClaims {
    /// Parse a JSON claims document (a decoded JWT payload)
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TrustError::invalid_claims(format!("invalid claims JSON: {}", e)))
    }
}

/// Deserialize audience as either string or array
fn deserialize_audience<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct AudienceVisitor;

    impl<'de> Visitor<'de> for AudienceVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("string or array of strings")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Vec<String>, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Vec<String>, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut values = Vec::new();
            while let Some(value) = seq.next_element()? {
                values.push(value);
            }
            Ok(values)
        }
    }

    deserializer.deserialize_any(AudienceVisitor)
}
