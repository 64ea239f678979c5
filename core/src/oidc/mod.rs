//! OIDC (OpenID Connect) module
//!
//! Identity provider registration and the token claims the trust policy
//! evaluates.

mod claims;
mod provider;

pub use claims::WebIdentityClaims;
pub(crate) use provider::logical_id_from;
pub use provider::{
    build_provider, validate_issuer_url, validate_thumbprint, IdentityProviderConfig,
    MAX_THUMBPRINTS,
};
