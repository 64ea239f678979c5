//! gh-oidc-trust-core: the GitHub Actions → AWS OIDC trust stack
//!
//! Builds the identity provider, subject patterns, role trust policy, role and
//! exported output from a [`config::StackConfig`], validates the result before
//! apply, renders it as a CloudFormation template, and evaluates token claims
//! against it locally. Nothing here talks to AWS.

pub mod config;
pub mod error;
pub mod oidc;
pub mod policy;
pub mod stack;
pub mod template;
pub mod validate;

#[cfg(test)]
pub mod test_support;
