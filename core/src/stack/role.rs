//! Federated role

use std::fmt;
use std::time::Duration;

use crate::oidc::logical_id_from;
use crate::policy::RoleTrustPolicy;

/// Permission policy attached to the role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedPolicyRef {
    /// AWS managed policy by name, e.g. `AdministratorAccess`
    AwsManaged(String),
    /// Any policy by full ARN
    Arn(String),
}

impl ManagedPolicyRef {
    /// Names starting with `arn:` are taken as ARNs, anything else as an
    /// AWS managed policy name
    pub fn parse(value: &str) -> Self {
        if value.starts_with("arn:") {
            Self::Arn(value.to_string())
        } else {
            Self::AwsManaged(value.to_string())
        }
    }

    /// Policies that grant full account control
    pub fn is_administrative(&self) -> bool {
        match self {
            Self::AwsManaged(name) => name == "AdministratorAccess",
            Self::Arn(arn) => arn.ends_with(":policy/AdministratorAccess"),
        }
    }
}

impl fmt::Display for ManagedPolicyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwsManaged(name) => write!(f, "aws-managed:{}", name),
            Self::Arn(arn) => f.write_str(arn),
        }
    }
}

/// Role assumable through the trust policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedRole {
    /// Physical role name; the role's identity across updates
    pub name: String,
    pub trust_policy: RoleTrustPolicy,
    pub managed_policies: Vec<ManagedPolicyRef>,
    pub max_session_duration: Duration,
}

impl FederatedRole {
    /// Template logical id derived from the role name
    pub fn logical_id(&self) -> String {
        logical_id_from(&self.name, "FederatedRole")
    }
}

/// Build the role. The session duration is not range-checked here; that is a
/// pre-apply validation concern.
pub fn build_role(
    name: &str,
    trust_policy: RoleTrustPolicy,
    managed_policies: Vec<ManagedPolicyRef>,
    max_session_duration: Duration,
) -> FederatedRole {
    FederatedRole {
        name: name.to_string(),
        trust_policy,
        managed_policies,
        max_session_duration,
    }
}
