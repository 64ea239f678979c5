//! Stack output publishing the role ARN for cross-stack import

use serde_json::Value;
use tracing::warn;

use super::role::FederatedRole;
use crate::config::OutputSettings;
use crate::error::{Result, TrustError};

/// Exported reference to the role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutput {
    pub key: String,
    /// Logical id of the role whose ARN is the output value
    pub role_logical_id: String,
    pub export_name: String,
}

/// Expose the role's ARN under a stable export name
pub fn emit_output(role: &FederatedRole, settings: &OutputSettings) -> StackOutput {
    StackOutput {
        key: settings.key.clone(),
        role_logical_id: role.logical_id(),
        export_name: settings.export_name.clone(),
    }
}

/// Compare against a previously deployed template.
///
/// Renaming the export that previously published this output key, this
/// role's ARN, or any IAM role's ARN breaks every importing stack, so it is
/// reported as a [`TrustError::BreakingChange`]. The last case covers a role
/// renamed together with its output key and export. A template without
/// outputs is a first deploy and always compatible.
pub fn check_export_compat(previous: &Value, output: &StackOutput) -> Result<()> {
    let outputs = match previous.get("Outputs").and_then(Value::as_object) {
        Some(outputs) => outputs,
        None => return Ok(()),
    };

    for (key, entry) in outputs {
        let previous_export = match entry
            .get("Export")
            .and_then(|e| e.get("Name"))
            .and_then(Value::as_str)
        {
            Some(name) => name,
            None => continue,
        };

        let same_key = *key == output.key;
        let target = entry.get("Value").and_then(arn_target);
        let same_role = target == Some(output.role_logical_id.as_str());
        let any_role = target.map_or(false, |id| is_role_resource(previous, id));

        if (same_key || same_role || any_role) && previous_export != output.export_name {
            warn!(
                output = %key,
                previous = previous_export,
                current = %output.export_name,
                "export name changed"
            );
            return Err(TrustError::breaking_change(format!(
                "output '{}' was exported as '{}' but is now exported as '{}'; importing stacks will break",
                key, previous_export, output.export_name
            )));
        }
    }

    Ok(())
}

/// Logical id `id` of `{"Fn::GetAtt": [id, "Arn"]}` or the `"id.Arn"` form
fn arn_target(value: &Value) -> Option<&str> {
    match value.get("Fn::GetAtt")? {
        Value::Array(parts) if parts.len() == 2 && parts[1].as_str() == Some("Arn") => {
            parts[0].as_str()
        }
        Value::String(s) => s.strip_suffix(".Arn"),
        _ => None,
    }
}

/// Whether the previous template declares `id` as an IAM role. Templates
/// without a Resources section give no evidence either way.
fn is_role_resource(previous: &Value, id: &str) -> bool {
    match previous.get("Resources").and_then(Value::as_object) {
        Some(resources) => resources
            .get(id)
            .and_then(|r| r.get("Type"))
            .and_then(Value::as_str)
            == Some("AWS::IAM::Role"),
        None => true,
    }
}
