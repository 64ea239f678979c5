//! CloudFormation template synthesis
//!
//! Renders a [`TrustStack`] into a template the deploy engine applies.
//! Object keys are emitted in sorted order so repeated synthesis of the same
//! config is byte-identical.

use serde_json::{json, Map, Value};

use crate::error::{Result, TrustError};
use crate::policy::{Condition, RoleTrustPolicy};
use crate::stack::{ManagedPolicyRef, StackOutput, TrustStack};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Output format for the synthesized template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl std::str::FromStr for TemplateFormat {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(TrustError::invalid_config(format!(
                "unknown template format '{}' (expected json or yaml)",
                other
            ))),
        }
    }
}

/// Render the stack as a CloudFormation template document
pub fn render(stack: &TrustStack) -> Value {
    let provider_id = stack.provider.logical_id();
    let role_id = stack.role.logical_id();

    let mut resources = Map::new();
    resources.insert(provider_id, render_provider(stack));
    resources.insert(role_id, render_role(stack));

    let mut outputs = Map::new();
    outputs.insert(stack.output.key.clone(), render_output(&stack.output));

    json!({
        "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
        "Description": format!(
            "OIDC trust between {} and IAM role {}",
            stack.provider.issuer_url, stack.role.name
        ),
        "Resources": resources,
        "Outputs": outputs,
    })
}

/// Render and serialize in the requested format
pub fn render_to_string(stack: &TrustStack, format: TemplateFormat) -> Result<String> {
    let template = render(stack);
    match format {
        TemplateFormat::Json => serde_json::to_string_pretty(&template)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| TrustError::render(format!("failed to serialize template: {}", e))),
        TemplateFormat::Yaml => serde_yaml::to_string(&template)
            .map_err(|e| TrustError::render(format!("failed to serialize template: {}", e))),
    }
}

/// Parse a previously deployed template (JSON or YAML)
///
/// Short-form intrinsics (`!Ref`, `!GetAtt`, `!Sub`, ...) are expanded to
/// their long form, so `!GetAtt Role.Arn` reads as
/// `{"Fn::GetAtt": ["Role", "Arn"]}`.
pub fn parse_template(contents: &str) -> Result<Value> {
    // JSON is a subset of YAML, so one parser covers both
    let yaml: serde_yaml::Value = serde_yaml::from_str(contents)
        .map_err(|e| TrustError::invalid_config(format!("invalid template: {}", e)))?;
    yaml_to_json(yaml)
}

fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(u) = n.as_u64() {
                json!(u)
            } else if let Some(i) = n.as_i64() {
                json!(i)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Number(n) => n.to_string(),
                    other => {
                        return Err(TrustError::invalid_config(format!(
                            "invalid template: unsupported mapping key {:?}",
                            other
                        )))
                    }
                };
                map.insert(key, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            let inner = yaml_to_json(tagged.value)?;
            expand_intrinsic(name, inner)
        }
    })
}

/// Long form of a short-form intrinsic function
fn expand_intrinsic(name: &str, inner: Value) -> Value {
    match (name, inner) {
        ("Ref", inner) => json!({ "Ref": inner }),
        ("GetAtt", Value::String(path)) => match path.split_once('.') {
            Some((resource, attribute)) => json!({ "Fn::GetAtt": [resource, attribute] }),
            None => json!({ "Fn::GetAtt": path }),
        },
        (name, inner) => {
            let mut map = Map::new();
            map.insert(format!("Fn::{}", name), inner);
            Value::Object(map)
        }
    }
}

fn render_provider(stack: &TrustStack) -> Value {
    let provider = &stack.provider;

    let mut properties = Map::new();
    properties.insert("Url".to_string(), json!(provider.issuer_url));
    properties.insert("ClientIdList".to_string(), json!(provider.allowed_audiences));
    if provider.is_pinned() {
        properties.insert("ThumbprintList".to_string(), json!(provider.thumbprints));
    }
    properties.insert(
        "Tags".to_string(),
        json!([{ "Key": "Name", "Value": provider.provider_name }]),
    );

    json!({
        "Type": "AWS::IAM::OIDCProvider",
        "Properties": properties,
    })
}

fn render_role(stack: &TrustStack) -> Value {
    let role = &stack.role;
    let managed: Vec<Value> = role.managed_policies.iter().map(render_policy_arn).collect();

    json!({
        "Type": "AWS::IAM::Role",
        "Properties": {
            "RoleName": role.name,
            "AssumeRolePolicyDocument": render_trust_policy(&role.trust_policy),
            "ManagedPolicyArns": managed,
            "MaxSessionDuration": role.max_session_duration.as_secs(),
        },
    })
}

/// Trust policy document. `Ref` on an OIDC provider yields its ARN, which
/// also orders the provider before the role.
pub fn render_trust_policy(policy: &RoleTrustPolicy) -> Value {
    let mut conditions = Map::new();
    for condition in [&policy.audience_condition, &policy.subject_condition] {
        insert_condition(&mut conditions, condition);
    }

    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Federated": { "Ref": policy.provider_ref.logical_id } },
            "Action": RoleTrustPolicy::ACTION,
            "Condition": conditions,
        }],
    })
}

fn insert_condition(conditions: &mut Map<String, Value>, condition: &Condition) {
    let block = conditions
        .entry(condition.operator.as_str().to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(map) = block {
        map.insert(condition.key.clone(), json!(condition.values));
    }
}

fn render_policy_arn(policy: &ManagedPolicyRef) -> Value {
    match policy {
        ManagedPolicyRef::AwsManaged(name) => json!({
            "Fn::Join": ["", [
                "arn:",
                { "Ref": "AWS::Partition" },
                format!(":iam::aws:policy/{}", name),
            ]]
        }),
        ManagedPolicyRef::Arn(arn) => json!(arn),
    }
}

fn render_output(output: &StackOutput) -> Value {
    json!({
        "Value": { "Fn::GetAtt": [output.role_logical_id, "Arn"] },
        "Export": { "Name": output.export_name },
    })
}
