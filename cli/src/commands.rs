//! Subcommand implementations

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use gh_oidc_trust_core::config::StackConfig;
use gh_oidc_trust_core::error::TrustError;
use gh_oidc_trust_core::oidc::WebIdentityClaims;
use gh_oidc_trust_core::policy::check_claims;
use gh_oidc_trust_core::stack::{build_stack, check_export_compat, TrustStack};
use gh_oidc_trust_core::template::{parse_template, render_to_string, TemplateFormat};
use gh_oidc_trust_core::validate::{ensure_valid, validate_stack};
use tracing::info;

use crate::StackArgs;

/// Resolve config file and `--repo` flags into a built stack
pub fn load_stack(args: &StackArgs) -> Result<TrustStack> {
    let config = match &args.config {
        Some(path) => StackConfig::load(path)?,
        None if args.repos.is_empty() => {
            return Err(TrustError::invalid_config(
                "no repositories given; pass --config FILE or --repo OWNER/REPO",
            )
            .into())
        }
        None => StackConfig::github_default(Vec::new()),
    };

    let mut config = config.with_repositories(args.repos.iter().cloned());
    if args.pin_thumbprint {
        config = config.pin_github_thumbprint();
    }

    Ok(build_stack(&config))
}

pub fn synth(
    args: &StackArgs,
    format: TemplateFormat,
    out: Option<&Path>,
    skip_validation: bool,
    stdout: &mut impl Write,
) -> Result<()> {
    let stack = load_stack(args)?;

    let findings = validate_stack(&stack);
    if skip_validation {
        info!(findings = findings.len(), "skipping pre-apply validation");
    } else {
        ensure_valid(&findings)?;
    }

    let rendered = render_to_string(&stack, format)?;
    match out {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write template to {}", path.display()))?;
            info!(path = %path.display(), "wrote template");
        }
        None => stdout.write_all(rendered.as_bytes())?,
    }

    Ok(())
}

pub fn validate(args: &StackArgs, stdout: &mut impl Write) -> Result<()> {
    let stack = load_stack(args)?;
    let findings = validate_stack(&stack);

    for finding in &findings {
        writeln!(stdout, "{}", finding)?;
    }
    ensure_valid(&findings)?;

    writeln!(
        stdout,
        "ok: role {} trusts {} subject pattern(s)",
        stack.role.name,
        stack.patterns.len()
    )?;
    Ok(())
}

pub fn patterns(args: &StackArgs, stdout: &mut impl Write) -> Result<()> {
    let stack = load_stack(args)?;
    for pattern in &stack.patterns {
        writeln!(stdout, "{}", pattern)?;
    }
    Ok(())
}

pub fn check(args: &StackArgs, claims_path: &Path, stdout: &mut impl Write) -> Result<()> {
    let stack = load_stack(args)?;

    let json = std::fs::read_to_string(claims_path)
        .map_err(|e| TrustError::io(format!("failed to read {}: {}", claims_path.display(), e)))?;
    let claims = WebIdentityClaims::from_json(&json)?;

    check_claims(&claims, &stack.role.trust_policy)?;

    writeln!(stdout, "allowed: {} may assume {}", claims.sub, stack.role.name)?;
    Ok(())
}

pub fn export_check(args: &StackArgs, previous_path: &Path, stdout: &mut impl Write) -> Result<()> {
    let stack = load_stack(args)?;

    let contents = std::fs::read_to_string(previous_path)
        .map_err(|e| TrustError::io(format!("failed to read {}: {}", previous_path.display(), e)))?;
    let previous = parse_template(&contents)?;

    check_export_compat(&previous, &stack.output)?;

    writeln!(
        stdout,
        "ok: {} is still exported as {}",
        stack.output.key, stack.output.export_name
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gh_oidc_trust_core::policy::parse_repo_slug;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Log sink shared with a test subscriber
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    const CONFIG: &str = r#"
repositories:
  - owner: marciocadev
    repository: openid-connect-cdk
  - owner: marciocadev
    repository: aws-apigateway-lambda-cdk
  - owner: marciocadev
    repository: aws-apigateway-dynamodb-cdk
"#;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn config_args(dir: &tempfile::TempDir) -> StackArgs {
        StackArgs {
            config: Some(write_file(dir, "stack.yaml", CONFIG)),
            ..StackArgs::default()
        }
    }

    fn output_of(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> (Result<()>, String) {
        let mut buf = Vec::new();
        let result = f(&mut buf);
        (result, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_load_stack_requires_some_repositories_source() {
        let err = load_stack(&StackArgs::default()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrustError>().map(TrustError::exit_code),
            Some(2)
        );
    }

    #[test]
    fn test_repo_flags_extend_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = config_args(&dir);
        args.repos.push(parse_repo_slug("a/b:pull_request").unwrap());

        let stack = load_stack(&args).unwrap();
        assert_eq!(stack.patterns.len(), 4);
        assert_eq!(stack.patterns[3].as_str(), "repo:a/b:pull_request");
    }

    #[test]
    fn test_patterns_command() {
        let dir = tempfile::tempdir().unwrap();
        let (result, out) = output_of(|buf| patterns(&config_args(&dir), buf));
        result.unwrap();
        assert_eq!(
            out,
            "repo:marciocadev/openid-connect-cdk:*\n\
             repo:marciocadev/aws-apigateway-lambda-cdk:*\n\
             repo:marciocadev/aws-apigateway-dynamodb-cdk:*\n"
        );
    }

    #[test]
    fn test_synth_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("template.json");

        let (result, stdout) = output_of(|buf| {
            synth(&config_args(&dir), TemplateFormat::Json, Some(out_path.as_path()), false, buf)
        });
        result.unwrap();
        assert!(stdout.is_empty());

        let template: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(
            template["Outputs"]["GithubOidcRoleOutput"]["Export"]["Name"],
            "GithubOidcRoleArn"
        );
    }

    #[test]
    fn test_synth_rejects_invalid_stack_unless_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let args = StackArgs {
            config: Some(write_file(&dir, "empty.yaml", "repositories: []\n")),
            ..StackArgs::default()
        };

        let (result, _) = output_of(|buf| synth(&args, TemplateFormat::Json, None, false, buf));
        assert!(result.is_err());

        let (result, out) = output_of(|buf| synth(&args, TemplateFormat::Yaml, None, true, buf));
        result.unwrap();
        assert!(out.contains("AWS::IAM::Role"));
    }

    #[test]
    fn test_validate_command_prints_findings() {
        let dir = tempfile::tempdir().unwrap();
        let (result, out) = output_of(|buf| validate(&config_args(&dir), buf));
        result.unwrap();
        assert!(out.contains("warning [broad_permissions]"));
        assert!(out.contains("ok: role GitHubOidcRole trusts 3 subject pattern(s)"));
    }

    #[test]
    fn test_validate_reports_each_finding_once() {
        let dir = tempfile::tempdir().unwrap();
        let logs = Captured::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();

        let (result, out) = tracing::subscriber::with_default(subscriber, || {
            output_of(|buf| validate(&config_args(&dir), buf))
        });
        result.unwrap();

        let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out.matches("broad_permissions").count(), 1);
        assert!(!logged.contains("full account access"), "{}", logged);
    }

    #[test]
    fn test_export_check_reads_short_form_get_att() {
        let dir = tempfile::tempdir().unwrap();
        let renamed = write_file(
            &dir,
            "renamed.yaml",
            "Outputs:\n  GithubOidcRoleOutput:\n    Value: !GetAtt GitHubOidcRole.Arn\n    Export:\n      Name: OldArn\n",
        );

        let (result, _) = output_of(|buf| export_check(&config_args(&dir), &renamed, buf));
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrustError>().map(TrustError::exit_code),
            Some(4)
        );
    }

    #[test]
    fn test_check_command() {
        let dir = tempfile::tempdir().unwrap();
        let allowed = write_file(
            &dir,
            "allowed.json",
            r#"{"iss":"https://token.actions.githubusercontent.com","sub":"repo:marciocadev/openid-connect-cdk:ref:refs/heads/main","aud":"sts.amazonaws.com"}"#,
        );
        let denied = write_file(
            &dir,
            "denied.json",
            r#"{"iss":"https://token.actions.githubusercontent.com","sub":"repo:evil/openid-connect-cdk:ref:refs/heads/main","aud":"sts.amazonaws.com"}"#,
        );

        let (result, out) = output_of(|buf| check(&config_args(&dir), &allowed, buf));
        result.unwrap();
        assert!(out.starts_with("allowed:"));

        let (result, _) = output_of(|buf| check(&config_args(&dir), &denied, buf));
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrustError>().map(TrustError::exit_code),
            Some(3)
        );
    }

    #[test]
    fn test_export_check_command() {
        let dir = tempfile::tempdir().unwrap();
        let same = write_file(
            &dir,
            "same.yaml",
            "Outputs:\n  GithubOidcRoleOutput:\n    Value:\n      Fn::GetAtt: [GitHubOidcRole, Arn]\n    Export:\n      Name: GithubOidcRoleArn\n",
        );
        let renamed = write_file(
            &dir,
            "renamed.json",
            r#"{"Outputs":{"GithubOidcRoleOutput":{"Value":{"Fn::GetAtt":["GitHubOidcRole","Arn"]},"Export":{"Name":"OldArn"}}}}"#,
        );

        let (result, _) = output_of(|buf| export_check(&config_args(&dir), &same, buf));
        result.unwrap();

        let (result, _) = output_of(|buf| export_check(&config_args(&dir), &renamed, buf));
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrustError>().map(TrustError::exit_code),
            Some(4)
        );
    }
}
