//! gh-oidc-trust: GitHub Actions OIDC trust stack for AWS
//!
//! Synthesizes the CloudFormation template for the OIDC provider and the
//! federated role, validates it before apply, and checks tokens against it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use gh_oidc_trust_core::error::TrustError;
use gh_oidc_trust_core::policy::{parse_repo_slug, TrustedRepoEntry};
use gh_oidc_trust_core::template::TemplateFormat;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "gh-oidc-trust",
    version,
    about = "GitHub Actions OIDC trust stack for AWS"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the stack definition comes from
#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Stack configuration file (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Trust an additional repository; repeatable
    #[arg(long = "repo", value_name = "OWNER/REPO[:FILTER]", value_parser = parse_repo)]
    pub repos: Vec<TrustedRepoEntry>,

    /// Pin the GitHub Actions issuer certificate thumbprint
    #[arg(long)]
    pub pin_thumbprint: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the CloudFormation template
    Synth {
        #[command(flatten)]
        stack: StackArgs,

        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: TemplateFormat,

        /// Write the template here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Render even when pre-apply validation fails
        #[arg(long)]
        skip_validation: bool,
    },

    /// Run pre-apply checks and print findings
    Validate {
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Print the trusted subject patterns, one per line
    Patterns {
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Evaluate decoded token claims (JSON) against the trust policy
    Check {
        #[command(flatten)]
        stack: StackArgs,

        /// Decoded JWT payload
        #[arg(long, value_name = "FILE")]
        claims: PathBuf,
    },

    /// Fail if the export name differs from a previously deployed template
    ExportCheck {
        #[command(flatten)]
        stack: StackArgs,

        /// Previously synthesized or deployed template (JSON or YAML)
        #[arg(long, value_name = "FILE")]
        previous: PathBuf,
    },
}

fn parse_repo(value: &str) -> Result<TrustedRepoEntry, String> {
    parse_repo_slug(value).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // logging goes to stderr so stdout stays a clean template
    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<TrustError>()
                .map(TrustError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Synth {
            stack,
            format,
            out,
            skip_validation,
        } => commands::synth(&stack, format, out.as_deref(), skip_validation, &mut stdout),
        Commands::Validate { stack } => commands::validate(&stack, &mut stdout),
        Commands::Patterns { stack } => commands::patterns(&stack, &mut stdout),
        Commands::Check { stack, claims } => commands::check(&stack, &claims, &mut stdout),
        Commands::ExportCheck { stack, previous } => {
            commands::export_check(&stack, &previous, &mut stdout)
        }
    }
}
