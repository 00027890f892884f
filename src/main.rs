use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use sso_audit_tools::aws_api::{AwsClient, AwsClientConfig};
use sso_audit_tools::commands::{self, ReportOptions};
use sso_audit_tools::utils::paginate::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sso-audit")]
#[command(about = "AWS IAM Identity Center audit reports", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Directory to write report files to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// AWS profile to use (defaults to the ambient credential chain)
    #[arg(long)]
    profile: Option<String>,

    /// AWS region to use (defaults to the environment's region)
    #[arg(long)]
    region: Option<String>,

    /// Maximum concurrent listings
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: u16,

    /// Attempts per AWS call before giving up on transient errors
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Timeout of a single AWS call, in seconds
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    call_timeout: u64,

    /// Timeout of the whole report, in seconds
    #[arg(long, default_value = "3600", value_parser = clap::value_parser!(u64).range(1..))]
    run_timeout: u64,
}

impl CommonArgs {
    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            output_dir: self.output_dir.clone(),
            concurrency: usize::from(self.concurrency),
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                call_timeout: Duration::from_secs(self.call_timeout),
                ..RetryPolicy::default()
            },
            run_timeout: Duration::from_secs(self.run_timeout),
        }
    }

    async fn client(&self) -> AwsClient {
        AwsClient::new(&AwsClientConfig {
            profile: self.profile.clone(),
            region: self.region.clone(),
        })
        .await
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Users with group memberships and authentication activity
    CredentialReport {
        #[command(flatten)]
        common: CommonArgs,

        /// Exported CloudTrail log files to read events from instead of
        /// LookupEvents (.json, .json.gz, .json.zst)
        #[arg(long, num_args = 1..)]
        cloudtrail_logs: Vec<PathBuf>,
    },

    /// Users and groups assigned to each account through each permission set
    AssignmentReport {
        #[command(flatten)]
        common: CommonArgs,

        /// Only report on the first N active accounts
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Managed and inline policies of each permission set
    PermissionSetReport {
        #[command(flatten)]
        common: CommonArgs,

        /// Only report on the first N permission sets
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CredentialReport {
            common,
            cloudtrail_logs,
        } => {
            let client = common.client().await;
            commands::credential_report::run(
                &client,
                &common.report_options(),
                cloudtrail_logs.as_slice(),
            )
            .await
            .map(|_| ())
        }
        Commands::AssignmentReport { common, limit } => {
            let client = common.client().await;
            commands::assignment_report::run(&client, &common.report_options(), limit)
                .await
                .map(|_| ())
        }
        Commands::PermissionSetReport { common, limit } => {
            let client = common.client().await;
            commands::permission_set_report::run(&client, &common.report_options(), limit)
                .await
                .map(|_| ())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sso-audit", &mut std::io::stdout());
            Ok(())
        }
    }
}
