//! Credential report command.
//!
//! Lists every user of the identity store with their group memberships and
//! authentication activity from `CredentialVerification` audit events.
//!
//! # Usage
//!
//! ```bash
//! # Events from the last 90 days via CloudTrail LookupEvents
//! sso-audit credential-report --output-dir reports/
//!
//! # Events from exported CloudTrail log files instead
//! sso-audit credential-report --cloudtrail-logs trail/*.json.gz
//! ```
//!
//! # Output
//!
//! `sso_report_Account_Credential_<timestamp>.csv` with one row per user.
//! Users without any recorded authentication have empty activity columns.
//!
//! A user who belongs to a group missing from the group listing gets no
//! row. The command writes the remaining rows, then fails with an error
//! naming every such user and group id.

use super::{within_run_budget, ReportOptions};
use crate::identity::auth_stats::fold_auth_events;
use crate::identity::directory::{
    describe_organization, fetch_credential_events, fetch_groups, fetch_users,
    select_sso_instance,
};
use crate::identity::join::GroupIndex;
use crate::identity::parser::read_cloudtrail_logs;
use crate::report::writer::ReportWriter;
use crate::report::{assemble_credential_report, CREDENTIAL_COLUMNS};
use crate::source::IdentitySource;
use crate::utils::format::{count_of, format_number};
use anyhow::{bail, Result};
use chrono::{Local, Utc};
use std::path::{Path, PathBuf};

/// File label of the credential report.
pub const LABEL: &str = "Account_Credential";

pub async fn run<S, P>(
    source: &S,
    options: &ReportOptions,
    cloudtrail_logs: &[P],
) -> Result<PathBuf>
where
    S: IdentitySource + ?Sized,
    P: AsRef<Path>,
{
    within_run_budget(options.run_timeout, generate(source, options, cloudtrail_logs)).await
}

async fn generate<S, P>(
    source: &S,
    options: &ReportOptions,
    cloudtrail_logs: &[P],
) -> Result<PathBuf>
where
    S: IdentitySource + ?Sized,
    P: AsRef<Path>,
{
    let paginator = options.paginator();
    let writer = ReportWriter::new(&options.output_dir, Local::now());

    eprintln!("=== SSO Credential Report ===");

    let organization = describe_organization(source, &paginator).await?;
    let instance = select_sso_instance(source, &paginator).await?;
    eprintln!("Organization: {}", organization.management_account_id);
    eprintln!("SSO instance: {}", instance.instance_arn);
    eprintln!();

    eprintln!("Fetching users and group memberships...");
    let users = fetch_users(
        source,
        &paginator,
        &instance.identity_store_id,
        options.concurrency,
    )
    .await?;
    eprintln!("Found {}", count_of(users.len(), "user"));

    eprintln!("Fetching groups...");
    let groups = fetch_groups(source, &paginator, &instance.identity_store_id).await?;
    let index = GroupIndex::build(&groups);
    eprintln!("Found {}", count_of(groups.len(), "group"));

    let parsed = if cloudtrail_logs.is_empty() {
        eprintln!("Looking up credential verification events...");
        fetch_credential_events(source, &paginator).await?
    } else {
        eprintln!(
            "Reading credential verification events from {}...",
            count_of(cloudtrail_logs.len(), "file")
        );
        read_cloudtrail_logs(cloudtrail_logs)?
    };
    eprintln!("Found {}", count_of(parsed.events.len(), "event"));
    for (reason, count) in &parsed.skipped {
        eprintln!("⚠️  Skipped {}: {}", count_of(*count, "event"), reason);
    }

    let stats = fold_auth_events(&parsed.events, Utc::now());
    let report = assemble_credential_report(&organization, &instance, &users, &index, &stats);

    let path = writer.write_csv(LABEL, &CREDENTIAL_COLUMNS, &report.rows)?;

    println!("\n{}", "=".repeat(60));
    println!("Credential Report Summary");
    println!("{}", "=".repeat(60));
    println!("Users listed:            {}", format_number(users.len()));
    println!("Rows written:            {}", format_number(report.rows.len()));
    println!("Users with activity:     {}", format_number(stats.len()));
    println!("Events analyzed:         {}", format_number(parsed.events.len()));
    println!("Events skipped:          {}", format_number(parsed.skipped_total()));
    println!("Output:                  {}", path.display());

    if !report.failures.is_empty() {
        let details: Vec<String> = report.failures.iter().map(ToString::to_string).collect();
        bail!(
            "{} left out of {}: {}",
            count_of(report.failures.len(), "user"),
            path.display(),
            details.join("; ")
        );
    }

    Ok(path)
}
