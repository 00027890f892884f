//! Account assignment report command.
//!
//! For every active account and every permission set, lists the users and
//! groups assigned and resolves them to names.
//!
//! # Usage
//!
//! ```bash
//! sso-audit assignment-report --output-dir reports/
//!
//! # More pairs in flight on large organizations
//! sso-audit assignment-report --concurrency 16
//!
//! # Only the first two active accounts, for a quick check
//! sso-audit assignment-report --limit 2
//! ```
//!
//! # Output
//!
//! `sso_report_Account_Assignments_<timestamp>.csv`. Principals deleted
//! while the report runs are written as `USER-GROUP` (users) or
//! `DELETED-GROUP` (groups).

use super::{within_run_budget, ReportOptions};
use crate::identity::directory::{fetch_permission_sets, list_accounts, select_sso_instance};
use crate::identity::join::{assignment_pairs, enumerate_assignments};
use crate::identity::types::Account;
use crate::report::writer::ReportWriter;
use crate::report::{assemble_assignment_rows, ASSIGNMENT_COLUMNS};
use crate::source::IdentitySource;
use crate::utils::format::{count_of, format_number};
use crate::utils::progress::ProgressBar;
use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;

pub const LABEL: &str = "Account_Assignments";

/// Generate the assignment report. `limit` keeps only the first active
/// accounts.
pub async fn run<S>(source: &S, options: &ReportOptions, limit: Option<usize>) -> Result<PathBuf>
where
    S: IdentitySource + ?Sized,
{
    within_run_budget(options.run_timeout, generate(source, options, limit)).await
}

async fn generate<S>(source: &S, options: &ReportOptions, limit: Option<usize>) -> Result<PathBuf>
where
    S: IdentitySource + ?Sized,
{
    let paginator = options.paginator();
    let writer = ReportWriter::new(&options.output_dir, Local::now());

    eprintln!("=== SSO Account Assignment Report ===");

    let instance = select_sso_instance(source, &paginator).await?;
    eprintln!("SSO instance: {}", instance.instance_arn);
    eprintln!();

    eprintln!("Fetching accounts...");
    let listed = list_accounts(source, &paginator).await?;
    let mut accounts: Vec<Account> = listed
        .iter()
        .filter(|account| account.is_active())
        .cloned()
        .collect();
    eprintln!(
        "Found {} ({} active)",
        count_of(listed.len(), "account"),
        format_number(accounts.len())
    );
    if let Some(limit) = limit {
        accounts.truncate(limit);
        eprintln!(
            "Limiting report to the first {}",
            count_of(accounts.len(), "active account")
        );
    }
    let active = accounts.len();

    eprintln!("Fetching permission sets...");
    let permission_sets =
        fetch_permission_sets(source, &paginator, &instance.instance_arn).await?;
    eprintln!("Found {}", count_of(permission_sets.len(), "permission set"));
    eprintln!();

    let pairs = assignment_pairs(&accounts, &permission_sets).len();
    let progress = ProgressBar::new(pairs, "Listing assignments");
    let assignments = enumerate_assignments(
        source,
        &paginator,
        &instance,
        &accounts,
        &permission_sets,
        options.concurrency,
        &progress,
    )
    .await?;
    progress.finish_with_message("Assignments listed");

    let rows = assemble_assignment_rows(assignments);
    let path = writer.write_csv(LABEL, &ASSIGNMENT_COLUMNS, &rows)?;

    println!("\n{}", "=".repeat(60));
    println!("Account Assignment Report Summary");
    println!("{}", "=".repeat(60));
    println!("Active accounts:         {}", format_number(active));
    println!("Permission sets:         {}", format_number(permission_sets.len()));
    println!("Pairs queried:           {}", format_number(pairs));
    println!("Assignments written:     {}", format_number(rows.len()));
    println!("Output:                  {}", path.display());

    Ok(path)
}
