//! Permission set report command.
//!
//! Lists the managed policies attached to every permission set and saves
//! each inline policy document.
//!
//! # Usage
//!
//! ```bash
//! sso-audit permission-set-report --output-dir reports/
//! ```
//!
//! # Output
//!
//! - `sso_report_Managed_Policies_per_Permission_Set_<timestamp>.csv`
//! - `sso_report_InlinePolicy_for_<permission set>_<timestamp>.json` for
//!   each permission set with an inline policy

use super::{within_run_budget, ReportOptions};
use crate::identity::directory::{
    fetch_inline_policy, fetch_managed_policies, fetch_permission_sets, select_sso_instance,
};
use crate::report::writer::ReportWriter;
use crate::report::{
    assemble_managed_policy_rows, parse_inline_policy, InlinePolicy, MANAGED_POLICY_COLUMNS,
};
use crate::source::IdentitySource;
use crate::utils::format::{count_of, format_number};
use crate::utils::progress::ProgressBar;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;

pub const LABEL: &str = "Managed_Policies_per_Permission_Set";

/// File label of an inline policy document.
pub fn inline_policy_label(permission_set: &str) -> String {
    format!("InlinePolicy_for_{}", permission_set)
}

/// Generate the permission set report. `limit` keeps only the first
/// permission sets. Returns the CSV path followed by the inline policy
/// paths.
pub async fn run<S>(
    source: &S,
    options: &ReportOptions,
    limit: Option<usize>,
) -> Result<Vec<PathBuf>>
where
    S: IdentitySource + ?Sized,
{
    within_run_budget(options.run_timeout, generate(source, options, limit)).await
}

async fn generate<S>(
    source: &S,
    options: &ReportOptions,
    limit: Option<usize>,
) -> Result<Vec<PathBuf>>
where
    S: IdentitySource + ?Sized,
{
    let paginator = options.paginator();
    let writer = ReportWriter::new(&options.output_dir, Local::now());

    eprintln!("=== SSO Permission Set Report ===");

    let instance = select_sso_instance(source, &paginator).await?;
    eprintln!("SSO instance: {}", instance.instance_arn);
    eprintln!();

    eprintln!("Fetching permission sets...");
    let mut permission_sets =
        fetch_permission_sets(source, &paginator, &instance.instance_arn).await?;
    if let Some(limit) = limit {
        permission_sets.truncate(limit);
    }
    eprintln!("Found {}", count_of(permission_sets.len(), "permission set"));
    eprintln!();

    let progress = ProgressBar::new(permission_sets.len(), "Reading policies");
    let mut rows = Vec::new();
    let mut inline_policies: Vec<InlinePolicy> = Vec::new();

    for set in permission_sets.iter() {
        let policies =
            fetch_managed_policies(source, &paginator, &instance.instance_arn, &set.arn)
                .await
                .with_context(|| {
                    format!("Failed to list managed policies of permission set {}", set.name)
                })?;
        rows.extend(assemble_managed_policy_rows(&set.name, &policies));

        let inline = fetch_inline_policy(source, &paginator, &instance.instance_arn, &set.arn)
            .await
            .with_context(|| format!("Failed to get inline policy of permission set {}", set.name))?;
        if let Some(document) = inline {
            inline_policies.push(parse_inline_policy(&set.name, &document)?);
        }

        progress.inc();
    }
    progress.finish_with_message("Policies read");

    let mut paths = vec![writer.write_csv(LABEL, &MANAGED_POLICY_COLUMNS, &rows)?];
    for policy in &inline_policies {
        paths.push(writer.write_json(&inline_policy_label(&policy.permission_set), &policy.document)?);
    }

    println!("\n{}", "=".repeat(60));
    println!("Permission Set Report Summary");
    println!("{}", "=".repeat(60));
    println!("Permission sets:         {}", format_number(permission_sets.len()));
    println!("Managed policies:        {}", format_number(rows.len()));
    println!("Inline policies:         {}", format_number(inline_policies.len()));
    for path in &paths {
        println!("Output:                  {}", path.display());
    }

    Ok(paths)
}
