//! Report commands.
//!
//! Each module implements one subcommand of `sso-audit`:
//!
//! - [`credential_report`] - One row per user with group memberships and
//!   authentication activity
//! - [`assignment_report`] - One row per account, permission set and
//!   assigned principal
//! - [`permission_set_report`] - Managed policies per permission set, plus
//!   inline policy documents
//!
//! Commands are generic over [`crate::source::IdentitySource`] so they run
//! the same against AWS and against an in-memory source.

pub mod assignment_report;
pub mod credential_report;
pub mod permission_set_report;

use crate::utils::paginate::{Paginator, RetryPolicy};
use crate::utils::time::elapsed_human;
use anyhow::{bail, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Options shared by every report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Directory the report files are written to
    pub output_dir: PathBuf,
    /// Maximum concurrent listings in fan-outs
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Budget for the whole run
    pub run_timeout: Duration,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            concurrency: 8,
            retry: RetryPolicy::default(),
            run_timeout: Duration::from_secs(3600),
        }
    }
}

impl ReportOptions {
    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.retry.clone())
    }
}

/// Run `report` under the run budget and print how long it took.
pub async fn within_run_budget<T, F>(run_timeout: Duration, report: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();

    let Ok(result) = tokio::time::timeout(run_timeout, report).await else {
        bail!(
            "Report did not finish within its run budget of {}",
            elapsed_human(run_timeout)
        );
    };

    eprintln!(
        "The report took {} to generate.",
        elapsed_human(start.elapsed())
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_within_run_budget_passes_result_through() {
        let value = within_run_budget(Duration::from_secs(5), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_budget_exhaustion_fails_the_run() {
        let err = within_run_budget(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("run budget"));
    }

    #[test]
    fn test_default_options() {
        let options = ReportOptions::default();
        assert_eq!(options.concurrency, 8);
        assert_eq!(options.run_timeout, Duration::from_secs(3600));
        assert_eq!(options.retry.max_attempts, 5);
    }
}
