//! # SSO Audit Tools
//!
//! Command-line reports over an AWS IAM Identity Center (SSO) instance and
//! the organization it belongs to.
//!
//! ## Reports
//!
//! - `credential-report` - Every identity store user with group memberships,
//!   counts of successful and failed authentications, first and last
//!   occurrence of each, and days since the last successful one
//! - `assignment-report` - Every (account, permission set, principal)
//!   assignment across the organization's active accounts
//! - `permission-set-report` - Managed policies attached to each
//!   permission set, plus inline policy documents as JSON
//!
//! Reports are snapshots: every run enumerates everything from scratch and
//! writes timestamped files that are never appended to.
//!
//! ## Architecture
//!
//! - [`source`] - The [`source::IdentitySource`] trait every report reads through
//! - [`aws_api`] - AWS SDK implementation of that trait
//! - [`identity`] - Listings, event parsing, authentication statistics, joins
//! - [`report`] - Report rows, assembly and file output
//! - [`commands`] - One module per subcommand
//! - [`utils`] - Pagination with retry, progress, time, file helpers
//!
//! ## Example Usage
//!
//! ```bash
//! # Credential activity from CloudTrail LookupEvents
//! sso-audit credential-report --profile management --region us-east-1
//!
//! # Credential activity from exported trail files (.json, .gz, .zst)
//! sso-audit credential-report --cloudtrail-logs trail/*.json.gz
//!
//! # Account assignments, 16 pairs in flight
//! sso-audit assignment-report --concurrency 16 --output-dir reports/
//!
//! # Managed and inline policies of every permission set
//! sso-audit permission-set-report
//! ```

pub mod aws_api;
pub mod commands;
pub mod identity;
pub mod report;
pub mod source;
pub mod utils;
