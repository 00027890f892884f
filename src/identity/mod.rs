//! Identity Center data: what is fetched, how it is parsed and how it is
//! joined into report rows.
//!
//! - [`types`] - Accounts, permission sets, users, groups and audit events
//! - [`directory`] - Draining the listings the reports join over
//! - [`parser`] - `CredentialVerification` CloudTrail records
//! - [`auth_stats`] - Per-user authentication statistics
//! - [`resolver`] - Principal id to display name, with deletion sentinels
//! - [`join`] - Group memberships, permission set names, assignment fan-out

pub mod auth_stats;
pub mod directory;
pub mod join;
pub mod parser;
pub mod resolver;
pub mod types;
