//! Report rows and their assembly.
//!
//! Each report has a row type whose field order is the CSV column order.
//! The `assemble_*` functions turn joined data into rows; writing them out
//! is [`writer`]'s job.
//!
//! Row order is deterministic: credential rows follow user listing order,
//! assignment rows follow account × permission set order, policy rows
//! follow permission set listing order.

pub mod writer;

use crate::identity::auth_stats::AuthStats;
use crate::identity::join::{GroupIndex, JoinError, ResolvedAssignment};
use crate::identity::types::{ManagedPolicy, Organization, SsoInstance, Timestamp, User};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Column order of the credential report.
pub const CREDENTIAL_COLUMNS: [&str; 16] = [
    "AwsAccountId",
    "SsoInstanceARN",
    "IdentityStoreId",
    "UserId",
    "UserName",
    "DisplayName",
    "PrimaryEmail",
    "GroupMembershipIds",
    "GroupMembershipNames",
    "CountSuccess",
    "DaysSinceSuccess",
    "LatestSuccess",
    "EarliestSuccess",
    "CountFailure",
    "LatestFailure",
    "EarliestFailure",
];

pub const ASSIGNMENT_COLUMNS: [&str; 5] = [
    "AccountID",
    "AccountName",
    "ObjectType",
    "ObjectName",
    "PermissionSet",
];

pub const MANAGED_POLICY_COLUMNS: [&str; 3] =
    ["PermissionSet", "ManagedPolicyName", "ManagedPolicyARN"];

/// One line of the credential report.
///
/// Authentication columns are empty when the user has no recorded
/// authentication events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialRow {
    pub aws_account_id: String,
    #[serde(rename = "SsoInstanceARN")]
    pub sso_instance_arn: String,
    pub identity_store_id: String,
    pub user_id: String,
    pub user_name: String,
    pub display_name: Option<String>,
    pub primary_email: Option<String>,
    pub group_membership_ids: String,
    pub group_membership_names: String,
    pub count_success: Option<u64>,
    pub days_since_success: Option<i64>,
    pub latest_success: Option<String>,
    pub earliest_success: Option<String>,
    pub count_failure: Option<u64>,
    pub latest_failure: Option<String>,
    pub earliest_failure: Option<String>,
}

/// Credential rows plus the users that could not be joined.
#[derive(Debug, Default)]
pub struct CredentialReport {
    pub rows: Vec<CredentialRow>,
    pub failures: Vec<JoinError>,
}

/// One line of the assignment report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentRow {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    #[serde(rename = "AccountName")]
    pub account_name: String,
    #[serde(rename = "ObjectType")]
    pub object_type: String,
    #[serde(rename = "ObjectName")]
    pub object_name: String,
    #[serde(rename = "PermissionSet")]
    pub permission_set: String,
}

/// One line of the permission set report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedPolicyRow {
    #[serde(rename = "PermissionSet")]
    pub permission_set: String,
    #[serde(rename = "ManagedPolicyName")]
    pub managed_policy_name: String,
    #[serde(rename = "ManagedPolicyARN")]
    pub managed_policy_arn: String,
}

/// Inline policy document of one permission set.
#[derive(Debug, Clone, PartialEq)]
pub struct InlinePolicy {
    pub permission_set: String,
    pub document: serde_json::Value,
}

/// Build one credential row per user.
///
/// A user whose memberships reference a group missing from `groups` gets
/// no row; the failure is recorded in [`CredentialReport::failures`].
/// Authentication stats are matched by user name.
pub fn assemble_credential_report(
    organization: &Organization,
    instance: &SsoInstance,
    users: &[User],
    groups: &GroupIndex,
    auth_stats: &HashMap<String, AuthStats>,
) -> CredentialReport {
    let mut report = CredentialReport::default();

    for user in users {
        let memberships = match groups.flatten(user) {
            Ok(memberships) => memberships,
            Err(err) => {
                report.failures.push(err);
                continue;
            }
        };

        let stats = auth_stats.get(&user.user_name);
        let raw = |ts: Option<&Timestamp>| ts.map(|t| t.raw.clone());

        report.rows.push(CredentialRow {
            aws_account_id: organization.management_account_id.clone(),
            sso_instance_arn: instance.instance_arn.clone(),
            identity_store_id: instance.identity_store_id.clone(),
            user_id: user.user_id.clone(),
            user_name: user.user_name.clone(),
            display_name: user.display_name.clone(),
            primary_email: user.primary_email.clone(),
            group_membership_ids: memberships.joined_ids(),
            group_membership_names: memberships.joined_names(),
            count_success: stats.map(|s| s.success.count),
            days_since_success: stats.and_then(|s| s.days_since_success),
            latest_success: raw(stats.and_then(|s| s.success.latest.as_ref())),
            earliest_success: raw(stats.and_then(|s| s.success.earliest.as_ref())),
            count_failure: stats.map(|s| s.failure.count),
            latest_failure: raw(stats.and_then(|s| s.failure.latest.as_ref())),
            earliest_failure: raw(stats.and_then(|s| s.failure.earliest.as_ref())),
        });
    }

    report
}

pub fn assemble_assignment_rows(assignments: Vec<ResolvedAssignment>) -> Vec<AssignmentRow> {
    assignments
        .into_iter()
        .map(|a| AssignmentRow {
            account_id: a.account_id,
            account_name: a.account_name,
            object_type: a.kind.as_str().to_string(),
            object_name: a.principal_name,
            permission_set: a.permission_set,
        })
        .collect()
}

pub fn assemble_managed_policy_rows(
    permission_set: &str,
    policies: &[ManagedPolicy],
) -> Vec<ManagedPolicyRow> {
    policies
        .iter()
        .map(|policy| ManagedPolicyRow {
            permission_set: permission_set.to_string(),
            managed_policy_name: policy.name.clone(),
            managed_policy_arn: policy.arn.clone(),
        })
        .collect()
}

/// Parse an inline policy document.
pub fn parse_inline_policy(permission_set: &str, document: &str) -> Result<InlinePolicy> {
    let document = serde_json::from_str(document).with_context(|| {
        format!(
            "Inline policy of permission set {} is not valid JSON",
            permission_set
        )
    })?;

    Ok(InlinePolicy {
        permission_set: permission_set.to_string(),
        document,
    })
}
