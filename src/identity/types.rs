//! Data structures for the identity domain: organization, SSO instance,
//! accounts, permission sets, principals and authentication events.
//!
//! These are the shapes the reports work with, independent of how the
//! upstream API spells them.

use chrono::{DateTime, Utc};
use std::fmt;

/// The organization that owns the accounts being audited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    /// Management (formerly "master") account id.
    pub management_account_id: String,
}

/// An IAM Identity Center instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoInstance {
    pub instance_arn: String,
    pub identity_store_id: String,
}

/// Lifecycle status of an account in the organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
    PendingClosure,
    /// Any status this tool does not know about.
    Other(String),
}

impl AccountStatus {
    /// Parses the upstream status string (`ACTIVE`, `SUSPENDED`, ...).
    pub fn parse(status: &str) -> Self {
        match status {
            "ACTIVE" => Self::Active,
            "SUSPENDED" => Self::Suspended,
            "PENDING_CLOSURE" => Self::PendingClosure,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub status: AccountStatus,
}

impl Account {
    /// Only active accounts take part in assignment reports.
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    pub name: String,
    pub arn: String,
}

/// The two kinds of principal a permission set can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    /// Upstream spelling, also used in the `ObjectType` report column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Group => "GROUP",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A principal as referenced by an account assignment, before its name
/// has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRef {
    pub kind: PrincipalKind,
    pub principal_id: String,
}

/// A user entry from the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    pub display_name: Option<String>,
    pub primary_email: Option<String>,
    /// Ids of the groups this user belongs to, in listing order.
    pub group_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub group_id: String,
    pub display_name: String,
}

/// Outcome of a credential verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Parses the `serviceEventDetails.CredentialVerification` value.
    /// Anything other than `Success` or `Failure` is not an outcome.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Success" => Some(Self::Success),
            "Failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// A point in time as it appeared upstream.
///
/// Comparisons go through `at`; `raw` is kept so the report shows the
/// timestamp exactly as it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub raw: String,
    pub at: DateTime<Utc>,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    /// User name of the principal. Correlated to users by name, not id.
    pub user_name: String,
    pub time: Timestamp,
    pub outcome: Outcome,
}
