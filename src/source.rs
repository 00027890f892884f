//! The interface every report needs from the outside world.
//!
//! [`IdentitySource`] lists the calls the reports make against the
//! organization, the SSO instance, its identity store and the audit trail.
//! The production implementation lives in [`crate::aws_api`]; tests use an
//! in-memory implementation.
//!
//! List calls are paginated: each returns a [`Page`] and takes the
//! continuation token of the previous page. Draining them is the job of
//! [`crate::utils::paginate`].

use crate::identity::types::{
    Account, AssignmentRef, Group, ManagedPolicy, Organization, SsoInstance, User,
};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A page that ends the listing.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Failure of a single external call.
///
/// Every variant carries the call name and the key it was made with, so a
/// failed run can say exactly what it was doing.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Throttling, network trouble, service temporarily unavailable.
    #[error("{operation}({key}) failed transiently: {message}")]
    Transient {
        operation: String,
        key: String,
        message: String,
    },

    #[error("{operation}({key}) timed out after {timeout:?}")]
    Timeout {
        operation: String,
        key: String,
        timeout: Duration,
    },

    /// The entity addressed by the call does not exist (any more).
    #[error("{operation}({key}): not found")]
    NotFound { operation: String, key: String },

    /// Permission denied, validation errors and everything else.
    #[error("{operation}({key}) failed: {message}")]
    Fatal {
        operation: String,
        key: String,
        message: String,
    },

    /// The call succeeded but the response lacked something required.
    #[error("{operation}({key}) returned an unusable response: {message}")]
    Malformed {
        operation: String,
        key: String,
        message: String,
    },
}

impl SourceError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read-only view of an organization and its SSO instance.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn describe_organization(&self) -> Result<Organization, SourceError>;

    async fn list_instances(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SsoInstance>, SourceError>;

    async fn list_accounts(&self, next_token: Option<String>) -> Result<Page<Account>, SourceError>;

    /// Lists permission set ARNs.
    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError>;

    /// Returns the name of a permission set.
    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, SourceError>;

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<AssignmentRef>, SourceError>;

    /// Lists users. Group memberships are left empty; see
    /// [`IdentitySource::list_group_memberships`].
    async fn list_users(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<User>, SourceError>;

    async fn list_groups(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Group>, SourceError>;

    /// Lists the ids of the groups a user belongs to.
    async fn list_group_memberships(
        &self,
        identity_store_id: &str,
        user_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError>;

    /// Returns the user name, or [`SourceError::NotFound`].
    async fn describe_user(&self, identity_store_id: &str, user_id: &str)
        -> Result<String, SourceError>;

    /// Returns the group display name, or [`SourceError::NotFound`].
    async fn describe_group(
        &self,
        identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, SourceError>;

    /// Lists `CredentialVerification` audit events as raw CloudTrail JSON
    /// documents.
    async fn lookup_credential_events(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError>;

    async fn list_managed_policies(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<ManagedPolicy>, SourceError>;

    /// Returns the inline policy document, `None` when there is none.
    async fn get_inline_policy(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<Option<String>, SourceError>;
}
