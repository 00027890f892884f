//! Enumeration of the directories the reports join over.
//!
//! Each function drains one listing through the [`Paginator`] and returns
//! it whole. Errors name the call and key that failed.

use super::join::PermissionSetDirectory;
use super::parser::{parse_credential_events, ParsedEvents};
use super::types::{Account, Group, ManagedPolicy, Organization, SsoInstance, User};
use crate::source::{IdentitySource, SourceError};
use crate::utils::paginate::Paginator;
use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};

/// Key used for calls that take no arguments.
const NO_KEY: &str = "-";

pub async fn describe_organization<S>(source: &S, paginator: &Paginator) -> Result<Organization>
where
    S: IdentitySource + ?Sized,
{
    paginator
        .call("DescribeOrganization", NO_KEY, || source.describe_organization())
        .await
        .context("Failed to describe the organization")
}

/// Select the SSO instance to report on.
///
/// One instance per run: the first one the caller can see.
pub async fn select_sso_instance<S>(source: &S, paginator: &Paginator) -> Result<SsoInstance>
where
    S: IdentitySource + ?Sized,
{
    let instances = paginator
        .collect_all("ListInstances", NO_KEY, |token| source.list_instances(token))
        .await
        .context("Failed to list SSO instances")?;

    if instances.len() > 1 {
        eprintln!(
            "⚠️  {} SSO instances visible, reporting on the first: {}",
            instances.len(),
            instances[0].instance_arn
        );
    }

    instances
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No SSO instance is visible to the caller"))
}

/// All accounts of the organization, whatever their status.
pub async fn list_accounts<S>(source: &S, paginator: &Paginator) -> Result<Vec<Account>>
where
    S: IdentitySource + ?Sized,
{
    paginator
        .collect_all("ListAccounts", NO_KEY, |token| source.list_accounts(token))
        .await
        .context("Failed to list organization accounts")
}

/// Lists permission sets and describes each to learn its name.
///
/// A name shared by two permission sets is rejected with
/// [`super::join::JoinError::DuplicatePermissionSetName`].
pub async fn fetch_permission_sets<S>(
    source: &S,
    paginator: &Paginator,
    instance_arn: &str,
) -> Result<PermissionSetDirectory>
where
    S: IdentitySource + ?Sized,
{
    let arns = paginator
        .collect_all("ListPermissionSets", instance_arn, |token| {
            source.list_permission_sets(instance_arn, token)
        })
        .await
        .context("Failed to list permission sets")?;

    let mut described = Vec::with_capacity(arns.len());
    for arn in arns {
        let name = paginator
            .call("DescribePermissionSet", &arn, || {
                source.describe_permission_set(instance_arn, &arn)
            })
            .await
            .with_context(|| format!("Failed to describe permission set {}", arn))?;
        described.push((arn, name));
    }

    PermissionSetDirectory::from_described(described)
        .context("Permission set names are not unique")
}

/// Lists users, then each user's group memberships, at most `concurrency`
/// membership listings in flight. Users keep their listing order.
pub async fn fetch_users<S>(
    source: &S,
    paginator: &Paginator,
    identity_store_id: &str,
    concurrency: usize,
) -> Result<Vec<User>>
where
    S: IdentitySource + ?Sized,
{
    let users = paginator
        .collect_all("ListUsers", identity_store_id, |token| {
            source.list_users(identity_store_id, token)
        })
        .await
        .context("Failed to list identity store users")?;

    stream::iter(users)
        .map(move |mut user| async move {
            user.group_ids = paginator
                .collect_all("ListGroupMembershipsForMember", &user.user_id, |token| {
                    source.list_group_memberships(identity_store_id, &user.user_id, token)
                })
                .await
                .with_context(|| format!("Failed to list group memberships of {}", user.user_id))?;
            Ok::<_, anyhow::Error>(user)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

pub async fn fetch_groups<S>(
    source: &S,
    paginator: &Paginator,
    identity_store_id: &str,
) -> Result<Vec<Group>>
where
    S: IdentitySource + ?Sized,
{
    paginator
        .collect_all("ListGroups", identity_store_id, |token| {
            source.list_groups(identity_store_id, token)
        })
        .await
        .context("Failed to list identity store groups")
}

/// Looks up `CredentialVerification` events and parses them.
pub async fn fetch_credential_events<S>(source: &S, paginator: &Paginator) -> Result<ParsedEvents>
where
    S: IdentitySource + ?Sized,
{
    let raw = paginator
        .collect_all("LookupEvents", "CredentialVerification", |token| {
            source.lookup_credential_events(token)
        })
        .await
        .context("Failed to look up credential verification events")?;

    Ok(parse_credential_events(&raw))
}

/// Managed policies attached to a permission set.
pub async fn fetch_managed_policies<S>(
    source: &S,
    paginator: &Paginator,
    instance_arn: &str,
    permission_set_arn: &str,
) -> Result<Vec<ManagedPolicy>, SourceError>
where
    S: IdentitySource + ?Sized,
{
    paginator
        .collect_all("ListManagedPoliciesInPermissionSet", permission_set_arn, |token| {
            source.list_managed_policies(instance_arn, permission_set_arn, token)
        })
        .await
}

/// Inline policy of a permission set; `None` when absent or empty.
pub async fn fetch_inline_policy<S>(
    source: &S,
    paginator: &Paginator,
    instance_arn: &str,
    permission_set_arn: &str,
) -> Result<Option<String>, SourceError>
where
    S: IdentitySource + ?Sized,
{
    let policy = paginator
        .call("GetInlinePolicyForPermissionSet", permission_set_arn, || {
            source.get_inline_policy(instance_arn, permission_set_arn)
        })
        .await?;

    Ok(policy.filter(|document| !document.trim().is_empty()))
}
