//! Joins between independently listed collections.
//!
//! - [`GroupIndex`] flattens a user's group memberships into names and ids.
//! - [`PermissionSetDirectory`] maps permission set names to ARNs and
//!   refuses duplicate names.
//! - [`enumerate_assignments`] walks every active account × permission set
//!   pair, drains its assignments and resolves each principal.
//!
//! The cross product is the expensive part of an assignment report: with A
//! accounts and P permission sets it issues A×P paginated listings. Pairs
//! are independent, so they run concurrently up to a limit; each pair is
//! drained and resolved completely before its rows are handed back, and
//! the rows come back in submission order.

use super::resolver::{PrincipalResolver, Resolution};
use super::types::{Account, Group, PermissionSet, PrincipalKind, SsoInstance, User};
use crate::source::IdentitySource;
use crate::utils::paginate::Paginator;
use crate::utils::progress::ProgressBar;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use thiserror::Error;

/// Separator of the flattened `GroupMembership*` columns.
pub const MEMBERSHIP_DELIMITER: &str = ", ";

/// Referential problems found while joining.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("user {user_id} is a member of group {group_id}, which is not in the group listing")]
    GroupNotFound { user_id: String, group_id: String },

    #[error("permission set name {name:?} is used by both {first_arn} and {second_arn}")]
    DuplicatePermissionSetName {
        name: String,
        first_arn: String,
        second_arn: String,
    },
}

/// A user's groups, names and ids in membership order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMemberships {
    pub names: Vec<String>,
    pub ids: Vec<String>,
}

impl GroupMemberships {
    pub fn joined_names(&self) -> String {
        self.names.join(MEMBERSHIP_DELIMITER)
    }

    pub fn joined_ids(&self) -> String {
        self.ids.join(MEMBERSHIP_DELIMITER)
    }
}

/// Group id → display name, built once before the join.
#[derive(Debug, Default)]
pub struct GroupIndex {
    names: HashMap<String, String>,
}

impl GroupIndex {
    pub fn build(groups: &[Group]) -> Self {
        let names = groups
            .iter()
            .map(|g| (g.group_id.clone(), g.display_name.clone()))
            .collect();
        Self { names }
    }

    pub fn name_of(&self, group_id: &str) -> Option<&str> {
        self.names.get(group_id).map(String::as_str)
    }

    /// Resolve every membership of `user`, failing on the first group id
    /// that is not in the index.
    pub fn flatten(&self, user: &User) -> Result<GroupMemberships, JoinError> {
        let mut memberships = GroupMemberships::default();

        for group_id in &user.group_ids {
            let name = self
                .name_of(group_id)
                .ok_or_else(|| JoinError::GroupNotFound {
                    user_id: user.user_id.clone(),
                    group_id: group_id.clone(),
                })?;
            memberships.names.push(name.to_string());
            memberships.ids.push(group_id.clone());
        }

        Ok(memberships)
    }
}

/// Permission sets of one instance, unique by name, in listing order.
#[derive(Debug, Clone, Default)]
pub struct PermissionSetDirectory {
    sets: Vec<PermissionSet>,
}

impl PermissionSetDirectory {
    /// Build from `(arn, name)` pairs. Two ARNs with the same name are a
    /// data-integrity error.
    pub fn from_described<I>(described: I) -> Result<Self, JoinError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut by_name: HashMap<String, String> = HashMap::new();
        let mut sets = Vec::new();

        for (arn, name) in described {
            if let Some(first_arn) = by_name.get(&name) {
                return Err(JoinError::DuplicatePermissionSetName {
                    name,
                    first_arn: first_arn.clone(),
                    second_arn: arn,
                });
            }
            by_name.insert(name.clone(), arn.clone());
            sets.push(PermissionSet { name, arn });
        }

        Ok(Self { sets })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PermissionSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Keep only the first `limit` permission sets.
    pub fn truncate(&mut self, limit: usize) {
        self.sets.truncate(limit);
    }
}

/// One assignment with its principal resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAssignment {
    pub account_id: String,
    pub account_name: String,
    pub permission_set: String,
    pub kind: PrincipalKind,
    pub principal_name: String,
}

/// Every (active account, permission set) pair, account-major.
pub fn assignment_pairs<'a>(
    accounts: &'a [Account],
    permission_sets: &'a PermissionSetDirectory,
) -> Vec<(&'a Account, &'a PermissionSet)> {
    accounts
        .iter()
        .filter(|account| account.is_active())
        .flat_map(|account| permission_sets.iter().map(move |set| (account, set)))
        .collect()
}

/// List and resolve the assignments of every active account × permission
/// set pair, at most `concurrency` pairs in flight.
///
/// Rows of one pair stay contiguous and pairs appear in the order of
/// [`assignment_pairs`]. The first failing pair fails the whole call.
pub async fn enumerate_assignments<S>(
    source: &S,
    paginator: &Paginator,
    instance: &SsoInstance,
    accounts: &[Account],
    permission_sets: &PermissionSetDirectory,
    concurrency: usize,
    progress: &ProgressBar,
) -> Result<Vec<ResolvedAssignment>>
where
    S: IdentitySource + ?Sized,
{
    let resolver = PrincipalResolver::new(source, paginator, &instance.identity_store_id);
    let resolver = &resolver;
    let pairs = assignment_pairs(accounts, permission_sets);

    let blocks: Vec<Vec<ResolvedAssignment>> = stream::iter(pairs)
        .map(move |(account, permission_set)| async move {
            let key = format!("{}/{}", account.id, permission_set.arn);
            let refs = paginator
                .collect_all("ListAccountAssignments", &key, |token| {
                    source.list_account_assignments(
                        &instance.instance_arn,
                        &account.id,
                        &permission_set.arn,
                        token,
                    )
                })
                .await
                .with_context(|| {
                    format!(
                        "Failed to list assignments of permission set {} on account {}",
                        permission_set.name, account.id
                    )
                })?;

            let mut rows = Vec::with_capacity(refs.len());
            for assignment in refs {
                let resolution = resolver
                    .resolve(assignment.kind, &assignment.principal_id)
                    .await
                    .with_context(|| {
                        format!(
                            "Failed to resolve {} {} assigned {} on account {}",
                            assignment.kind,
                            assignment.principal_id,
                            permission_set.name,
                            account.id
                        )
                    })?;

                if resolution == Resolution::Gone {
                    progress.println(format!(
                        "⚠️  {} {} was deleted while the report was running",
                        assignment.kind, assignment.principal_id
                    ));
                }

                rows.push(ResolvedAssignment {
                    account_id: account.id.clone(),
                    account_name: account.name.clone(),
                    permission_set: permission_set.name.clone(),
                    kind: assignment.kind,
                    principal_name: resolution.into_display_name(assignment.kind),
                });
            }

            progress.inc();
            Ok::<_, anyhow::Error>(rows)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(blocks.into_iter().flatten().collect())
}
