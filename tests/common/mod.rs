//! In-memory identity source shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sso_audit_tools::commands::ReportOptions;
use sso_audit_tools::identity::types::{
    Account, AccountStatus, AssignmentRef, Group, ManagedPolicy, Organization, PrincipalKind,
    SsoInstance, User,
};
use sso_audit_tools::source::{IdentitySource, Page, SourceError};
use sso_audit_tools::utils::paginate::RetryPolicy;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const INSTANCE_ARN: &str = "arn:aws:sso:::instance/ssoins-test";
pub const IDENTITY_STORE_ID: &str = "d-test";
pub const MANAGEMENT_ACCOUNT_ID: &str = "999999999999";

/// An organization held in memory. Listings are served in pages of
/// `page_size` items and every call is recorded.
pub struct FakeSource {
    pub instances: Vec<SsoInstance>,
    pub accounts: Vec<Account>,
    /// `(arn, name)` in listing order
    pub permission_sets: Vec<(String, String)>,
    /// `(account id, permission set arn)` → assignments
    pub assignments: HashMap<(String, String), Vec<AssignmentRef>>,
    /// Users with their group ids; `list_users` strips the ids
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    /// Principals that describe calls report as not found
    pub deleted: HashSet<String>,
    pub events: Vec<String>,
    pub managed_policies: HashMap<String, Vec<ManagedPolicy>>,
    pub inline_policies: HashMap<String, String>,
    pub page_size: usize,
    /// Per-account delay of assignment listings
    pub assignment_delays: HashMap<String, Duration>,
    /// Operation name → number of throttling errors still to return
    pub throttle: Mutex<HashMap<String, usize>>,
    /// Operations that always fail with a permission error
    pub denied: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self {
            instances: vec![SsoInstance {
                instance_arn: INSTANCE_ARN.to_string(),
                identity_store_id: IDENTITY_STORE_ID.to_string(),
            }],
            accounts: Vec::new(),
            permission_sets: Vec::new(),
            assignments: HashMap::new(),
            users: Vec::new(),
            groups: Vec::new(),
            deleted: HashSet::new(),
            events: Vec::new(),
            managed_policies: HashMap::new(),
            inline_policies: HashMap::new(),
            page_size: 2,
            assignment_delays: HashMap::new(),
            throttle: Mutex::new(HashMap::new()),
            denied: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSource {
    pub fn account(&mut self, id: &str, name: &str, status: AccountStatus) -> &mut Self {
        self.accounts.push(Account {
            id: id.to_string(),
            name: name.to_string(),
            status,
        });
        self
    }

    pub fn permission_set(&mut self, arn: &str, name: &str) -> &mut Self {
        self.permission_sets.push((arn.to_string(), name.to_string()));
        self
    }

    pub fn user(&mut self, id: &str, name: &str, groups: &[&str]) -> &mut Self {
        self.users.push(User {
            user_id: id.to_string(),
            user_name: name.to_string(),
            display_name: Some(format!("{} Example", name)),
            primary_email: Some(format!("{}@example.com", name)),
            group_ids: groups.iter().map(|g| g.to_string()).collect(),
        });
        self
    }

    pub fn group(&mut self, id: &str, name: &str) -> &mut Self {
        self.groups.push(Group {
            group_id: id.to_string(),
            display_name: name.to_string(),
        });
        self
    }

    pub fn assign(
        &mut self,
        account_id: &str,
        permission_set_arn: &str,
        kind: PrincipalKind,
        principal_id: &str,
    ) -> &mut Self {
        self.assignments
            .entry((account_id.to_string(), permission_set_arn.to_string()))
            .or_default()
            .push(AssignmentRef {
                kind,
                principal_id: principal_id.to_string(),
            });
        self
    }

    pub fn throttle(&self, operation: &str, times: usize) {
        self.throttle
            .lock()
            .unwrap()
            .insert(operation.to_string(), times);
    }

    pub fn deny(&self, operation: &str) {
        self.denied.lock().unwrap().insert(operation.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{}(", operation);
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(&prefix))
            .collect()
    }

    fn record(&self, operation: &str, key: &str) -> Result<(), SourceError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}({})", operation, key));

        if self.denied.lock().unwrap().contains(operation) {
            return Err(SourceError::Fatal {
                operation: operation.to_string(),
                key: key.to_string(),
                message: "AccessDeniedException: User is not authorized to perform this action"
                    .to_string(),
            });
        }

        let mut throttle = self.throttle.lock().unwrap();
        if let Some(remaining) = throttle.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::Transient {
                    operation: operation.to_string(),
                    key: key.to_string(),
                    message: "ThrottlingException: Rate exceeded".to_string(),
                });
            }
        }
        Ok(())
    }

    fn page<T: Clone>(&self, items: &[T], token: Option<String>) -> Page<T> {
        let start = token.map(|t| t.parse::<usize>().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        Page {
            items: items[start..end].to_vec(),
            next_token: (end < items.len()).then(|| end.to_string()),
        }
    }
}

#[async_trait]
impl IdentitySource for FakeSource {
    async fn describe_organization(&self) -> Result<Organization, SourceError> {
        self.record("DescribeOrganization", "-")?;
        Ok(Organization {
            management_account_id: MANAGEMENT_ACCOUNT_ID.to_string(),
        })
    }

    async fn list_instances(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SsoInstance>, SourceError> {
        self.record("ListInstances", "-")?;
        Ok(self.page(&self.instances, next_token))
    }

    async fn list_accounts(&self, next_token: Option<String>) -> Result<Page<Account>, SourceError> {
        self.record("ListAccounts", "-")?;
        Ok(self.page(&self.accounts, next_token))
    }

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError> {
        self.record("ListPermissionSets", instance_arn)?;
        let arns: Vec<String> = self.permission_sets.iter().map(|(arn, _)| arn.clone()).collect();
        Ok(self.page(&arns, next_token))
    }

    async fn describe_permission_set(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, SourceError> {
        self.record("DescribePermissionSet", permission_set_arn)?;
        self.permission_sets
            .iter()
            .find(|(arn, _)| arn == permission_set_arn)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| SourceError::NotFound {
                operation: "DescribePermissionSet".to_string(),
                key: permission_set_arn.to_string(),
            })
    }

    async fn list_account_assignments(
        &self,
        _instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<AssignmentRef>, SourceError> {
        self.record(
            "ListAccountAssignments",
            &format!("{}/{}", account_id, permission_set_arn),
        )?;
        if let Some(delay) = self.assignment_delays.get(account_id) {
            tokio::time::sleep(*delay).await;
        }
        let assignments = self
            .assignments
            .get(&(account_id.to_string(), permission_set_arn.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(self.page(&assignments, next_token))
    }

    async fn list_users(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<User>, SourceError> {
        self.record("ListUsers", identity_store_id)?;
        let users: Vec<User> = self
            .users
            .iter()
            .map(|user| User {
                group_ids: Vec::new(),
                ..user.clone()
            })
            .collect();
        Ok(self.page(&users, next_token))
    }

    async fn list_groups(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Group>, SourceError> {
        self.record("ListGroups", identity_store_id)?;
        Ok(self.page(&self.groups, next_token))
    }

    async fn list_group_memberships(
        &self,
        _identity_store_id: &str,
        user_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError> {
        self.record("ListGroupMembershipsForMember", user_id)?;
        let group_ids = self
            .users
            .iter()
            .find(|user| user.user_id == user_id)
            .map(|user| user.group_ids.clone())
            .unwrap_or_default();
        Ok(self.page(&group_ids, next_token))
    }

    async fn describe_user(
        &self,
        _identity_store_id: &str,
        user_id: &str,
    ) -> Result<String, SourceError> {
        self.record("DescribeUser", user_id)?;
        self.users
            .iter()
            .find(|user| user.user_id == user_id && !self.deleted.contains(user_id))
            .map(|user| user.user_name.clone())
            .ok_or_else(|| SourceError::NotFound {
                operation: "DescribeUser".to_string(),
                key: user_id.to_string(),
            })
    }

    async fn describe_group(
        &self,
        _identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, SourceError> {
        self.record("DescribeGroup", group_id)?;
        self.groups
            .iter()
            .find(|group| group.group_id == group_id && !self.deleted.contains(group_id))
            .map(|group| group.display_name.clone())
            .ok_or_else(|| SourceError::NotFound {
                operation: "DescribeGroup".to_string(),
                key: group_id.to_string(),
            })
    }

    async fn lookup_credential_events(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError> {
        self.record("LookupEvents", "CredentialVerification")?;
        Ok(self.page(&self.events, next_token))
    }

    async fn list_managed_policies(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<ManagedPolicy>, SourceError> {
        self.record("ListManagedPoliciesInPermissionSet", permission_set_arn)?;
        let policies = self
            .managed_policies
            .get(permission_set_arn)
            .cloned()
            .unwrap_or_default();
        Ok(self.page(&policies, next_token))
    }

    async fn get_inline_policy(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<Option<String>, SourceError> {
        self.record("GetInlinePolicyForPermissionSet", permission_set_arn)?;
        Ok(self.inline_policies.get(permission_set_arn).cloned())
    }
}

/// A `CredentialVerification` event as `LookupEvents` embeds it.
pub fn credential_event(user: &str, time: &str, outcome: &str) -> String {
    format!(
        r#"{{"eventVersion":"1.08","eventName":"CredentialVerification","eventSource":"signin.amazonaws.com","eventTime":"{}","userIdentity":{{"type":"Unknown","userName":"{}"}},"serviceEventDetails":{{"CredentialVerification":"{}","CredentialType":"PASSWORD"}}}}"#,
        time, user, outcome
    )
}

/// Report options writing to `output_dir`, with millisecond backoff.
pub fn options(output_dir: &Path) -> ReportOptions {
    ReportOptions {
        output_dir: output_dir.to_path_buf(),
        concurrency: 4,
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(5),
            call_timeout: Duration::from_secs(5),
        },
        run_timeout: Duration::from_secs(30),
    }
}

/// The only file in `dir` whose name starts with `prefix`.
pub fn find_report(dir: &Path, prefix: &str) -> PathBuf {
    let matches: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect();
    assert_eq!(matches.len(), 1, "expected one {} file, found {:?}", prefix, matches);
    matches.into_iter().next().unwrap()
}

/// CSV records of a report as header → value maps.
pub fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}
