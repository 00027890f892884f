//! AWS-backed [`IdentitySource`].
//!
//! Uses the AWS SDK for Rust with the standard credential chain
//! (environment, shared profile, instance role). SDK-level retries are
//! disabled: [`crate::utils::paginate::Paginator`] owns retrying, so every
//! error is classified once here and handed back.
//!
//! Classification:
//!
//! - `ResourceNotFoundException` becomes [`SourceError::NotFound`]
//! - throttling and server-side codes, timeouts, dispatch and response
//!   failures become [`SourceError::Transient`]
//! - everything else becomes [`SourceError::Fatal`]

use crate::identity::parser::CREDENTIAL_VERIFICATION;
use crate::identity::types::{
    Account, AccountStatus, AssignmentRef, Group, ManagedPolicy, Organization, PrincipalKind,
    SsoInstance, User,
};
use crate::source::{IdentitySource, Page, SourceError};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::Region;
use aws_sdk_cloudtrail::types::{LookupAttribute, LookupAttributeKey};
use aws_sdk_identitystore::types::MemberId;
use aws_sdk_ssoadmin::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssoadmin::types::PrincipalType;
use std::fmt::Debug;

/// Error codes worth retrying.
const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "InternalServerException",
    "InternalFailure",
    "ServiceException",
    "ServiceUnavailableException",
    "ConcurrentModificationException",
];

/// Where to load AWS configuration from.
#[derive(Debug, Clone, Default)]
pub struct AwsClientConfig {
    /// Named profile from the shared config files
    pub profile: Option<String>,
    /// Region override; defaults to the environment's region
    pub region: Option<String>,
}

/// Clients for the four services the reports read from.
pub struct AwsClient {
    organizations: aws_sdk_organizations::Client,
    sso_admin: aws_sdk_ssoadmin::Client,
    identity_store: aws_sdk_identitystore::Client,
    cloudtrail: aws_sdk_cloudtrail::Client,
}

impl AwsClient {
    pub async fn new(config: &AwsClientConfig) -> Self {
        let mut loader = aws_config::from_env().retry_config(RetryConfig::disabled());

        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        let sdk_config = loader.load().await;

        Self {
            organizations: aws_sdk_organizations::Client::new(&sdk_config),
            sso_admin: aws_sdk_ssoadmin::Client::new(&sdk_config),
            identity_store: aws_sdk_identitystore::Client::new(&sdk_config),
            cloudtrail: aws_sdk_cloudtrail::Client::new(&sdk_config),
        }
    }
}

/// Map an SDK error onto [`SourceError`].
fn classify<E, R>(operation: &str, key: &str, err: SdkError<E, R>) -> SourceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    let operation = operation.to_string();
    let key = key.to_string();
    let message = DisplayErrorContext(&err).to_string();

    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            SourceError::Transient {
                operation,
                key,
                message,
            }
        }
        SdkError::ServiceError(service) => match service.err().code() {
            Some("ResourceNotFoundException") => SourceError::NotFound { operation, key },
            Some(code) if TRANSIENT_CODES.contains(&code) => SourceError::Transient {
                operation,
                key,
                message,
            },
            _ => SourceError::Fatal {
                operation,
                key,
                message,
            },
        },
        _ => SourceError::Fatal {
            operation,
            key,
            message,
        },
    }
}

fn missing(operation: &str, key: &str, field: &str) -> SourceError {
    SourceError::Malformed {
        operation: operation.to_string(),
        key: key.to_string(),
        message: format!("response has no {}", field),
    }
}

#[async_trait]
impl IdentitySource for AwsClient {
    async fn describe_organization(&self) -> Result<Organization, SourceError> {
        const OP: &str = "DescribeOrganization";
        let output = self
            .organizations
            .describe_organization()
            .send()
            .await
            .map_err(|e| classify(OP, "-", e))?;

        let management_account_id = output
            .organization()
            .and_then(|org| org.master_account_id())
            .ok_or_else(|| missing(OP, "-", "management account id"))?;

        Ok(Organization {
            management_account_id: management_account_id.to_string(),
        })
    }

    async fn list_instances(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SsoInstance>, SourceError> {
        const OP: &str = "ListInstances";
        let output = self
            .sso_admin
            .list_instances()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify(OP, "-", e))?;

        let items = output
            .instances()
            .iter()
            .map(|instance| {
                let (Some(instance_arn), Some(identity_store_id)) =
                    (instance.instance_arn(), instance.identity_store_id())
                else {
                    return Err(missing(OP, "-", "instance ARN or identity store id"));
                };
                Ok(SsoInstance {
                    instance_arn: instance_arn.to_string(),
                    identity_store_id: identity_store_id.to_string(),
                })
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    #[allow(deprecated)]
    async fn list_accounts(&self, next_token: Option<String>) -> Result<Page<Account>, SourceError> {
        const OP: &str = "ListAccounts";
        let output = self
            .organizations
            .list_accounts()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify(OP, "-", e))?;

        let items = output
            .accounts()
            .iter()
            .map(|account| {
                let id = account.id().ok_or_else(|| missing(OP, "-", "account id"))?;
                Ok(Account {
                    id: id.to_string(),
                    name: account.name().unwrap_or_default().to_string(),
                    status: account
                        .status()
                        .map(|status| AccountStatus::parse(status.as_str()))
                        .unwrap_or_else(|| AccountStatus::Other(String::new())),
                })
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError> {
        let output = self
            .sso_admin
            .list_permission_sets()
            .instance_arn(instance_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListPermissionSets", instance_arn, e))?;

        Ok(Page {
            items: output.permission_sets().to_vec(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, SourceError> {
        const OP: &str = "DescribePermissionSet";
        let output = self
            .sso_admin
            .describe_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .map_err(|e| classify(OP, permission_set_arn, e))?;

        output
            .permission_set()
            .and_then(|set| set.name())
            .map(str::to_string)
            .ok_or_else(|| missing(OP, permission_set_arn, "permission set name"))
    }

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<AssignmentRef>, SourceError> {
        const OP: &str = "ListAccountAssignments";
        let key = format!("{}/{}", account_id, permission_set_arn);
        let output = self
            .sso_admin
            .list_account_assignments()
            .instance_arn(instance_arn)
            .account_id(account_id)
            .permission_set_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify(OP, &key, e))?;

        let items = output
            .account_assignments()
            .iter()
            .map(|assignment| {
                let kind = match assignment.principal_type() {
                    Some(PrincipalType::User) => PrincipalKind::User,
                    Some(PrincipalType::Group) => PrincipalKind::Group,
                    _ => return Err(missing(OP, &key, "known principal type")),
                };
                let principal_id = assignment
                    .principal_id()
                    .ok_or_else(|| missing(OP, &key, "principal id"))?;
                Ok(AssignmentRef {
                    kind,
                    principal_id: principal_id.to_string(),
                })
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_users(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<User>, SourceError> {
        let output = self
            .identity_store
            .list_users()
            .identity_store_id(identity_store_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListUsers", identity_store_id, e))?;

        let items = output
            .users()
            .iter()
            .map(|user| User {
                user_id: user.user_id().to_string(),
                user_name: user.user_name().unwrap_or_default().to_string(),
                display_name: user.display_name().map(str::to_string),
                primary_email: user
                    .emails()
                    .iter()
                    .find(|email| email.primary())
                    .and_then(|email| email.value())
                    .map(str::to_string),
                group_ids: Vec::new(),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_groups(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Group>, SourceError> {
        let output = self
            .identity_store
            .list_groups()
            .identity_store_id(identity_store_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListGroups", identity_store_id, e))?;

        let items = output
            .groups()
            .iter()
            .map(|group| Group {
                group_id: group.group_id().to_string(),
                display_name: group.display_name().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_group_memberships(
        &self,
        identity_store_id: &str,
        user_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError> {
        const OP: &str = "ListGroupMembershipsForMember";
        let output = self
            .identity_store
            .list_group_memberships_for_member()
            .identity_store_id(identity_store_id)
            .member_id(MemberId::UserId(user_id.to_string()))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify(OP, user_id, e))?;

        let items = output
            .group_memberships()
            .iter()
            .map(|membership| {
                membership
                    .group_id()
                    .map(str::to_string)
                    .ok_or_else(|| missing(OP, user_id, "group id"))
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn describe_user(
        &self,
        identity_store_id: &str,
        user_id: &str,
    ) -> Result<String, SourceError> {
        const OP: &str = "DescribeUser";
        let output = self
            .identity_store
            .describe_user()
            .identity_store_id(identity_store_id)
            .user_id(user_id)
            .send()
            .await
            .map_err(|e| classify(OP, user_id, e))?;

        output
            .user_name()
            .map(str::to_string)
            .ok_or_else(|| missing(OP, user_id, "user name"))
    }

    async fn describe_group(
        &self,
        identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, SourceError> {
        const OP: &str = "DescribeGroup";
        let output = self
            .identity_store
            .describe_group()
            .identity_store_id(identity_store_id)
            .group_id(group_id)
            .send()
            .await
            .map_err(|e| classify(OP, group_id, e))?;

        output
            .display_name()
            .map(str::to_string)
            .ok_or_else(|| missing(OP, group_id, "display name"))
    }

    async fn lookup_credential_events(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<String>, SourceError> {
        const OP: &str = "LookupEvents";
        let attribute = LookupAttribute::builder()
            .attribute_key(LookupAttributeKey::EventName)
            .attribute_value(CREDENTIAL_VERIFICATION)
            .build()
            .map_err(|e| SourceError::Fatal {
                operation: OP.to_string(),
                key: CREDENTIAL_VERIFICATION.to_string(),
                message: e.to_string(),
            })?;

        let output = self
            .cloudtrail
            .lookup_events()
            .lookup_attributes(attribute)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify(OP, CREDENTIAL_VERIFICATION, e))?;

        Ok(Page {
            items: output
                .events()
                .iter()
                .filter_map(|event| event.cloud_trail_event())
                .map(str::to_string)
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_managed_policies(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<ManagedPolicy>, SourceError> {
        let output = self
            .sso_admin
            .list_managed_policies_in_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListManagedPoliciesInPermissionSet", permission_set_arn, e))?;

        let items = output
            .attached_managed_policies()
            .iter()
            .map(|policy| ManagedPolicy {
                name: policy.name().unwrap_or_default().to_string(),
                arn: policy.arn().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn get_inline_policy(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<Option<String>, SourceError> {
        let output = self
            .sso_admin
            .get_inline_policy_for_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .map_err(|e| classify("GetInlinePolicyForPermissionSet", permission_set_arn, e))?;

        Ok(output.inline_policy().map(str::to_string))
    }
}
