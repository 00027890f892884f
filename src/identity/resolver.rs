//! Principal id → display name resolution.
//!
//! Assignments are listed first and their principals resolved afterwards,
//! so a user or group deleted in between is expected, not exceptional.
//! Such a principal resolves to [`Resolution::Gone`] and is reported under
//! a sentinel name; every other failure is returned to the caller.

use super::types::PrincipalKind;
use crate::source::{IdentitySource, SourceError};
use crate::utils::paginate::Paginator;

/// Name reported for a user deleted while the report was running.
pub const DELETED_USER: &str = "USER-GROUP";

/// Name reported for a group deleted while the report was running.
pub const DELETED_GROUP: &str = "DELETED-GROUP";

/// Outcome of resolving one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    /// The principal no longer exists in the identity store.
    Gone,
}

impl Resolution {
    /// The name to put in a report: the resolved name, or the sentinel for
    /// `kind` when the principal is gone.
    pub fn display_name(&self, kind: PrincipalKind) -> &str {
        match self {
            Self::Resolved(name) => name,
            Self::Gone => match kind {
                PrincipalKind::User => DELETED_USER,
                PrincipalKind::Group => DELETED_GROUP,
            },
        }
    }

    pub fn into_display_name(self, kind: PrincipalKind) -> String {
        match self {
            Self::Resolved(name) => name,
            Self::Gone => Self::Gone.display_name(kind).to_string(),
        }
    }
}

/// Resolves principals against one identity store.
pub struct PrincipalResolver<'a, S: ?Sized> {
    source: &'a S,
    paginator: &'a Paginator,
    identity_store_id: &'a str,
}

impl<'a, S: IdentitySource + ?Sized> PrincipalResolver<'a, S> {
    pub fn new(source: &'a S, paginator: &'a Paginator, identity_store_id: &'a str) -> Self {
        Self {
            source,
            paginator,
            identity_store_id,
        }
    }

    /// Look up the user name (users) or display name (groups) of a principal.
    pub async fn resolve(&self, kind: PrincipalKind, id: &str) -> Result<Resolution, SourceError> {
        let store = self.identity_store_id;
        let looked_up = match kind {
            PrincipalKind::User => {
                self.paginator
                    .call("DescribeUser", id, || self.source.describe_user(store, id))
                    .await
            }
            PrincipalKind::Group => {
                self.paginator
                    .call("DescribeGroup", id, || self.source.describe_group(store, id))
                    .await
            }
        };

        match looked_up {
            Ok(name) => Ok(Resolution::Resolved(name)),
            Err(err) if err.is_not_found() => Ok(Resolution::Gone),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_name_is_kept() {
        let resolution = Resolution::Resolved("alice".to_string());
        assert_eq!(resolution.display_name(PrincipalKind::User), "alice");
        assert_eq!(resolution.into_display_name(PrincipalKind::Group), "alice");
    }

    #[test]
    fn test_gone_uses_sentinel_per_kind() {
        assert_eq!(Resolution::Gone.display_name(PrincipalKind::User), "USER-GROUP");
        assert_eq!(
            Resolution::Gone.into_display_name(PrincipalKind::Group),
            "DELETED-GROUP"
        );
    }
}
