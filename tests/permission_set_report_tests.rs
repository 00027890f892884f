mod common;

use common::{find_report, options, read_rows, FakeSource};
use sso_audit_tools::commands::permission_set_report;
use sso_audit_tools::identity::types::ManagedPolicy;
use tempfile::TempDir;

fn policy(name: &str) -> ManagedPolicy {
    ManagedPolicy {
        name: name.to_string(),
        arn: format!("arn:aws:iam::aws:policy/{}", name),
    }
}

fn permission_sets() -> FakeSource {
    let mut source = FakeSource::default();
    source
        .permission_set("arn:ps-admin", "Admin")
        .permission_set("arn:ps-read", "Read Only")
        .permission_set("arn:ps-empty", "Empty");
    source.managed_policies.insert(
        "arn:ps-admin".to_string(),
        vec![policy("AdministratorAccess"), policy("Billing"), policy("SupportUser")],
    );
    source
        .managed_policies
        .insert("arn:ps-read".to_string(), vec![policy("ReadOnlyAccess")]);
    source.inline_policies.insert(
        "arn:ps-read".to_string(),
        r#"{"Version":"2012-10-17","Statement":[{"Effect":"Deny","Action":"s3:*","Resource":"*"}]}"#
            .to_string(),
    );
    source
        .inline_policies
        .insert("arn:ps-empty".to_string(), "  ".to_string());
    source
}

#[tokio::test]
async fn test_managed_policies_per_permission_set() {
    let dir = TempDir::new().unwrap();
    let source = permission_sets();

    let paths = permission_set_report::run(&source, &options(dir.path()), None)
        .await
        .unwrap();

    let csv = find_report(dir.path(), "sso_report_Managed_Policies_per_Permission_Set_");
    assert_eq!(paths[0], csv);

    let rows: Vec<(String, String)> = read_rows(&csv)
        .iter()
        .map(|row| (row["PermissionSet"].clone(), row["ManagedPolicyName"].clone()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Admin".to_string(), "AdministratorAccess".to_string()),
            ("Admin".to_string(), "Billing".to_string()),
            ("Admin".to_string(), "SupportUser".to_string()),
            ("Read Only".to_string(), "ReadOnlyAccess".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_inline_policy_written_as_pretty_json() {
    let dir = TempDir::new().unwrap();
    let source = permission_sets();

    let paths = permission_set_report::run(&source, &options(dir.path()), None)
        .await
        .unwrap();

    assert_eq!(paths.len(), 2);
    let json = find_report(dir.path(), "sso_report_InlinePolicy_for_Read_Only_");
    assert_eq!(paths[1], json);

    let contents = std::fs::read_to_string(&json).unwrap();
    assert!(contents.starts_with("{\n  \""), "{}", contents);
    let document: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(document["Statement"][0]["Effect"], "Deny");
}

#[tokio::test]
async fn test_invalid_inline_policy_names_permission_set() {
    let dir = TempDir::new().unwrap();
    let mut source = permission_sets();
    source
        .inline_policies
        .insert("arn:ps-admin".to_string(), "{\"Version\":".to_string());

    let err = permission_set_report::run(&source, &options(dir.path()), None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Admin"), "{}", err);
}

#[tokio::test]
async fn test_limit_keeps_first_permission_sets() {
    let dir = TempDir::new().unwrap();
    let source = permission_sets();

    let paths = permission_set_report::run(&source, &options(dir.path()), Some(1))
        .await
        .unwrap();

    assert_eq!(paths.len(), 1);
    assert_eq!(read_rows(&paths[0]).len(), 3);
    assert!(source
        .calls_to("ListManagedPoliciesInPermissionSet")
        .iter()
        .all(|call| call.contains("arn:ps-admin")));
}
