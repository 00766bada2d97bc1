//! End-to-end service behavior against the canonical fixture

use orgdata_core::prelude::*;
use orgdata_core::{HierarchyNode, ValidationError};
use orgdata_test_utils::{empty_employees_bytes, fixture_bytes, loaded_service, ScriptedSource};
use pretty_assertions::assert_eq;

#[test]
fn test_membership_lookups() {
    let service = loaded_service();

    assert_eq!(service.teams_for_uid("jsmith"), vec!["test-team".to_string()]);
    assert!(service.is_employee_in_team("jsmith", "test-team"));
    assert!(service.is_employee_in_org("jsmith", "test-org"));
    assert!(!service.is_employee_in_org("jsmith", "platform-org"));

    let slack = service.employee_by_slack_id("U12345678").unwrap();
    assert_eq!(slack.uid, "jsmith");
    assert_eq!(
        service.employee_by_github_id("jsmith-gh").map(|e| e.uid),
        Some("jsmith".to_string())
    );
    assert!(service.employee_by_slack_id("U00000000").is_none());
}

#[test]
fn test_user_organizations_through_chain() {
    let service = loaded_service();

    assert_eq!(
        service.user_organizations("bwilson"),
        vec![
            OrgInfo::new("platform-team", OrgInfoType::Team),
            OrgInfo::new("platform-org", OrgInfoType::Organization),
            OrgInfo::new("test-org", OrgInfoType::Organization),
            OrgInfo::new("engineering", OrgInfoType::Pillar),
            OrgInfo::new("backend-teams", OrgInfoType::TeamGroup),
        ]
    );
    assert_eq!(
        service.user_organizations_for_slack_id("U12345678"),
        vec![
            OrgInfo::new("test-team", OrgInfoType::Team),
            OrgInfo::new("test-org", OrgInfoType::Organization),
        ]
    );
}

#[test]
fn test_hierarchy_path_and_tree() {
    let service = loaded_service();

    let path: Vec<_> = service
        .hierarchy_path("platform-team", "team")
        .into_iter()
        .map(|e| (e.name, e.entity_type))
        .collect();
    assert_eq!(
        path,
        vec![
            ("platform-team".to_string(), EntityKind::Team),
            ("backend-teams".to_string(), EntityKind::TeamGroup),
            ("engineering".to_string(), EntityKind::Pillar),
            ("platform-org".to_string(), EntityKind::Org),
            ("test-org".to_string(), EntityKind::Org),
        ]
    );

    let tree = service.descendants_tree("platform-org").unwrap();
    assert_eq!(
        tree,
        HierarchyNode {
            name: "platform-org".into(),
            entity_type: EntityKind::Org,
            children: vec![HierarchyNode {
                name: "engineering".into(),
                entity_type: EntityKind::Pillar,
                children: vec![HierarchyNode {
                    name: "backend-teams".into(),
                    entity_type: EntityKind::TeamGroup,
                    children: vec![HierarchyNode::leaf("platform-team", EntityKind::Team)],
                }],
            }],
        }
    );
    assert!(service.descendants_tree("nonexistent").is_none());
}

#[test]
fn test_rejected_document_keeps_state() {
    let service = loaded_service();
    let before = service.version();

    let err = service
        .load_bytes("mem://empty", &empty_employees_bytes())
        .unwrap_err();
    assert!(matches!(
        err,
        OrgDataError::Validation {
            error: ValidationError::MissingEmployees,
            ..
        }
    ));
    assert_eq!(service.version(), before);
    assert_eq!(service.teams_for_uid("jsmith"), vec!["test-team".to_string()]);
}

#[test]
fn test_queries_before_first_load() {
    let service = Service::new();

    assert!(service.version().is_initial());
    assert!(service.teams_for_uid("jsmith").is_empty());
    assert!(service.employee_by_uid("jsmith").is_none());
    assert!(!service.is_employee_in_org("jsmith", "test-org"));
    assert!(service.user_organizations("jsmith").is_empty());
    assert!(service.hierarchy_path("test-team", "team").is_empty());
    assert!(service.descendants_tree("test-org").is_none());
    assert!(service.all_employee_uids().is_empty());
    assert!(service.jira_projects().is_empty());
}

#[tokio::test]
async fn test_load_from_source() {
    let source = ScriptedSource::fixture();
    let service = Service::with_source(&source).await.unwrap();

    assert_eq!(source.load_count(), 1);
    assert_eq!(service.version().employee_count, 2);
    assert_eq!(service.version().org_count, 2);
    assert_eq!(service.metadata().unwrap().data_version, "test-v1.0");
}

#[tokio::test]
async fn test_source_failure_keeps_state() {
    let source = ScriptedSource::fixture();
    let service = Service::with_source(&source).await.unwrap();
    let before = service.version();

    source.fail_loads("bucket unavailable");
    let err = service.load(&source).await.unwrap_err();
    assert!(matches!(err, OrgDataError::Load(_)));
    assert!(err.is_retryable());
    assert_eq!(service.version(), before);
}

#[tokio::test]
async fn test_reload_is_idempotent() {
    let source = ScriptedSource::fixture();
    let service = Service::new();

    let first = service.load(&source).await.unwrap();
    let teams = service.teams_for_uid("jsmith");
    let second = service.load(&source).await.unwrap();

    assert!(second.load_time > first.load_time);
    assert_eq!(second.employee_count, first.employee_count);
    assert_eq!(second.org_count, first.org_count);
    assert_eq!(service.teams_for_uid("jsmith"), teams);
}

#[test]
fn test_enumeration_and_components() {
    let service = loaded_service();

    assert_eq!(
        service.all_employee_uids(),
        vec!["jsmith".to_string(), "bwilson".to_string()]
    );
    assert_eq!(
        service.all_org_names(),
        vec!["test-org".to_string(), "platform-org".to_string()]
    );
    assert_eq!(service.all_pillar_names(), vec!["engineering".to_string()]);
    assert_eq!(service.all_team_group_names(), vec!["backend-teams".to_string()]);
    assert_eq!(service.all_teams().len(), 2);
    assert!(service.all_components().is_empty());
}

#[test]
fn test_jira_ownership() {
    let service = loaded_service();

    assert_eq!(service.jira_projects(), vec!["PLAT".to_string()]);
    let owners: Vec<_> = service
        .teams_by_jira_project("PLAT")
        .into_iter()
        .map(|o| o.name)
        .collect();
    assert_eq!(owners, vec!["platform-team".to_string(), "test-team".to_string()]);

    let owned: Vec<_> = service
        .jira_ownership_for_team("platform-team")
        .into_iter()
        .map(|o| o.component)
        .collect();
    assert_eq!(owned, vec!["_project_level".to_string(), "api".to_string()]);
}

#[test]
fn test_manager_and_members() {
    let service = loaded_service();

    assert_eq!(service.manager_for_employee("jsmith").unwrap().uid, "bwilson");
    let members: Vec<_> = service
        .team_members("platform-team")
        .into_iter()
        .map(|e| e.uid)
        .collect();
    assert_eq!(members, vec!["bwilson".to_string()]);
}

#[test]
fn test_fixture_bytes_parse() {
    let snapshot = orgdata_core::parse(&fixture_bytes()).unwrap();
    assert_eq!(snapshot.employee_count(), 2);
}
