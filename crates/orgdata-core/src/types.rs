//! Core types for orgdata
//!
//! Defines the records of the directory document:
//! - Employees and the four parallel group tables (teams, orgs, pillars, team groups)
//! - Direct membership facts and precomputed ancestry records
//! - Output projections for hierarchy queries
//! - Load metadata ([`DataVersion`])
//!
//! Upstream producers emit `null` for empty arrays, so every collection field
//! accepts `null` and treats it as empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deserialize a field that may be `null` into its default value
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Kind of group entity in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Organization
    Org,
    /// Pillar
    Pillar,
    /// Team group
    TeamGroup,
    /// Team
    Team,
}

impl EntityKind {
    /// All kinds, broadest first
    pub const ALL: [EntityKind; 4] = [Self::Org, Self::Pillar, Self::TeamGroup, Self::Team];

    /// Type tag as it appears in the document
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Org => "org",
            Self::Pillar => "pillar",
            Self::TeamGroup => "team_group",
            Self::Team => "team",
        }
    }

    /// Relationship index category key for this kind
    #[inline]
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Org => "orgs",
            Self::Pillar => "pillars",
            Self::TeamGroup => "team_groups",
            Self::Team => "teams",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized entity type tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type: '{0}'")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownEntityKind(s.to_string()))
    }
}

/// Employee record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Employee {
    pub uid: String,
    pub full_name: String,
    pub email: String,
    pub job_title: String,
    pub slack_uid: String,
    pub github_id: String,
    pub rhat_geo: String,
    pub cost_center: i64,
    pub manager_uid: Option<String>,
    pub is_people_manager: bool,
}

impl Employee {
    /// Manager uid, if one is set
    #[inline]
    #[must_use]
    pub fn manager_uid(&self) -> Option<&str> {
        self.manager_uid.as_deref().filter(|uid| !uid.is_empty())
    }
}

/// Parent reference carried on group entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentRef {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Slack channel configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelInfo {
    pub channel: String,
    pub channel_id: String,
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<String>,
}

/// Slack alias configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasInfo {
    pub alias: String,
    pub description: String,
}

/// Slack channels and aliases of a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub channels: Vec<ChannelInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub aliases: Vec<AliasInfo>,
}

/// Role assignment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub people: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<String>,
}

/// Jira project/component link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraInfo {
    pub project: String,
    pub component: String,
    pub description: String,
    pub view: String,
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<String>,
}

/// Repository link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoInfo {
    pub repo: String,
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
    pub branch: String,
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<String>,
}

/// Mailing list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailInfo {
    pub address: String,
    pub name: String,
    pub description: String,
}

/// Documentation or resource link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceInfo {
    pub name: String,
    pub url: String,
    pub description: String,
}

/// Component ownership
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentRoleInfo {
    pub component: String,
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<String>,
}

/// Group type descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupType {
    pub name: String,
}

/// Membership and configuration shared by all group entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub group_type: GroupType,
    #[serde(deserialize_with = "null_as_default")]
    pub resolved_people_uid_list: Vec<String>,
    pub slack: Option<SlackConfig>,
    #[serde(deserialize_with = "null_as_default")]
    pub roles: Vec<RoleInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub jiras: Vec<JiraInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub repos: Vec<RepoInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub emails: Vec<EmailInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub resources: Vec<ResourceInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub component_roles: Vec<ComponentRoleInfo>,
}

/// Team, org, pillar or team group
///
/// The four tables share this shape and differ only in what their type
/// tag means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub uid: String,
    pub name: String,
    pub tab_name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub parent: Option<ParentRef>,
    #[serde(deserialize_with = "null_as_default")]
    pub group: Group,
}

/// Team record
pub type Team = Entity;
/// Organization record
pub type Org = Entity;
/// Pillar record
pub type Pillar = Entity;
/// Team group record
pub type TeamGroup = Entity;

/// Product component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub description: String,
    pub parent: Option<ParentRef>,
    pub parent_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repos: Vec<RepoInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub jiras: Vec<JiraInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub repos_list: Vec<String>,
}

/// Document summary written by the upstream indexer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub generated_at: String,
    pub data_version: String,
    pub total_employees: u64,
    pub total_orgs: u64,
    pub total_teams: u64,
}

/// Direct membership of an employee in a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub membership_type: String,
}

impl MembershipEntry {
    /// Parsed membership kind, `None` for unrecognized tags
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        self.membership_type.parse().ok()
    }

    /// Check if this is a membership of the given kind
    #[inline]
    #[must_use]
    pub fn is(&self, kind: EntityKind) -> bool {
        self.kind() == Some(kind)
    }
}

/// Ancestors of one entity, by category
///
/// Precomputed upstream; within each category the order is the order the
/// indexer wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AncestryRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub orgs: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub teams: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub pillars: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub team_groups: Vec<String>,
}

impl AncestryRecord {
    /// Total number of ancestors across all categories
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.orgs.len() + self.teams.len() + self.pillars.len() + self.team_groups.len()
    }

    /// Check if the record lists no ancestors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ancestor names of one kind
    #[must_use]
    pub fn of_kind(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Org => &self.orgs,
            EntityKind::Pillar => &self.pillars,
            EntityKind::TeamGroup => &self.team_groups,
            EntityKind::Team => &self.teams,
        }
    }

    /// Check if `name` is listed as an ancestor of the given kind
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: EntityKind, name: &str) -> bool {
        self.of_kind(kind).iter().any(|n| n == name)
    }
}

/// Relationship index entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relationship {
    #[serde(deserialize_with = "null_as_default")]
    pub ancestry: AncestryRecord,
}

/// Owner of a Jira project or component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraOwner {
    pub name: String,
    #[serde(rename = "type")]
    pub owner_type: String,
}

/// A Jira project/component pair owned by a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraOwnership {
    pub project: String,
    pub component: String,
}

/// Kind tag of an [`OrgInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgInfoType {
    #[serde(rename = "Organization")]
    Organization,
    #[serde(rename = "Team")]
    Team,
    #[serde(rename = "Pillar")]
    Pillar,
    #[serde(rename = "Team Group")]
    TeamGroup,
    #[serde(rename = "Parent Team")]
    ParentTeam,
}

impl OrgInfoType {
    /// Display label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "Organization",
            Self::Team => "Team",
            Self::Pillar => "Pillar",
            Self::TeamGroup => "Team Group",
            Self::ParentTeam => "Parent Team",
        }
    }
}

impl fmt::Display for OrgInfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One group an employee belongs to, directly or through ancestry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrgInfoType,
}

impl OrgInfo {
    pub fn new(name: impl Into<String>, org_type: OrgInfoType) -> Self {
        Self {
            name: name.into(),
            org_type,
        }
    }
}

/// One hop of a hierarchy path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyPathEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityKind,
}

impl HierarchyPathEntry {
    pub fn new(name: impl Into<String>, entity_type: EntityKind) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }
}

/// Node of a descendants tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityKind,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Node without children
    pub fn leaf(name: impl Into<String>, entity_type: EntityKind) -> Self {
        Self {
            name: name.into(),
            entity_type,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including self
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }

    /// Find a direct child by name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&HierarchyNode> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Metadata of the most recent successful load
///
/// Zero-valued (epoch load time, zero counts) before the first load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataVersion {
    pub load_time: DateTime<Utc>,
    pub org_count: usize,
    pub employee_count: usize,
}

impl DataVersion {
    /// Check if no load has happened yet
    #[inline]
    #[must_use]
    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_parses_case_insensitively() {
        assert_eq!("Team".parse::<EntityKind>(), Ok(EntityKind::Team));
        assert_eq!("TEAM_GROUP".parse::<EntityKind>(), Ok(EntityKind::TeamGroup));
        assert!("division".parse::<EntityKind>().is_err());
    }

    #[test]
    fn entity_kind_serializes_as_tag() {
        let json = serde_json::to_string(&EntityKind::TeamGroup).unwrap();
        assert_eq!(json, "\"team_group\"");
    }

    #[test]
    fn employee_accepts_null_manager() {
        let emp: Employee =
            serde_json::from_str(r#"{"uid": "jsmith", "manager_uid": null}"#).unwrap();
        assert_eq!(emp.uid, "jsmith");
        assert_eq!(emp.manager_uid(), None);
    }

    #[test]
    fn employee_empty_manager_is_absent() {
        let emp: Employee = serde_json::from_str(r#"{"uid": "a", "manager_uid": ""}"#).unwrap();
        assert_eq!(emp.manager_uid(), None);
    }

    #[test]
    fn entity_tolerates_null_collections() {
        let team: Entity = serde_json::from_str(
            r#"{"name": "t", "group": {"resolved_people_uid_list": null, "keywords": null}}"#,
        )
        .unwrap();
        assert!(team.group.resolved_people_uid_list.is_empty());
        assert!(team.group.keywords.is_empty());
    }

    #[test]
    fn ancestry_record_lookup_by_kind() {
        let record = AncestryRecord {
            orgs: vec!["o1".into(), "o2".into()],
            pillars: vec!["p".into()],
            ..AncestryRecord::default()
        };
        assert_eq!(record.len(), 3);
        assert!(record.contains(EntityKind::Org, "o2"));
        assert!(!record.contains(EntityKind::Team, "o2"));
    }

    #[test]
    fn org_info_type_serializes_with_spaces() {
        let info = OrgInfo::new("backend", OrgInfoType::TeamGroup);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "Team Group");
    }

    #[test]
    fn membership_entry_kind() {
        let entry = MembershipEntry {
            name: "x".into(),
            membership_type: "team".into(),
        };
        assert!(entry.is(EntityKind::Team));
        assert!(!entry.is(EntityKind::Org));
    }

    #[test]
    fn data_version_default_is_initial() {
        assert!(DataVersion::default().is_initial());
    }
}
