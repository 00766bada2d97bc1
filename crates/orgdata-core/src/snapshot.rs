//! Immutable directory snapshot
//!
//! A [`Snapshot`] is the fully parsed document of one successful load. It is
//! never mutated after [`crate::loader::parse`] returns it; the service shares
//! it behind an `Arc` and replaces it wholesale on reload.
//!
//! Lookup tables keep document order so enumeration is deterministic.

use crate::types::{
    AncestryRecord, Component, Employee, Entity, EntityKind, JiraOwner, MembershipEntry, Metadata,
    Relationship,
};
use crate::types::null_as_default;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;

/// Main data tables keyed by natural key
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Lookups {
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) employees: IndexMap<String, Employee>,
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) teams: IndexMap<String, Entity>,
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) orgs: IndexMap<String, Entity>,
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) pillars: IndexMap<String, Entity>,
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) team_groups: IndexMap<String, Entity>,
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) components: IndexMap<String, Component>,
}

/// Direct memberships plus per-entity ancestry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MembershipIndexes {
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) membership_index: HashMap<String, Vec<MembershipEntry>>,
    /// category -> entity name -> relationship
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) relationship_index: HashMap<String, IndexMap<String, Relationship>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SlackIdMappings {
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) slack_uid_to_uid: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GithubIdMappings {
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) github_id_to_uid: HashMap<String, String>,
}

/// Precomputed indexes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Indexes {
    pub(crate) membership: MembershipIndexes,
    pub(crate) slack_id_mappings: SlackIdMappings,
    pub(crate) github_id_mappings: GithubIdMappings,
    /// project -> component -> owners
    #[serde(deserialize_with = "null_as_default")]
    pub(crate) jira: IndexMap<String, IndexMap<String, Vec<JiraOwner>>>,
}

/// Raw decoded document, before validation
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Document {
    pub(crate) metadata: Metadata,
    pub(crate) lookups: Lookups,
    pub(crate) indexes: Indexes,
}

/// All lookup tables and indexes from one loaded document
#[derive(Debug, Clone)]
pub struct Snapshot {
    metadata: Metadata,
    lookups: Lookups,
    indexes: Indexes,
}

impl Snapshot {
    pub(crate) fn from_document(doc: Document) -> Self {
        Self {
            metadata: doc.metadata,
            lookups: doc.lookups,
            indexes: doc.indexes,
        }
    }

    /// Upstream document metadata
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Employee by uid
    #[inline]
    #[must_use]
    pub fn employee(&self, uid: &str) -> Option<&Employee> {
        self.lookups.employees.get(uid)
    }

    /// Employee table in document order
    #[inline]
    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.lookups.employees.values()
    }

    /// Employee uids in document order
    #[inline]
    pub fn employee_uids(&self) -> impl Iterator<Item = &str> {
        self.lookups.employees.keys().map(String::as_str)
    }

    /// Number of employees
    #[inline]
    #[must_use]
    pub fn employee_count(&self) -> usize {
        self.lookups.employees.len()
    }

    /// Number of organizations
    #[inline]
    #[must_use]
    pub fn org_count(&self) -> usize {
        self.lookups.orgs.len()
    }

    /// Employee uid mapped from a Slack user id
    #[inline]
    #[must_use]
    pub fn uid_for_slack_id(&self, slack_id: &str) -> Option<&str> {
        self.indexes
            .slack_id_mappings
            .slack_uid_to_uid
            .get(slack_id)
            .map(String::as_str)
            .filter(|uid| !uid.is_empty())
    }

    /// Employee uid mapped from a GitHub id
    #[inline]
    #[must_use]
    pub fn uid_for_github_id(&self, github_id: &str) -> Option<&str> {
        self.indexes
            .github_id_mappings
            .github_id_to_uid
            .get(github_id)
            .map(String::as_str)
            .filter(|uid| !uid.is_empty())
    }

    fn table(&self, kind: EntityKind) -> &IndexMap<String, Entity> {
        match kind {
            EntityKind::Org => &self.lookups.orgs,
            EntityKind::Pillar => &self.lookups.pillars,
            EntityKind::TeamGroup => &self.lookups.team_groups,
            EntityKind::Team => &self.lookups.teams,
        }
    }

    /// Group entity by kind and name
    #[inline]
    #[must_use]
    pub fn entity(&self, kind: EntityKind, name: &str) -> Option<&Entity> {
        self.table(kind).get(name)
    }

    /// Entities of one kind in document order
    #[inline]
    pub fn entities(&self, kind: EntityKind) -> impl Iterator<Item = (&str, &Entity)> {
        self.table(kind).iter().map(|(name, e)| (name.as_str(), e))
    }

    /// Component by name
    #[inline]
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.lookups.components.get(name)
    }

    /// Components in document order
    #[inline]
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.lookups.components.values()
    }

    /// Direct memberships of an employee, in stored order
    #[inline]
    #[must_use]
    pub fn memberships(&self, uid: &str) -> &[MembershipEntry] {
        self.indexes
            .membership
            .membership_index
            .get(uid)
            .map_or(&[], Vec::as_slice)
    }

    /// Precomputed ancestry of an entity
    #[inline]
    #[must_use]
    pub fn ancestry(&self, kind: EntityKind, name: &str) -> Option<&AncestryRecord> {
        self.indexes
            .membership
            .relationship_index
            .get(kind.category())
            .and_then(|entries| entries.get(name))
            .map(|rel| &rel.ancestry)
    }

    /// Check if an entity of this kind appears in its lookup table or in the
    /// relationship index
    #[must_use]
    pub fn knows(&self, kind: EntityKind, name: &str) -> bool {
        self.entity(kind, name).is_some() || self.ancestry(kind, name).is_some()
    }

    /// Names of every known entity of one kind
    ///
    /// Lookup-table names come first in document order, followed by names
    /// that only appear in the relationship index.
    pub fn entity_names(&self, kind: EntityKind) -> impl Iterator<Item = &str> {
        let table = self.table(kind);
        let related_only = self
            .indexes
            .membership
            .relationship_index
            .get(kind.category())
            .into_iter()
            .flat_map(|entries| entries.keys())
            .filter(move |name| !table.contains_key(name.as_str()));
        table.keys().chain(related_only).map(String::as_str)
    }

    /// Jira ownership index
    #[inline]
    #[must_use]
    pub(crate) fn jira(&self) -> &IndexMap<String, IndexMap<String, Vec<JiraOwner>>> {
        &self.indexes.jira
    }
}
