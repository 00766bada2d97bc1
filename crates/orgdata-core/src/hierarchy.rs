//! Hierarchy derivation over precomputed ancestry
//!
//! [`Hierarchy`] is a borrowed view over a [`Snapshot`] that answers the
//! composite queries:
//! - direct team list of an employee
//! - org inclusion (direct or through a team's ancestry)
//! - the deduplicated closure of every group an employee belongs to
//! - the root-ward path of an entity
//! - the descendant tree under an entity
//!
//! No transitive closure is computed here. Ancestry comes flattened from
//! upstream and is trusted as is; the only walks are bounded by visited sets
//! so malformed (cyclic) ancestry terminates instead of looping.
//!
//! # Choosing a parent
//!
//! An entity's `parent` reference is followed when it names an unvisited
//! entity. Otherwise the parent comes from the candidate ancestors: the
//! entity's own ancestry record, or, for an entity without one, whatever
//! is left unvisited from the last record seen on the walk. A record lists
//! every ancestor, not just the parent, so each candidate is ranked by how
//! many of the other candidates it sits below (through its own record or
//! its chain of parent references). The highest rank wins. Ties go to the
//! narrower category (team, team group, pillar, org) and then to the first
//! name listed.

use crate::snapshot::Snapshot;
use crate::types::{
    AncestryRecord, EntityKind, HierarchyNode, HierarchyPathEntry, OrgInfo, OrgInfoType,
};
use std::collections::{HashMap, HashSet};

/// Candidate order when picking a parent, narrowest category first
const PARENT_PRIORITY: [EntityKind; 4] = [
    EntityKind::Team,
    EntityKind::TeamGroup,
    EntityKind::Pillar,
    EntityKind::Org,
];

/// Stateless hierarchy queries over one snapshot
#[derive(Debug, Clone, Copy)]
pub struct Hierarchy<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> Hierarchy<'a> {
    /// Create view over a snapshot
    #[inline]
    #[must_use]
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Teams the employee is directly a member of, in stored order
    #[must_use]
    pub fn teams_for_uid(&self, uid: &str) -> Vec<String> {
        self.snapshot
            .memberships(uid)
            .iter()
            .filter(|m| m.is(EntityKind::Team))
            .map(|m| m.name.clone())
            .collect()
    }

    /// Check if the employee is directly in the team
    #[must_use]
    pub fn is_employee_in_team(&self, uid: &str, team: &str) -> bool {
        self.snapshot
            .memberships(uid)
            .iter()
            .any(|m| m.is(EntityKind::Team) && m.name == team)
    }

    /// Check if the employee belongs to an org
    ///
    /// True for a direct org membership, or for a direct team whose ancestry
    /// lists the org.
    #[must_use]
    pub fn is_employee_in_org(&self, uid: &str, org: &str) -> bool {
        self.snapshot.memberships(uid).iter().any(|m| match m.kind() {
            Some(EntityKind::Org) => m.name == org,
            Some(EntityKind::Team) => self
                .snapshot
                .ancestry(EntityKind::Team, &m.name)
                .is_some_and(|a| a.contains(EntityKind::Org, org)),
            _ => false,
        })
    }

    /// Every group the employee belongs to, directly or through team ancestry
    ///
    /// Memberships are walked in stored order. A direct org yields
    /// `Organization`; a direct team yields `Team` followed by its ancestors:
    /// orgs, pillars, team groups, then parent teams. Each `(name, type)` pair
    /// is emitted once, at its first occurrence.
    #[must_use]
    pub fn user_organizations(&self, uid: &str) -> Vec<OrgInfo> {
        let mut closure = Closure::default();

        for membership in self.snapshot.memberships(uid) {
            match membership.kind() {
                Some(EntityKind::Org) => closure.push(&membership.name, OrgInfoType::Organization),
                Some(EntityKind::Team) => {
                    closure.push(&membership.name, OrgInfoType::Team);
                    if let Some(ancestry) = self.snapshot.ancestry(EntityKind::Team, &membership.name)
                    {
                        closure.extend(&ancestry.orgs, OrgInfoType::Organization);
                        closure.extend(&ancestry.pillars, OrgInfoType::Pillar);
                        closure.extend(&ancestry.team_groups, OrgInfoType::TeamGroup);
                        closure.extend(&ancestry.teams, OrgInfoType::ParentTeam);
                    }
                }
                _ => {}
            }
        }

        closure.items
    }

    /// Path from an entity up to its root org
    ///
    /// The first entry is the entity itself. Empty when the entity is unknown.
    /// Each hop visits a new name, so the walk ends within the number of
    /// names in the snapshot even on cyclic input.
    #[must_use]
    pub fn hierarchy_path(&self, name: &str, kind: EntityKind) -> Vec<HierarchyPathEntry> {
        if !self.snapshot.knows(kind, name) {
            return Vec::new();
        }

        let mut path = vec![HierarchyPathEntry::new(name, kind)];
        let mut visited: HashSet<&str> = HashSet::from([name]);
        let mut candidates = Vec::new();
        let mut current = (kind, name);

        while let Some(parent) = self.next_hop(current, &mut candidates, &visited) {
            visited.insert(parent.1);
            path.push(HierarchyPathEntry::new(parent.1, parent.0));
            current = parent;
        }

        path
    }

    /// Parent of `current` on a walk that has already visited `visited`
    ///
    /// `candidates` carries the unvisited ancestors between hops. It is
    /// replaced whenever the current entity has an ancestry record.
    fn next_hop<'s>(
        &self,
        (kind, name): (EntityKind, &str),
        candidates: &mut Vec<(EntityKind, &'s str)>,
        visited: &HashSet<&'s str>,
    ) -> Option<(EntityKind, &'s str)>
    where
        'a: 's,
    {
        if let Some(record) = self.snapshot.ancestry(kind, name) {
            *candidates = ancestors(record);
        }
        candidates.retain(|(_, n)| !visited.contains(*n));

        if let Some(parent) = self
            .parent_ref(kind, name)
            .filter(|(_, n)| !visited.contains(*n))
        {
            return Some(parent);
        }

        let mut best: Option<(usize, (EntityKind, &'s str))> = None;
        for &candidate in candidates.iter() {
            let rank = candidates
                .iter()
                .filter(|&&other| other != candidate && self.sits_below(candidate, other))
                .count();
            if best.map_or(true, |(best_rank, _)| rank > best_rank) {
                best = Some((rank, candidate));
            }
        }

        best.map(|(_, candidate)| candidate)
    }

    /// The entity's `parent` reference, when it carries a known type tag
    fn parent_ref(&self, kind: EntityKind, name: &str) -> Option<(EntityKind, &'a str)> {
        let parent = self.snapshot.entity(kind, name)?.parent.as_ref()?;
        if parent.name.is_empty() {
            return None;
        }
        let parent_kind = parent.entity_type.parse().ok()?;
        Some((parent_kind, parent.name.as_str()))
    }

    /// Check if `above` is an ancestor of `entity`
    ///
    /// Follows parent references up from `entity`, consulting each ancestry
    /// record met on the way.
    fn sits_below(&self, entity: (EntityKind, &str), above: (EntityKind, &str)) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(entity);

        while let Some((kind, name)) = current {
            if !seen.insert(name) {
                break;
            }
            if self
                .snapshot
                .ancestry(kind, name)
                .is_some_and(|record| record.contains(above.0, above.1))
            {
                return true;
            }
            current = self.parent_ref(kind, name);
            if current == Some(above) {
                return true;
            }
        }

        false
    }

    /// Kind of the entity with this name
    ///
    /// Checked in the order team, org, pillar, team group.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<EntityKind> {
        [
            EntityKind::Team,
            EntityKind::Org,
            EntityKind::Pillar,
            EntityKind::TeamGroup,
        ]
        .into_iter()
        .find(|&kind| self.snapshot.knows(kind, name))
    }

    /// Tree of every entity below `name`
    ///
    /// A node's children are the entities whose parent (the second entry of
    /// their hierarchy path) is that node. Children are ordered orgs, pillars,
    /// team groups, teams, each in document order. A name seen again on the
    /// same branch becomes a leaf.
    #[must_use]
    pub fn descendants_tree(&self, name: &str) -> Option<HierarchyNode> {
        let kind = self.kind_of(name)?;
        let children = self.children_map();
        let mut branch = HashSet::new();
        Some(build_node(name, kind, &children, &mut branch))
    }

    /// Parent name -> children, over every known entity
    fn children_map(&self) -> HashMap<&'a str, Vec<(EntityKind, &'a str)>> {
        let mut children: HashMap<&'a str, Vec<(EntityKind, &'a str)>> = HashMap::new();

        for kind in EntityKind::ALL {
            for name in self.snapshot.entity_names(kind) {
                let visited = HashSet::from([name]);
                if let Some((_, parent)) = self.next_hop((kind, name), &mut Vec::new(), &visited) {
                    children.entry(parent).or_default().push((kind, name));
                }
            }
        }

        children
    }
}

/// Every ancestor in a record, narrowest category first
fn ancestors(record: &AncestryRecord) -> Vec<(EntityKind, &str)> {
    PARENT_PRIORITY
        .into_iter()
        .flat_map(|kind| record.of_kind(kind).iter().map(move |n| (kind, n.as_str())))
        .collect()
}

fn build_node<'a>(
    name: &'a str,
    kind: EntityKind,
    children: &HashMap<&'a str, Vec<(EntityKind, &'a str)>>,
    branch: &mut HashSet<&'a str>,
) -> HierarchyNode {
    if !branch.insert(name) {
        return HierarchyNode::leaf(name, kind);
    }

    let child_nodes = children
        .get(name)
        .map(|list| {
            list.iter()
                .map(|&(child_kind, child)| build_node(child, child_kind, children, branch))
                .collect()
        })
        .unwrap_or_default();

    branch.remove(name);

    HierarchyNode {
        name: name.to_string(),
        entity_type: kind,
        children: child_nodes,
    }
}

/// Insertion-ordered, deduplicated [`OrgInfo`] list
#[derive(Default)]
struct Closure {
    items: Vec<OrgInfo>,
    seen: HashSet<(String, OrgInfoType)>,
}

impl Closure {
    fn push(&mut self, name: &str, org_type: OrgInfoType) {
        if self.seen.insert((name.to_string(), org_type)) {
            self.items.push(OrgInfo::new(name, org_type));
        }
    }

    fn extend(&mut self, names: &[String], org_type: OrgInfoType) {
        for name in names {
            self.push(name, org_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse;
    use pretty_assertions::assert_eq;

    /// test-org ← platform-org ← engineering ← backend-teams ← platform-team
    /// test-org ← test-team
    const DOC: &str = r#"{
        "lookups": {
            "employees": {
                "jsmith": {"uid": "jsmith", "slack_uid": "U12345678"},
                "bwilson": {"uid": "bwilson"},
                "adoe": {"uid": "adoe"}
            },
            "teams": {"test-team": {"name": "test-team"}, "platform-team": {"name": "platform-team"}},
            "orgs": {"test-org": {"name": "test-org"}, "platform-org": {"name": "platform-org"}},
            "pillars": {"engineering": {"name": "engineering"}},
            "team_groups": {"backend-teams": {"name": "backend-teams"}}
        },
        "indexes": {
            "membership": {
                "membership_index": {
                    "jsmith": [{"name": "test-team", "type": "team"}],
                    "bwilson": [{"name": "platform-team", "type": "team"}],
                    "adoe": [{"name": "platform-org", "type": "org"}]
                },
                "relationship_index": {
                    "teams": {
                        "test-team": {"ancestry": {"orgs": ["test-org"]}},
                        "platform-team": {"ancestry": {
                            "orgs": ["platform-org", "test-org"],
                            "pillars": ["engineering"],
                            "team_groups": ["backend-teams"]
                        }}
                    },
                    "team_groups": {
                        "backend-teams": {"ancestry": {"orgs": ["platform-org", "test-org"], "pillars": ["engineering"]}}
                    },
                    "pillars": {
                        "engineering": {"ancestry": {"orgs": ["platform-org", "test-org"]}}
                    },
                    "orgs": {
                        "platform-org": {"ancestry": {"orgs": ["test-org"]}},
                        "test-org": {"ancestry": {}}
                    }
                }
            }
        }
    }"#;

    fn names(path: &[HierarchyPathEntry]) -> Vec<&str> {
        path.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn teams_for_uid_filters_team_memberships() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let h = Hierarchy::new(&snap);
        assert_eq!(h.teams_for_uid("jsmith"), vec!["test-team".to_string()]);
        assert!(h.teams_for_uid("adoe").is_empty());
        assert!(h.teams_for_uid("nobody").is_empty());
    }

    #[test]
    fn org_inclusion_direct_and_through_team() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let h = Hierarchy::new(&snap);
        assert!(h.is_employee_in_org("jsmith", "test-org"));
        assert!(h.is_employee_in_org("bwilson", "platform-org"));
        assert!(h.is_employee_in_org("adoe", "platform-org"));
        // direct org membership does not expand the org's own ancestry
        assert!(!h.is_employee_in_org("adoe", "test-org"));
        assert!(!h.is_employee_in_org("jsmith", "platform-org"));
    }

    #[test]
    fn hierarchy_path_follows_chain() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let path = Hierarchy::new(&snap).hierarchy_path("platform-team", EntityKind::Team);
        assert_eq!(
            path,
            vec![
                HierarchyPathEntry::new("platform-team", EntityKind::Team),
                HierarchyPathEntry::new("backend-teams", EntityKind::TeamGroup),
                HierarchyPathEntry::new("engineering", EntityKind::Pillar),
                HierarchyPathEntry::new("platform-org", EntityKind::Org),
                HierarchyPathEntry::new("test-org", EntityKind::Org),
            ]
        );
    }

    #[test]
    fn hierarchy_path_of_root_is_self() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let path = Hierarchy::new(&snap).hierarchy_path("test-org", EntityKind::Org);
        assert_eq!(names(&path), vec!["test-org"]);
    }

    #[test]
    fn hierarchy_path_unknown_or_wrong_kind_is_empty() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let h = Hierarchy::new(&snap);
        assert!(h.hierarchy_path("missing", EntityKind::Team).is_empty());
        assert!(h.hierarchy_path("test-team", EntityKind::Org).is_empty());
    }

    #[test]
    fn user_organizations_orders_by_category() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let orgs = Hierarchy::new(&snap).user_organizations("bwilson");
        assert_eq!(
            orgs,
            vec![
                OrgInfo::new("platform-team", OrgInfoType::Team),
                OrgInfo::new("platform-org", OrgInfoType::Organization),
                OrgInfo::new("test-org", OrgInfoType::Organization),
                OrgInfo::new("engineering", OrgInfoType::Pillar),
                OrgInfo::new("backend-teams", OrgInfoType::TeamGroup),
            ]
        );
    }

    #[test]
    fn user_organizations_dedups_by_name_and_type() {
        let json = r#"{
            "lookups": {"employees": {"e": {"uid": "e"}}},
            "indexes": {"membership": {
                "membership_index": {"e": [
                    {"name": "o", "type": "org"},
                    {"name": "t1", "type": "team"},
                    {"name": "t2", "type": "team"},
                    {"name": "t1", "type": "team"}
                ]},
                "relationship_index": {"teams": {
                    "t1": {"ancestry": {"orgs": ["o"], "teams": ["t2"]}},
                    "t2": {"ancestry": {"orgs": ["o"]}}
                }}
            }}
        }"#;
        let snap = parse(json.as_bytes()).unwrap();
        let orgs = Hierarchy::new(&snap).user_organizations("e");
        assert_eq!(
            orgs,
            vec![
                OrgInfo::new("o", OrgInfoType::Organization),
                OrgInfo::new("t1", OrgInfoType::Team),
                OrgInfo::new("t2", OrgInfoType::ParentTeam),
                OrgInfo::new("t2", OrgInfoType::Team),
            ]
        );
    }

    #[test]
    fn descendants_tree_full_hierarchy() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let tree = Hierarchy::new(&snap).descendants_tree("test-org").unwrap();
        assert_eq!(tree.entity_type, EntityKind::Org);
        let child_names: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(child_names, vec!["platform-org", "test-team"]);

        let team = tree
            .child("platform-org")
            .and_then(|n| n.child("engineering"))
            .and_then(|n| n.child("backend-teams"))
            .and_then(|n| n.child("platform-team"))
            .unwrap();
        assert!(team.children.is_empty());
        assert_eq!(tree.size(), 6);
    }

    #[test]
    fn descendants_tree_unknown_root() {
        let snap = parse(DOC.as_bytes()).unwrap();
        assert!(Hierarchy::new(&snap).descendants_tree("nonexistent").is_none());
    }

    #[test]
    fn descendants_tree_leaf_team() {
        let snap = parse(DOC.as_bytes()).unwrap();
        let tree = Hierarchy::new(&snap).descendants_tree("test-team").unwrap();
        assert_eq!(tree, HierarchyNode::leaf("test-team", EntityKind::Team));
    }

    const CYCLIC: &str = r#"{
        "lookups": {
            "employees": {"e": {"uid": "e"}},
            "orgs": {"a": {}, "b": {}}
        },
        "indexes": {"membership": {
            "membership_index": {"e": [{"name": "a", "type": "org"}]},
            "relationship_index": {"orgs": {
                "a": {"ancestry": {"orgs": ["b"]}},
                "b": {"ancestry": {"orgs": ["a"]}}
            }}
        }}
    }"#;

    #[test]
    fn hierarchy_path_terminates_on_cycle() {
        let snap = parse(CYCLIC.as_bytes()).unwrap();
        let path = Hierarchy::new(&snap).hierarchy_path("a", EntityKind::Org);
        assert_eq!(names(&path), vec!["a", "b"]);
    }

    #[test]
    fn descendants_tree_truncates_cycle() {
        let snap = parse(CYCLIC.as_bytes()).unwrap();
        let tree = Hierarchy::new(&snap).descendants_tree("a").unwrap();
        // a -> b -> a(truncated)
        assert_eq!(tree.children.len(), 1);
        let b = &tree.children[0];
        assert_eq!(b.name, "b");
        assert_eq!(b.children, vec![HierarchyNode::leaf("a", EntityKind::Org)]);
    }

    #[test]
    fn parent_tie_goes_to_first_listed() {
        let json = r#"{
            "lookups": {"employees": {"e": {"uid": "e"}}},
            "indexes": {"membership": {
                "membership_index": {"e": []},
                "relationship_index": {
                    "teams": {"t": {"ancestry": {"orgs": ["left", "right"]}}},
                    "orgs": {"left": {"ancestry": {}}, "right": {"ancestry": {}}}
                }
            }}
        }"#;
        let snap = parse(json.as_bytes()).unwrap();
        let path = Hierarchy::new(&snap).hierarchy_path("t", EntityKind::Team);
        // "left" has an empty record of its own, so the walk stops there
        assert_eq!(names(&path), vec!["t", "left"]);
    }

    /// Only the team has a relationship record; groups link up through
    /// `parent` references.
    const TEAM_RECORDS_ONLY: &str = r#"{
        "lookups": {
            "employees": {"e": {"uid": "e"}},
            "teams": {"platform-team": {"name": "platform-team"}},
            "team_groups": {"backend-teams": {"name": "backend-teams",
                "parent": {"name": "engineering", "type": "pillar"}}},
            "pillars": {"engineering": {"name": "engineering",
                "parent": {"name": "platform-org", "type": "org"}}},
            "orgs": {
                "test-org": {"name": "test-org"},
                "platform-org": {"name": "platform-org",
                    "parent": {"name": "test-org", "type": "org"}}
            }
        },
        "indexes": {"membership": {
            "membership_index": {"e": []},
            "relationship_index": {"teams": {
            "platform-team": {"ancestry": {
                "orgs": ["test-org", "platform-org"],
                "pillars": ["engineering"],
                "team_groups": ["backend-teams"]
            }}
        }}}}
    }"#;

    #[test]
    fn hierarchy_path_with_team_records_only() {
        let snap = parse(TEAM_RECORDS_ONLY.as_bytes()).unwrap();
        let h = Hierarchy::new(&snap);
        assert_eq!(
            names(&h.hierarchy_path("platform-team", EntityKind::Team)),
            vec!["platform-team", "backend-teams", "engineering", "platform-org", "test-org"]
        );
        assert_eq!(
            names(&h.hierarchy_path("engineering", EntityKind::Pillar)),
            vec!["engineering", "platform-org", "test-org"]
        );
    }

    #[test]
    fn descendants_tree_with_team_records_only() {
        let snap = parse(TEAM_RECORDS_ONLY.as_bytes()).unwrap();
        let tree = Hierarchy::new(&snap).descendants_tree("test-org").unwrap();
        let team = tree
            .child("platform-org")
            .and_then(|n| n.child("engineering"))
            .and_then(|n| n.child("backend-teams"))
            .and_then(|n| n.child("platform-team"));
        assert!(team.is_some());
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn record_less_hops_keep_the_start_ancestors() {
        // no parent references and no group records: the team's own record
        // is all there is to go on
        let json = r#"{
            "lookups": {
                "employees": {"e": {"uid": "e"}},
                "teams": {"t": {}},
                "team_groups": {"g": {}},
                "pillars": {"p": {}},
                "orgs": {"child": {}, "root": {}}
            },
            "indexes": {"membership": {
                "membership_index": {"e": []},
                "relationship_index": {"teams": {
                "t": {"ancestry": {"orgs": ["child", "root"], "pillars": ["p"], "team_groups": ["g"]}}
            }}}}
        }"#;
        let snap = parse(json.as_bytes()).unwrap();
        let path = Hierarchy::new(&snap).hierarchy_path("t", EntityKind::Team);
        assert_eq!(names(&path), vec!["t", "g", "p", "child", "root"]);
    }

    #[test]
    fn candidates_ranked_by_ancestors_among_them() {
        // the outer org is listed first but the inner org sits below it
        let json = r#"{
            "lookups": {"employees": {"e": {"uid": "e"}}, "orgs": {
                "outer": {},
                "inner": {"parent": {"name": "outer", "type": "org"}}
            }},
            "indexes": {"membership": {
                "membership_index": {"e": []},
                "relationship_index": {"teams": {
                "t": {"ancestry": {"orgs": ["outer", "inner"]}}
            }}}}
        }"#;
        let snap = parse(json.as_bytes()).unwrap();
        let path = Hierarchy::new(&snap).hierarchy_path("t", EntityKind::Team);
        assert_eq!(names(&path), vec!["t", "inner", "outer"]);
    }

    #[test]
    fn parent_reference_wins_over_record() {
        let json = r#"{
            "lookups": {
                "employees": {"e": {"uid": "e"}},
                "teams": {"t": {"parent": {"name": "b", "type": "org"}}},
                "orgs": {"a": {}, "b": {}}
            },
            "indexes": {"membership": {
                "membership_index": {"e": []},
                "relationship_index": {"teams": {
                "t": {"ancestry": {"orgs": ["a", "b"]}}
            }}}}
        }"#;
        let snap = parse(json.as_bytes()).unwrap();
        let path = Hierarchy::new(&snap).hierarchy_path("t", EntityKind::Team);
        assert_eq!(names(&path), vec!["t", "b", "a"]);
    }
}
