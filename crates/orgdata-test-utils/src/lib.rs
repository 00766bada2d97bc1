//! Testing utilities for orgdata workspace
//!
//! Shared fixtures, a document builder and a scripted data source.

#![allow(missing_docs)]

use async_trait::async_trait;
use orgdata_core::{DataSource, EntityKind, LoadError, OnChange, Service};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Builder for directory documents
///
/// Entities added with [`DocumentBuilder::entity`] get an ancestry record
/// in the relationship index; memberships go straight to the membership
/// index.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    metadata: Map<String, Value>,
    employees: Map<String, Value>,
    tables: [Map<String, Value>; 4],
    relationships: [Map<String, Value>; 4],
    memberships: Map<String, Value>,
    slack: Map<String, Value>,
    github: Map<String, Value>,
    jira: Map<String, Value>,
}

fn slot(kind: EntityKind) -> usize {
    match kind {
        EntityKind::Org => 0,
        EntityKind::Pillar => 1,
        EntityKind::TeamGroup => 2,
        EntityKind::Team => 3,
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_version(mut self, version: &str) -> Self {
        self.metadata
            .insert("data_version".into(), Value::String(version.into()));
        self
    }

    /// Add an employee with email `<uid>@example.com`
    pub fn employee(self, uid: &str) -> Self {
        self.employee_with(uid, json!({}))
    }

    /// Add an employee, overriding fields from `extra`
    pub fn employee_with(mut self, uid: &str, extra: Value) -> Self {
        let mut record = json!({
            "uid": uid,
            "full_name": uid,
            "email": format!("{uid}@example.com"),
        });
        if let (Some(record), Value::Object(extra)) = (record.as_object_mut(), extra) {
            record.extend(extra);
        }
        if let Some(slack) = record.get("slack_uid").and_then(Value::as_str) {
            self.slack.insert(slack.into(), Value::String(uid.into()));
        }
        if let Some(github) = record.get("github_id").and_then(Value::as_str) {
            self.github.insert(github.into(), Value::String(uid.into()));
        }
        self.employees.insert(uid.into(), record);
        self
    }

    /// Add an entity with its ancestors, listed as `(kind, name)` pairs
    pub fn entity(self, kind: EntityKind, name: &str, ancestors: &[(EntityKind, &str)]) -> Self {
        self.lookup(kind, name).ancestry(kind, name, ancestors)
    }

    /// Add an entity to its lookup table without a relationship record
    pub fn lookup(mut self, kind: EntityKind, name: &str) -> Self {
        self.tables[slot(kind)].insert(
            name.into(),
            json!({"uid": name, "name": name, "type": kind.as_str()}),
        );
        self
    }

    /// Set the `parent` reference on an entity already in its lookup table
    pub fn parent(mut self, kind: EntityKind, name: &str, parent_kind: EntityKind, parent: &str) -> Self {
        if let Some(entity) = self.tables[slot(kind)].get_mut(name).and_then(Value::as_object_mut) {
            entity.insert(
                "parent".into(),
                json!({"name": parent, "type": parent_kind.as_str()}),
            );
        }
        self
    }

    /// Add only a relationship index record
    pub fn ancestry(mut self, kind: EntityKind, name: &str, ancestors: &[(EntityKind, &str)]) -> Self {
        let mut record = Map::new();
        for category in EntityKind::ALL {
            let names: Vec<Value> = ancestors
                .iter()
                .filter(|(k, _)| *k == category)
                .map(|(_, n)| Value::String((*n).into()))
                .collect();
            record.insert(category.category().into(), Value::Array(names));
        }
        self.relationships[slot(kind)].insert(name.into(), json!({"ancestry": record}));
        self
    }

    /// Add a direct membership
    pub fn member(mut self, uid: &str, kind: EntityKind, name: &str) -> Self {
        let entry = json!({"name": name, "type": kind.as_str()});
        match self.memberships.get_mut(uid).and_then(Value::as_array_mut) {
            Some(list) => list.push(entry),
            None => {
                self.memberships.insert(uid.into(), Value::Array(vec![entry]));
            }
        }
        if kind == EntityKind::Team {
            if let Some(people) = self.tables[slot(kind)]
                .get_mut(name)
                .and_then(Value::as_object_mut)
            {
                let group = people
                    .entry("group")
                    .or_insert_with(|| json!({"resolved_people_uid_list": []}));
                if let Some(list) = group
                    .get_mut("resolved_people_uid_list")
                    .and_then(Value::as_array_mut)
                {
                    list.push(Value::String(uid.into()));
                }
            }
        }
        self
    }

    /// Add a Jira component owner
    pub fn jira_owner(mut self, project: &str, component: &str, owner: &str) -> Self {
        let components = self
            .jira
            .entry(project)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(components) = components.as_object_mut() {
            let owners = components
                .entry(component)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Some(owners) = owners.as_array_mut() {
                owners.push(json!({"name": owner, "type": "team"}));
            }
        }
        self
    }

    pub fn build(self) -> Value {
        let [orgs, pillars, team_groups, teams] = self.tables;
        let [rel_orgs, rel_pillars, rel_team_groups, rel_teams] = self.relationships;
        let mut metadata = self.metadata;
        metadata.insert("total_employees".into(), json!(self.employees.len()));
        metadata.insert("total_orgs".into(), json!(orgs.len()));
        metadata.insert("total_teams".into(), json!(teams.len()));
        json!({
            "metadata": metadata,
            "lookups": {
                "employees": self.employees,
                "teams": teams,
                "orgs": orgs,
                "pillars": pillars,
                "team_groups": team_groups,
            },
            "indexes": {
                "membership": {
                    "membership_index": self.memberships,
                    "relationship_index": {
                        "orgs": rel_orgs,
                        "pillars": rel_pillars,
                        "team_groups": rel_team_groups,
                        "teams": rel_teams,
                    },
                },
                "slack_id_mappings": {"slack_uid_to_uid": self.slack},
                "github_id_mappings": {"github_id_to_uid": self.github},
                "jira": self.jira,
            }
        })
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.build().to_string().into_bytes()
    }
}

/// Canonical test hierarchy
///
/// ```text
/// test-org
/// ├── test-team            (jsmith)
/// └── platform-org
///     └── engineering      (pillar)
///         └── backend-teams (team group)
///             └── platform-team (bwilson)
/// ```
pub fn fixture_builder() -> DocumentBuilder {
    use EntityKind::{Org, Pillar, Team, TeamGroup};

    DocumentBuilder::new()
        .data_version("test-v1.0")
        .employee_with(
            "jsmith",
            json!({
                "full_name": "John Smith",
                "email": "jsmith@example.com",
                "job_title": "Software Engineer",
                "slack_uid": "U12345678",
                "github_id": "jsmith-gh",
                "manager_uid": "bwilson",
            }),
        )
        .employee_with(
            "bwilson",
            json!({
                "full_name": "Bob Wilson",
                "job_title": "Engineering Manager",
                "slack_uid": "U87654321",
                "github_id": "bwilson-gh",
                "is_people_manager": true,
            }),
        )
        .entity(Org, "test-org", &[])
        .entity(Org, "platform-org", &[(Org, "test-org")])
        .entity(Pillar, "engineering", &[(Org, "platform-org"), (Org, "test-org")])
        .entity(
            TeamGroup,
            "backend-teams",
            &[(Pillar, "engineering"), (Org, "platform-org"), (Org, "test-org")],
        )
        .entity(Team, "test-team", &[(Org, "test-org")])
        .entity(
            Team,
            "platform-team",
            &[
                (TeamGroup, "backend-teams"),
                (Pillar, "engineering"),
                (Org, "platform-org"),
                (Org, "test-org"),
            ],
        )
        .member("jsmith", Team, "test-team")
        .member("bwilson", Team, "platform-team")
        .jira_owner("PLAT", "_project_level", "platform-team")
        .jira_owner("PLAT", "api", "platform-team")
        .jira_owner("PLAT", "api", "test-team")
}

/// Canonical test document as JSON bytes
pub fn fixture_bytes() -> Vec<u8> {
    fixture_builder().to_bytes()
}

/// Document that decodes but has no employees
pub fn empty_employees_bytes() -> Vec<u8> {
    DocumentBuilder::new()
        .member("ghost", EntityKind::Team, "t")
        .to_bytes()
}

/// Service loaded with the canonical fixture
pub fn loaded_service() -> Service {
    let service = Service::new();
    service
        .load_bytes("fixture", &fixture_bytes())
        .expect("fixture must load");
    service
}

/// In-memory data source with scripted payloads and manual change triggers
#[derive(Debug)]
pub struct ScriptedSource {
    name: String,
    payload: Mutex<Result<Vec<u8>, String>>,
    loads: AtomicUsize,
    change: Notify,
    watching: Notify,
    watch_error: Mutex<Option<String>>,
}

impl ScriptedSource {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            payload: Mutex::new(Ok(bytes)),
            loads: AtomicUsize::new(0),
            change: Notify::new(),
            watching: Notify::new(),
            watch_error: Mutex::new(None),
        }
    }

    /// Source serving the canonical fixture
    pub fn fixture() -> Self {
        Self::new("mem://fixture", fixture_bytes())
    }

    /// Replace the bytes returned by subsequent loads
    pub fn set_payload(&self, bytes: Vec<u8>) {
        *self.payload.lock() = Ok(bytes);
    }

    /// Make subsequent loads fail
    pub fn fail_loads(&self, message: &str) {
        *self.payload.lock() = Err(message.to_string());
    }

    /// Make the next watch call fail immediately
    pub fn fail_watch(&self, message: &str) {
        *self.watch_error.lock() = Some(message.to_string());
    }

    /// Signal a change to the running watch
    pub fn trigger(&self) {
        self.change.notify_one();
    }

    /// Wait until a watch call has started
    pub async fn watch_started(&self) {
        self.watching.notified().await;
    }

    /// Number of load calls so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl fmt::Display for ScriptedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn load(&self) -> Result<Vec<u8>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.payload
            .lock()
            .clone()
            .map_err(|message| LoadError::backend(&self.name, message))
    }

    async fn watch(
        &self,
        cancel: CancellationToken,
        on_change: &dyn OnChange,
    ) -> Result<(), LoadError> {
        if let Some(message) = self.watch_error.lock().take() {
            return Err(LoadError::watch(&self.name, message));
        }
        self.watching.notify_one();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                () = self.change.notified() => {
                    // reload failures are already logged by the service
                    let _ = on_change.changed().await;
                }
            }
        }
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
