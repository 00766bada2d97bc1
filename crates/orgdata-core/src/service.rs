//! Organizational data service
//!
//! [`Service`] owns the current [`Snapshot`] and answers every query against
//! it. The lifecycle is:
//!
//! ```text
//! load(source) → fetch → parse + validate (no lock) → swap (write lock)
//! query        → clone Arc<Snapshot> (read lock) → compute (no lock)
//! ```
//!
//! Readers never see a partially installed snapshot: the snapshot and its
//! [`DataVersion`] sit behind one lock and change together. A failed load
//! leaves both untouched.
//!
//! # Watching
//!
//! [`Service::start_watcher`] performs an initial load and then hands a
//! reload callback to [`DataSource::watch`]. Only one watcher may run at a
//! time; [`Service::stop_watcher`] releases the slot immediately and cancels
//! the running watch.

use crate::error::{OrgDataError, OrgDataResult};
use crate::hierarchy::Hierarchy;
use crate::loader::{load_snapshot, ParseError};
use crate::snapshot::Snapshot;
use crate::source::{DataSource, OnChange};
use crate::types::{
    Component, DataVersion, Employee, Entity, EntityKind, HierarchyNode, HierarchyPathEntry,
    JiraOwner, JiraOwnership, Metadata, OrgInfo,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Served data; both fields are replaced together
#[derive(Debug, Default)]
struct ServiceState {
    snapshot: Option<Arc<Snapshot>>,
    version: DataVersion,
}

/// Ownership of the single watcher slot
#[derive(Debug, Default)]
struct WatcherSlot {
    /// Incremented on every successful claim
    generation: u64,
    /// Generation and cancel token of the running watcher
    active: Option<(u64, CancellationToken)>,
}

/// Read-only organizational directory with atomic reload
#[derive(Debug, Default)]
pub struct Service {
    state: RwLock<ServiceState>,
    watcher: Mutex<WatcherSlot>,
}

impl Service {
    /// Create an empty service
    ///
    /// Every query returns an empty result until the first successful load.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service and load it from a source
    ///
    /// # Errors
    /// See [`Service::load`].
    pub async fn with_source(source: &dyn DataSource) -> OrgDataResult<Self> {
        let service = Self::new();
        service.load(source).await?;
        Ok(service)
    }

    /// Fetch, validate and install a document from a source
    ///
    /// # Errors
    /// - [`OrgDataError::Load`] if the source fails or the bytes do not decode
    /// - [`OrgDataError::Validation`] if required collections are empty
    ///
    /// On error the served snapshot and version are unchanged.
    pub async fn load(&self, source: &dyn DataSource) -> OrgDataResult<DataVersion> {
        tracing::debug!(source = %source, "loading data from source");

        let bytes = source.load().await.map_err(|e| {
            tracing::error!(source = %source, error = %e, "failed to load from data source");
            OrgDataError::from(e)
        })?;

        self.load_bytes(&source.describe(), &bytes)
    }

    /// Validate and install a document already in memory
    ///
    /// `source_name` labels logs and errors.
    ///
    /// # Errors
    /// Same as [`Service::load`], minus fetch failures.
    pub fn load_bytes(&self, source_name: &str, bytes: &[u8]) -> OrgDataResult<DataVersion> {
        let snapshot = load_snapshot(source_name, bytes).map_err(|e| {
            tracing::error!(source = source_name, error = %e, "failed to parse data");
            match e {
                ParseError::Decode(err) => OrgDataError::Load(err),
                ParseError::Invalid(err) => OrgDataError::validation(source_name, err),
            }
        })?;

        let version = self.install(snapshot);
        tracing::info!(
            source = source_name,
            employees = version.employee_count,
            orgs = version.org_count,
            "data loaded successfully"
        );
        Ok(version)
    }

    fn install(&self, snapshot: Snapshot) -> DataVersion {
        let org_count = snapshot.org_count();
        let employee_count = snapshot.employee_count();
        let snapshot = Arc::new(snapshot);

        let mut state = self.state.write();
        let now = Utc::now();
        let previous = state.version.load_time;
        let load_time = if now > previous {
            now
        } else {
            previous + Duration::nanoseconds(1)
        };
        let version = DataVersion {
            load_time,
            org_count,
            employee_count,
        };
        state.snapshot = Some(snapshot);
        state.version = version.clone();
        version
    }

    /// Run a watcher on a source until it stops
    ///
    /// Loads once, then reloads on every change the source reports. Returns
    /// when `cancel` fires, when [`Service::stop_watcher`] is called, or when
    /// the source's watch fails. Reload failures are logged and do not stop
    /// the watch.
    ///
    /// # Errors
    /// - [`OrgDataError::AlreadyRunning`] if another watcher holds the slot
    /// - any error from the initial [`Service::load`]
    /// - [`OrgDataError::Load`] if the source's watch fails
    pub async fn start_watcher(
        &self,
        source: &dyn DataSource,
        cancel: CancellationToken,
    ) -> OrgDataResult<()> {
        let (generation, token) = self.claim_watcher(&cancel)?;
        let _slot = WatcherGuard {
            service: self,
            generation,
        };

        if let Err(e) = self.load(source).await {
            tracing::error!(source = %source, error = %e, "initial load failed, watcher not started");
            return Err(e);
        }

        tracing::info!(source = %source, "starting data source watcher");
        let reloader = Reloader {
            service: self,
            source,
            cancel: token.clone(),
        };
        let result = source.watch(token, &reloader).await;

        match &result {
            Ok(()) => tracing::info!(source = %source, "data source watcher stopped"),
            Err(e) => tracing::error!(source = %source, error = %e, "data source watcher failed"),
        }
        result.map_err(OrgDataError::from)
    }

    fn claim_watcher(&self, cancel: &CancellationToken) -> OrgDataResult<(u64, CancellationToken)> {
        let mut slot = self.watcher.lock();
        if slot.active.is_some() {
            return Err(OrgDataError::AlreadyRunning);
        }
        slot.generation += 1;
        let token = cancel.child_token();
        slot.active = Some((slot.generation, token.clone()));
        Ok((slot.generation, token))
    }

    fn release_watcher(&self, generation: u64) {
        let mut slot = self.watcher.lock();
        if matches!(slot.active, Some((active, _)) if active == generation) {
            slot.active = None;
        }
    }

    /// Stop the running watcher, if any
    ///
    /// The slot is released immediately so a new watcher may start before the
    /// old watch has finished unwinding.
    pub fn stop_watcher(&self) {
        let stopped = self.watcher.lock().active.take();
        if let Some((_, token)) = stopped {
            tracing::info!("stopping data source watcher");
            token.cancel();
        }
    }

    /// Check if a watcher currently holds the slot
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher.lock().active.is_some()
    }

    /// Version of the served data
    #[must_use]
    pub fn version(&self) -> DataVersion {
        self.state.read().version.clone()
    }

    /// Currently served snapshot
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.read().snapshot.clone()
    }

    /// Run a query against the current snapshot, or return the default
    fn read<T: Default>(&self, query: impl FnOnce(&Snapshot) -> T) -> T {
        self.snapshot().map(|s| query(&s)).unwrap_or_default()
    }

    /// Check if data has been loaded
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state.read().snapshot.is_some()
    }

    /// Check if the service has employee data to serve
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.read(|s| s.employee_count() > 0)
    }

    /// Upstream document metadata
    #[must_use]
    pub fn metadata(&self) -> Option<Metadata> {
        self.read(|s| Some(s.metadata().clone()))
    }

    // ---- Employees ----

    /// Employee by uid
    #[must_use]
    pub fn employee_by_uid(&self, uid: &str) -> Option<Employee> {
        self.read(|s| s.employee(uid).cloned())
    }

    /// Employee by email, ignoring case
    #[must_use]
    pub fn employee_by_email(&self, email: &str) -> Option<Employee> {
        self.read(|s| {
            s.employees()
                .find(|e| e.email.eq_ignore_ascii_case(email))
                .cloned()
        })
    }

    /// Employee by Slack user id
    #[must_use]
    pub fn employee_by_slack_id(&self, slack_id: &str) -> Option<Employee> {
        self.read(|s| s.uid_for_slack_id(slack_id).and_then(|uid| s.employee(uid)).cloned())
    }

    /// Employee by GitHub id
    #[must_use]
    pub fn employee_by_github_id(&self, github_id: &str) -> Option<Employee> {
        self.read(|s| {
            s.uid_for_github_id(github_id)
                .and_then(|uid| s.employee(uid))
                .cloned()
        })
    }

    /// Manager of an employee
    #[must_use]
    pub fn manager_for_employee(&self, uid: &str) -> Option<Employee> {
        self.read(|s| {
            s.employee(uid)
                .and_then(Employee::manager_uid)
                .and_then(|manager| s.employee(manager))
                .cloned()
        })
    }

    /// Employee by uid, failing if absent
    ///
    /// # Errors
    /// Returns [`OrgDataError::NotFound`] if no employee has this uid.
    pub fn require_employee(&self, uid: &str) -> OrgDataResult<Employee> {
        self.employee_by_uid(uid)
            .ok_or_else(|| OrgDataError::not_found("employee", uid))
    }

    // ---- Groups ----

    /// Group entity by kind and name
    #[must_use]
    pub fn entity(&self, kind: EntityKind, name: &str) -> Option<Entity> {
        self.read(|s| s.entity(kind, name).cloned())
    }

    /// Team by name
    #[inline]
    #[must_use]
    pub fn team_by_name(&self, name: &str) -> Option<Entity> {
        self.entity(EntityKind::Team, name)
    }

    /// Organization by name
    #[inline]
    #[must_use]
    pub fn org_by_name(&self, name: &str) -> Option<Entity> {
        self.entity(EntityKind::Org, name)
    }

    /// Pillar by name
    #[inline]
    #[must_use]
    pub fn pillar_by_name(&self, name: &str) -> Option<Entity> {
        self.entity(EntityKind::Pillar, name)
    }

    /// Team group by name
    #[inline]
    #[must_use]
    pub fn team_group_by_name(&self, name: &str) -> Option<Entity> {
        self.entity(EntityKind::TeamGroup, name)
    }

    /// Team by name, failing if absent
    ///
    /// # Errors
    /// Returns [`OrgDataError::NotFound`] if no team has this name.
    pub fn require_team(&self, name: &str) -> OrgDataResult<Entity> {
        self.team_by_name(name)
            .ok_or_else(|| OrgDataError::not_found("team", name))
    }

    /// Resolved members of a team
    ///
    /// Uids without an employee record are skipped.
    #[must_use]
    pub fn team_members(&self, team: &str) -> Vec<Employee> {
        self.read(|s| {
            s.entity(EntityKind::Team, team)
                .map(|t| {
                    t.group
                        .resolved_people_uid_list
                        .iter()
                        .filter_map(|uid| s.employee(uid).cloned())
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Component by name
    #[must_use]
    pub fn component_by_name(&self, name: &str) -> Option<Component> {
        self.read(|s| s.component(name).cloned())
    }

    /// All components in document order
    #[must_use]
    pub fn all_components(&self) -> Vec<Component> {
        self.read(|s| s.components().cloned().collect())
    }

    // ---- Enumeration ----

    /// All employee uids in document order
    #[must_use]
    pub fn all_employee_uids(&self) -> Vec<String> {
        self.read(|s| s.employee_uids().map(str::to_string).collect())
    }

    /// All employees in document order
    #[must_use]
    pub fn all_employees(&self) -> Vec<Employee> {
        self.read(|s| s.employees().cloned().collect())
    }

    /// Names of all entities of one kind, in document order
    #[must_use]
    pub fn all_names(&self, kind: EntityKind) -> Vec<String> {
        self.read(|s| s.entities(kind).map(|(name, _)| name.to_string()).collect())
    }

    /// All entities of one kind, in document order
    #[must_use]
    pub fn all_entities(&self, kind: EntityKind) -> Vec<Entity> {
        self.read(|s| s.entities(kind).map(|(_, e)| e.clone()).collect())
    }

    /// All team names
    #[inline]
    #[must_use]
    pub fn all_team_names(&self) -> Vec<String> {
        self.all_names(EntityKind::Team)
    }

    /// All organization names
    #[inline]
    #[must_use]
    pub fn all_org_names(&self) -> Vec<String> {
        self.all_names(EntityKind::Org)
    }

    /// All pillar names
    #[inline]
    #[must_use]
    pub fn all_pillar_names(&self) -> Vec<String> {
        self.all_names(EntityKind::Pillar)
    }

    /// All team group names
    #[inline]
    #[must_use]
    pub fn all_team_group_names(&self) -> Vec<String> {
        self.all_names(EntityKind::TeamGroup)
    }

    /// All teams
    #[inline]
    #[must_use]
    pub fn all_teams(&self) -> Vec<Entity> {
        self.all_entities(EntityKind::Team)
    }

    /// All organizations
    #[inline]
    #[must_use]
    pub fn all_orgs(&self) -> Vec<Entity> {
        self.all_entities(EntityKind::Org)
    }

    /// All pillars
    #[inline]
    #[must_use]
    pub fn all_pillars(&self) -> Vec<Entity> {
        self.all_entities(EntityKind::Pillar)
    }

    /// All team groups
    #[inline]
    #[must_use]
    pub fn all_team_groups(&self) -> Vec<Entity> {
        self.all_entities(EntityKind::TeamGroup)
    }

    // ---- Membership ----

    /// Teams the employee is directly in
    #[must_use]
    pub fn teams_for_uid(&self, uid: &str) -> Vec<String> {
        self.read(|s| Hierarchy::new(s).teams_for_uid(uid))
    }

    /// Teams of the employee mapped from a Slack id
    #[must_use]
    pub fn teams_for_slack_id(&self, slack_id: &str) -> Vec<String> {
        self.read(|s| {
            s.uid_for_slack_id(slack_id)
                .map(|uid| Hierarchy::new(s).teams_for_uid(uid))
                .unwrap_or_default()
        })
    }

    /// Check direct team membership
    #[must_use]
    pub fn is_employee_in_team(&self, uid: &str, team: &str) -> bool {
        self.read(|s| Hierarchy::new(s).is_employee_in_team(uid, team))
    }

    /// Check direct team membership of a Slack user
    #[must_use]
    pub fn is_slack_user_in_team(&self, slack_id: &str, team: &str) -> bool {
        self.read(|s| {
            s.uid_for_slack_id(slack_id)
                .is_some_and(|uid| Hierarchy::new(s).is_employee_in_team(uid, team))
        })
    }

    /// Check org membership, directly or through a team
    #[must_use]
    pub fn is_employee_in_org(&self, uid: &str, org: &str) -> bool {
        self.read(|s| Hierarchy::new(s).is_employee_in_org(uid, org))
    }

    /// Check org membership of a Slack user
    #[must_use]
    pub fn is_slack_user_in_org(&self, slack_id: &str, org: &str) -> bool {
        self.read(|s| {
            s.uid_for_slack_id(slack_id)
                .is_some_and(|uid| Hierarchy::new(s).is_employee_in_org(uid, org))
        })
    }

    /// Every group the employee belongs to, deduplicated
    #[must_use]
    pub fn user_organizations(&self, uid: &str) -> Vec<OrgInfo> {
        self.read(|s| Hierarchy::new(s).user_organizations(uid))
    }

    /// Every group the Slack user belongs to, deduplicated
    #[must_use]
    pub fn user_organizations_for_slack_id(&self, slack_id: &str) -> Vec<OrgInfo> {
        self.read(|s| {
            s.uid_for_slack_id(slack_id)
                .map(|uid| Hierarchy::new(s).user_organizations(uid))
                .unwrap_or_default()
        })
    }

    // ---- Hierarchy ----

    /// Path from an entity to its root
    ///
    /// `entity_type` is a type tag (`team`, `org`, `pillar`, `team_group`);
    /// an unrecognized tag yields an empty path.
    #[must_use]
    pub fn hierarchy_path(&self, name: &str, entity_type: &str) -> Vec<HierarchyPathEntry> {
        let Ok(kind) = entity_type.parse::<EntityKind>() else {
            return Vec::new();
        };
        self.read(|s| Hierarchy::new(s).hierarchy_path(name, kind))
    }

    /// Tree of all descendants of an entity
    #[must_use]
    pub fn descendants_tree(&self, name: &str) -> Option<HierarchyNode> {
        self.read(|s| Hierarchy::new(s).descendants_tree(name))
    }

    // ---- Jira ----

    /// All Jira project keys
    #[must_use]
    pub fn jira_projects(&self) -> Vec<String> {
        self.read(|s| s.jira().keys().cloned().collect())
    }

    /// Component names of a Jira project
    ///
    /// `_project_level` denotes ownership of the project as a whole.
    #[must_use]
    pub fn jira_components(&self, project: &str) -> Vec<String> {
        self.read(|s| {
            s.jira()
                .get(project)
                .map(|components| components.keys().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// Owners of any component of a Jira project, deduplicated by name
    #[must_use]
    pub fn teams_by_jira_project(&self, project: &str) -> Vec<JiraOwner> {
        self.read(|s| {
            let Some(components) = s.jira().get(project) else {
                return Vec::new();
            };
            let mut seen = HashSet::new();
            components
                .values()
                .flatten()
                .filter(|owner| seen.insert(owner.name.as_str()))
                .cloned()
                .collect()
        })
    }

    /// Owners of one Jira component
    #[must_use]
    pub fn teams_by_jira_component(&self, project: &str, component: &str) -> Vec<JiraOwner> {
        self.read(|s| {
            s.jira()
                .get(project)
                .and_then(|components| components.get(component))
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Jira project/component pairs owned by a team
    #[must_use]
    pub fn jira_ownership_for_team(&self, team: &str) -> Vec<JiraOwnership> {
        self.read(|s| {
            s.jira()
                .iter()
                .flat_map(|(project, components)| {
                    components
                        .iter()
                        .filter(|(_, owners)| owners.iter().any(|o| o.name == team))
                        .map(move |(component, _)| JiraOwnership {
                            project: project.clone(),
                            component: component.clone(),
                        })
                })
                .collect()
        })
    }
}

/// Releases the watcher slot when the watcher future ends or is dropped
struct WatcherGuard<'a> {
    service: &'a Service,
    generation: u64,
}

impl Drop for WatcherGuard<'_> {
    fn drop(&mut self) {
        self.service.release_watcher(self.generation);
    }
}

/// Reload callback handed to [`DataSource::watch`]
///
/// Changes reported after the watch was cancelled are ignored.
struct Reloader<'a> {
    service: &'a Service,
    source: &'a dyn DataSource,
    cancel: CancellationToken,
}

#[async_trait]
impl OnChange for Reloader<'_> {
    async fn changed(&self) -> Result<(), OrgDataError> {
        if self.cancel.is_cancelled() {
            tracing::debug!(source = %self.source, "watcher stopped, skipping reload");
            return Ok(());
        }
        tracing::info!(source = %self.source, "reloading data from source");
        self.service.load(self.source).await.map(|_| ()).map_err(|e| {
            tracing::error!(source = %self.source, error = %e, "failed to reload data");
            e
        })
    }
}
