//! orgdata core - read-only organizational directory
//!
//! Serves point and hierarchy queries over an employee/team/org directory
//! whose indexes are computed upstream:
//! - Loads and validates a JSON document into an immutable snapshot
//! - Swaps snapshots atomically on reload while readers keep running
//! - Derives org inclusion, membership closures, hierarchy paths and
//!   descendant trees from flattened ancestry records
//! - Watches a data source and reloads on change
//!
//! # Example
//!
//! ```rust,ignore
//! use orgdata_core::{FileDataSource, Service};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FileDataSource::from_path("/data/org.json")?;
//! let service = Service::with_source(&source).await?;
//!
//! for team in service.teams_for_uid("jsmith") {
//!     println!("{team}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod loader;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod types;

pub use config::FileSourceConfig;
pub use error::{ConfigError, LoadError, OrgDataError, OrgDataResult, ValidationError};
pub use hierarchy::Hierarchy;
pub use loader::{load_snapshot, parse, ParseError};
pub use service::Service;
pub use snapshot::Snapshot;
pub use source::{DataSource, FileDataSource, OnChange};
pub use types::{
    AncestryRecord, Component, DataVersion, Employee, Entity, EntityKind, Group, HierarchyNode,
    HierarchyPathEntry, JiraOwner, JiraOwnership, MembershipEntry, Metadata, OrgInfo, OrgInfoType,
    ParentRef, UnknownEntityKind,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with orgdata
    pub use crate::{
        DataSource, DataVersion, Employee, Entity, EntityKind, FileDataSource, HierarchyNode,
        HierarchyPathEntry, OrgDataError, OrgDataResult, OrgInfo, OrgInfoType, Service,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
