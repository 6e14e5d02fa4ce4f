//! # Role Graph Authorization Engine
//!
//! Hierarchical role-permission resolution over a directed acyclic role graph.
//!
//! ## Features
//!
//! - **Acyclic hierarchy** enforced on every edge insert, with witness paths
//! - **Linear-time closures**: each role expanded at most once per resolution
//! - **Invalidation-based caching** of effective permission sets
//! - **Reader/writer discipline**: parallel queries, exclusive mutations
//! - **Write-through persistence** via the async [`store::RbacStore`] trait
//! - **Protected roles** that cannot be removed or rewired
//!
//! ## Example
//!
//! ```rust
//! use rolegraph_authz::{RbacEngine, AuthzError};
//! use rolegraph_core::{Permission, Role, RoleId};
//!
//! fn main() -> Result<(), AuthzError> {
//!     let engine = RbacEngine::new();
//!
//!     engine.add_role(Role::new(2, "league_admin"))?;
//!     engine.add_role(Role::new(5, "user"))?;
//!     engine.add_permission(Permission::new(6, "league_read"))?;
//!
//!     // league_admin inherits everything user can do
//!     engine.add_hierarchy_edge(RoleId::new(2), RoleId::new(5))?;
//!     engine.grant_permission(RoleId::new(5), "league_read")?;
//!
//!     assert!(engine.has_permission(RoleId::new(2), "league_read")?);
//!
//!     // user -> league_admin would close a cycle
//!     assert!(engine.add_hierarchy_edge(RoleId::new(5), RoleId::new(2)).is_err());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod store;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheStats, ResolutionCache};
pub use config::{EngineConfig, ProtectedRoles};
pub use engine::{
    HierarchyNode, InheritedPermission, MatrixCell, MatrixRow, PermissionDiff, PermissionMatrix,
    RbacEngine, RbacReader, RolePermissionDetail,
};
pub use error::{AuthzError, Result};
pub use graph::{CycleGuard, GraphStore, PermissionSet};
pub use resolver::{ClosureResolver, ResolutionStats};
pub use store::{InMemoryRbacStore, JsonFileStore, PersistentRbac, RbacStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
