//! Role graph module
//!
//! Provides the authoritative in-memory role graph and the cycle guard that
//! keeps its hierarchy acyclic.
//!
//! # Features
//!
//! - **Graph Store**: roles, permissions, direct grants and hierarchy edges
//! - **Cycle Guard**: BFS reachability with a visited set and witness paths
//! - **Snapshots**: export to persisted row shapes
//!
//! # Example
//!
//! ```rust
//! use rolegraph_authz::graph::{add_edge_or_fail, CycleGuard, GraphStore};
//! use rolegraph_core::{Role, RoleId};
//!
//! let mut store = GraphStore::new();
//! store.add_role(Role::new(1, "super_admin")).unwrap();
//! store.add_role(Role::new(2, "league_admin")).unwrap();
//!
//! add_edge_or_fail(&mut store, RoleId::new(1), RoleId::new(2)).unwrap();
//! assert!(!CycleGuard::new(&store).can_add_edge(RoleId::new(2), RoleId::new(1)));
//! ```

pub mod guard;
pub mod store;

pub use guard::{add_edge_or_fail, CycleGuard};
pub use store::{GraphStore, PermissionSet};
