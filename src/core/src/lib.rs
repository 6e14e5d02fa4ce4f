//! # Rolegraph Core
//!
//! Shared types for the role hierarchy engine: tagged identifiers, role and
//! permission entities, and the row shapes exchanged with the persistence
//! layer. Kept separate from the engine so storage adapters can depend on the
//! data model without pulling in the resolver.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    Permission, PermissionId, RbacSnapshot, Role, RoleHierarchyRow, RoleId, RolePermissionRow,
};
