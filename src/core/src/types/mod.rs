//! Shared types for the role hierarchy engine

pub mod ids;
pub mod entities;
pub mod rows;

// Re-export commonly used types
pub use ids::{PermissionId, RoleId};
pub use entities::{Permission, Role};
pub use rows::{RbacSnapshot, RoleHierarchyRow, RolePermissionRow};
