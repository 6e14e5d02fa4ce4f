//! Persistence collaborator
//!
//! The engine is authoritative at runtime; an [`RbacStore`] holds the durable
//! copy of the four access-control tables. Stores enforce the table
//! constraints (unique pairs, known references, cascading deletes) but never
//! check hierarchy cycles. That is the engine's job.

pub mod file;
pub mod memory;
pub mod persistent;

pub use file::JsonFileStore;
pub use memory::InMemoryRbacStore;
pub use persistent::PersistentRbac;

use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use rolegraph_core::{
    Permission, PermissionId, RbacSnapshot, Role, RoleHierarchyRow, RoleId, RolePermissionRow,
};

/// Durable storage for roles, permissions, grants and hierarchy edges
#[async_trait]
pub trait RbacStore: Send + Sync {
    /// Load the complete persisted state
    async fn load(&self) -> Result<RbacSnapshot>;

    /// Insert a role row
    async fn insert_role(&self, role: &Role) -> Result<()>;

    /// Delete a role row and every grant and edge that references it
    async fn delete_role(&self, id: RoleId) -> Result<()>;

    /// Insert a permission row
    async fn insert_permission(&self, permission: &Permission) -> Result<()>;

    /// Delete a permission row and every grant of it
    async fn delete_permission(&self, id: PermissionId) -> Result<()>;

    /// Insert a `role_permissions` row
    async fn insert_grant(&self, row: RolePermissionRow) -> Result<()>;

    /// Delete a `role_permissions` row
    async fn delete_grant(&self, row: RolePermissionRow) -> Result<()>;

    /// Insert a `role_hierarchy` row
    async fn insert_edge(&self, row: RoleHierarchyRow) -> Result<()>;

    /// Delete a `role_hierarchy` row
    async fn delete_edge(&self, row: RoleHierarchyRow) -> Result<()>;
}

/// A single row-level write
#[derive(Debug, Clone)]
pub(crate) enum RowChange {
    InsertRole(Role),
    DeleteRole(RoleId),
    InsertPermission(Permission),
    DeletePermission(PermissionId),
    InsertGrant(RolePermissionRow),
    DeleteGrant(RolePermissionRow),
    InsertEdge(RoleHierarchyRow),
    DeleteEdge(RoleHierarchyRow),
}

/// Apply a row change to a snapshot with table-constraint checks
///
/// Deletes of absent rows succeed; inserts of existing rows fail.
pub(crate) fn apply_change(snapshot: &mut RbacSnapshot, change: RowChange) -> Result<()> {
    match change {
        RowChange::InsertRole(role) => {
            if snapshot.roles.iter().any(|r| r.id == role.id || r.name == role.name) {
                return Err(AuthzError::Store(format!("Role {} already stored", role.id)));
            }
            snapshot.roles.push(role);
        }
        RowChange::DeleteRole(id) => {
            snapshot.roles.retain(|r| r.id != id);
            snapshot.role_permissions.retain(|row| row.role_id != id);
            snapshot
                .role_hierarchy
                .retain(|row| row.parent_role_id != id && row.child_role_id != id);
        }
        RowChange::InsertPermission(permission) => {
            if snapshot
                .permissions
                .iter()
                .any(|p| p.id == permission.id || p.name == permission.name)
            {
                return Err(AuthzError::Store(format!(
                    "Permission {} already stored",
                    permission.name
                )));
            }
            snapshot.permissions.push(permission);
        }
        RowChange::DeletePermission(id) => {
            snapshot.permissions.retain(|p| p.id != id);
            snapshot.role_permissions.retain(|row| row.permission_id != id);
        }
        RowChange::InsertGrant(row) => {
            require_role_row(snapshot, row.role_id)?;
            if !snapshot.permissions.iter().any(|p| p.id == row.permission_id) {
                return Err(AuthzError::Store(format!(
                    "Grant references missing {}",
                    row.permission_id
                )));
            }
            if snapshot.role_permissions.contains(&row) {
                return Err(AuthzError::Store(format!(
                    "Grant ({}, {}) already stored",
                    row.role_id, row.permission_id
                )));
            }
            snapshot.role_permissions.push(row);
        }
        RowChange::DeleteGrant(row) => {
            snapshot.role_permissions.retain(|existing| *existing != row);
        }
        RowChange::InsertEdge(row) => {
            require_role_row(snapshot, row.parent_role_id)?;
            require_role_row(snapshot, row.child_role_id)?;
            if snapshot.role_hierarchy.contains(&row) {
                return Err(AuthzError::Store(format!(
                    "Edge ({}, {}) already stored",
                    row.parent_role_id, row.child_role_id
                )));
            }
            snapshot.role_hierarchy.push(row);
        }
        RowChange::DeleteEdge(row) => {
            snapshot.role_hierarchy.retain(|existing| *existing != row);
        }
    }

    Ok(())
}

fn require_role_row(snapshot: &RbacSnapshot, id: RoleId) -> Result<()> {
    if snapshot.roles.iter().any(|r| r.id == id) {
        Ok(())
    } else {
        Err(AuthzError::Store(format!("Row references missing {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_role_cascades() {
        let mut snapshot = RbacSnapshot::new();
        apply_change(&mut snapshot, RowChange::InsertRole(Role::new(1, "super_admin"))).unwrap();
        apply_change(&mut snapshot, RowChange::InsertRole(Role::new(2, "league_admin"))).unwrap();
        apply_change(&mut snapshot, RowChange::InsertPermission(Permission::new(6, "league_read"))).unwrap();
        apply_change(&mut snapshot, RowChange::InsertGrant(RolePermissionRow::new(2, 6))).unwrap();
        apply_change(&mut snapshot, RowChange::InsertEdge(RoleHierarchyRow::new(1, 2))).unwrap();

        apply_change(&mut snapshot, RowChange::DeleteRole(RoleId::new(2))).unwrap();

        assert_eq!(snapshot.roles.len(), 1);
        assert!(snapshot.role_permissions.is_empty());
        assert!(snapshot.role_hierarchy.is_empty());
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let mut snapshot = RbacSnapshot::new();
        apply_change(&mut snapshot, RowChange::InsertRole(Role::new(1, "a"))).unwrap();
        apply_change(&mut snapshot, RowChange::InsertRole(Role::new(2, "b"))).unwrap();
        apply_change(&mut snapshot, RowChange::InsertEdge(RoleHierarchyRow::new(1, 2))).unwrap();

        let result = apply_change(&mut snapshot, RowChange::InsertEdge(RoleHierarchyRow::new(1, 2)));
        assert!(matches!(result, Err(AuthzError::Store(_))));
        assert_eq!(snapshot.role_hierarchy.len(), 1);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut snapshot = RbacSnapshot::new();
        apply_change(&mut snapshot, RowChange::InsertRole(Role::new(1, "a"))).unwrap();

        let result = apply_change(&mut snapshot, RowChange::InsertGrant(RolePermissionRow::new(1, 9)));
        assert!(matches!(result, Err(AuthzError::Store(_))));

        let result = apply_change(&mut snapshot, RowChange::InsertEdge(RoleHierarchyRow::new(1, 3)));
        assert!(matches!(result, Err(AuthzError::Store(_))));
    }
}
