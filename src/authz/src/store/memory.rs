//! In-memory store

use super::{apply_change, RbacStore, RowChange};
use crate::error::Result;
use async_trait::async_trait;
use rolegraph_core::{
    Permission, PermissionId, RbacSnapshot, Role, RoleHierarchyRow, RoleId, RolePermissionRow,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store implementation
#[derive(Clone, Default)]
pub struct InMemoryRbacStore {
    tables: Arc<RwLock<RbacSnapshot>>,
}

impl InMemoryRbacStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given rows
    pub fn with_snapshot(snapshot: RbacSnapshot) -> Self {
        Self {
            tables: Arc::new(RwLock::new(snapshot)),
        }
    }

    async fn apply(&self, change: RowChange) -> Result<()> {
        let mut tables = self.tables.write().await;
        apply_change(&mut tables, change)
    }
}

#[async_trait]
impl RbacStore for InMemoryRbacStore {
    async fn load(&self) -> Result<RbacSnapshot> {
        let mut snapshot = self.tables.read().await.clone();
        snapshot.normalize();
        Ok(snapshot)
    }

    async fn insert_role(&self, role: &Role) -> Result<()> {
        self.apply(RowChange::InsertRole(role.clone())).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        self.apply(RowChange::DeleteRole(id)).await
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<()> {
        self.apply(RowChange::InsertPermission(permission.clone())).await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        self.apply(RowChange::DeletePermission(id)).await
    }

    async fn insert_grant(&self, row: RolePermissionRow) -> Result<()> {
        self.apply(RowChange::InsertGrant(row)).await
    }

    async fn delete_grant(&self, row: RolePermissionRow) -> Result<()> {
        self.apply(RowChange::DeleteGrant(row)).await
    }

    async fn insert_edge(&self, row: RoleHierarchyRow) -> Result<()> {
        self.apply(RowChange::InsertEdge(row)).await
    }

    async fn delete_edge(&self, row: RoleHierarchyRow) -> Result<()> {
        self.apply(RowChange::DeleteEdge(row)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = InMemoryRbacStore::new();
        store.insert_role(&Role::new(5, "user")).await.unwrap();
        store.insert_role(&Role::new(1, "super_admin")).await.unwrap();
        store.insert_edge(RoleHierarchyRow::new(1, 5)).await.unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.roles[0].id, RoleId::new(1));
        assert_eq!(snapshot.role_hierarchy, vec![RoleHierarchyRow::new(1, 5)]);

        store.delete_edge(RoleHierarchyRow::new(1, 5)).await.unwrap();
        // deleting an absent row is fine
        store.delete_edge(RoleHierarchyRow::new(1, 5)).await.unwrap();
        assert!(store.load().await.unwrap().role_hierarchy.is_empty());
    }
}
