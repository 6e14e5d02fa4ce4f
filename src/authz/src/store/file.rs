//! JSON file store
//!
//! Persists the whole snapshot as one pretty-printed JSON document. Each write
//! goes to a sibling temporary file that is then renamed over the original,
//! so a crash mid-write leaves the previous snapshot intact.

use super::{apply_change, RbacStore, RowChange};
use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use rolegraph_core::{
    Permission, PermissionId, RbacSnapshot, Role, RoleHierarchyRow, RoleId, RolePermissionRow,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Store backed by a single JSON snapshot file
pub struct JsonFileStore {
    path: PathBuf,

    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store for the given path; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with the given snapshot
    pub async fn save(&self, snapshot: &RbacSnapshot) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(snapshot).await
    }

    async fn read(&self) -> Result<RbacSnapshot> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(RbacSnapshot::from_json(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RbacSnapshot::new()),
            Err(e) => Err(AuthzError::Store(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write(&self, snapshot: &RbacSnapshot) -> Result<()> {
        let mut normalized = snapshot.clone();
        normalized.normalize();
        let contents = normalized.to_json_pretty()?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, contents).await.map_err(|e| {
            AuthzError::Store(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AuthzError::Store(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!("Wrote snapshot to {}", self.path.display());
        Ok(())
    }

    async fn apply(&self, change: RowChange) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.read().await?;
        apply_change(&mut snapshot, change)?;
        self.write(&snapshot).await
    }
}

#[async_trait]
impl RbacStore for JsonFileStore {
    async fn load(&self) -> Result<RbacSnapshot> {
        let mut snapshot = self.read().await?;
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
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("rbac.json"));

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot, RbacSnapshot::new());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rbac.json");

        let store = JsonFileStore::new(&path);
        store.insert_role(&Role::new(5, "user")).await.unwrap();
        store.insert_permission(&Permission::new(6, "league_read")).await.unwrap();
        store.insert_grant(RolePermissionRow::new(5, 6)).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        let snapshot = reopened.load().await.unwrap();
        assert_eq!(snapshot.roles.len(), 1);
        assert_eq!(snapshot.role_permissions, vec![RolePermissionRow::new(5, 6)]);
        assert!(!dir.path().join("rbac.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rbac.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = JsonFileStore::new(&path).load().await;
        assert!(matches!(result, Err(AuthzError::Core(_))));
    }
}
