//! Engine with write-through persistence
//!
//! Every mutation runs against the engine first, so all validation (unknown
//! references, duplicates, cycle checks) happens before anything is written.
//! Only then is the row change sent to the store. If the store write fails the
//! engine change is undone and the store error returned, keeping the two in
//! step.

use super::RbacStore;
use crate::cache::CacheConfig;
use crate::config::EngineConfig;
use crate::engine::{RbacEngine, RbacReader};
use crate::error::{AuthzError, Result};
use rolegraph_core::{Permission, PermissionId, Role, RoleHierarchyRow, RoleId, RolePermissionRow};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// [`RbacEngine`] paired with a durable [`RbacStore`]
pub struct PersistentRbac<S: RbacStore> {
    engine: RbacEngine,
    store: S,

    /// One engine+store mutation at a time
    write_gate: Mutex<()>,
}

impl<S: RbacStore> PersistentRbac<S> {
    /// Load the store's contents into a fresh engine without protected roles
    pub async fn load(store: S, cache_config: CacheConfig) -> Result<Self> {
        let engine = RbacEngine::with_config(cache_config);
        Self::load_into(store, engine).await
    }

    /// Load the store's contents into an engine built from `config`
    pub async fn from_config(store: S, config: &EngineConfig) -> Result<Self> {
        Self::load_into(store, RbacEngine::from_config(config)).await
    }

    async fn load_into(store: S, engine: RbacEngine) -> Result<Self> {
        let snapshot = store.load().await?;
        engine.load_snapshot(&snapshot)?;

        info!(
            "Loaded persistent role graph: {} roles, {} permissions",
            snapshot.roles.len(),
            snapshot.permissions.len()
        );

        Ok(Self {
            engine,
            store,
            write_gate: Mutex::new(()),
        })
    }

    /// Query-only view of the engine; every mutation goes through `self`
    pub fn engine(&self) -> RbacReader<'_> {
        self.engine.reader()
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Discard the in-memory graph and reload it from the store
    pub async fn reload(&self) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let snapshot = self.store.load().await?;
        self.engine.load_snapshot(&snapshot)
    }

    pub async fn add_role(&self, role: Role) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.engine.add_role(role.clone())?;

        if let Err(err) = self.store.insert_role(&role).await {
            self.undo("add_role", self.engine.remove_role_unguarded(role.id).map(|_| ()));
            return Err(err);
        }
        Ok(())
    }

    pub async fn remove_role(&self, id: RoleId) -> Result<Role> {
        let _gate = self.write_gate.lock().await;
        let direct = self.engine.direct_permission_names(id)?;
        let children = self.engine.children(id)?;
        let role = self.engine.remove_role(id)?;

        if let Err(err) = self.store.delete_role(id).await {
            let restored = self
                .engine
                .add_role(role.clone())
                .and_then(|_| self.engine.set_role_permissions(id, direct.as_slice()).map(|_| ()))
                .and_then(|_| self.engine.restore_inheritance(id, &children).map(|_| ()));
            self.undo("remove_role", restored);
            return Err(err);
        }
        Ok(role)
    }

    pub async fn add_permission(&self, permission: Permission) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.engine.add_permission(permission.clone())?;

        if let Err(err) = self.store.insert_permission(&permission).await {
            self.undo(
                "add_permission",
                self.engine.remove_permission(&permission.name).map(|_| ()),
            );
            return Err(err);
        }
        Ok(())
    }

    pub async fn remove_permission(&self, name: &str) -> Result<Permission> {
        let _gate = self.write_gate.lock().await;
        let holders = self.engine.direct_holders(name)?;
        let permission = self.engine.remove_permission(name)?;

        if let Err(err) = self.store.delete_permission(permission.id).await {
            let restored = self.engine.add_permission(permission.clone()).and_then(|_| {
                holders
                    .iter()
                    .try_for_each(|role| self.engine.grant_permission(*role, name).map(|_| ()))
            });
            self.undo("remove_permission", restored);
            return Err(err);
        }
        Ok(permission)
    }

    pub async fn grant_permission(&self, role: RoleId, permission: &str) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        if !self.engine.grant_permission(role, permission)? {
            return Ok(false);
        }

        let row = RolePermissionRow::new(role, self.permission_id(permission)?);
        if let Err(err) = self.store.insert_grant(row).await {
            self.undo(
                "grant_permission",
                self.engine.revoke_permission(role, permission).map(|_| ()),
            );
            return Err(err);
        }
        Ok(true)
    }

    pub async fn revoke_permission(&self, role: RoleId, permission: &str) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        if !self.engine.revoke_permission(role, permission)? {
            return Ok(false);
        }

        let row = RolePermissionRow::new(role, self.permission_id(permission)?);
        if let Err(err) = self.store.delete_grant(row).await {
            self.undo(
                "revoke_permission",
                self.engine.grant_permission(role, permission).map(|_| ()),
            );
            return Err(err);
        }
        Ok(true)
    }

    pub async fn add_hierarchy_edge(&self, parent: RoleId, child: RoleId) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        if !self.engine.add_hierarchy_edge(parent, child)? {
            return Ok(false);
        }

        if let Err(err) = self.store.insert_edge(RoleHierarchyRow::new(parent, child)).await {
            self.undo(
                "add_hierarchy_edge",
                self.engine.remove_hierarchy_edge(parent, child).map(|_| ()),
            );
            return Err(err);
        }
        Ok(true)
    }

    pub async fn remove_hierarchy_edge(&self, parent: RoleId, child: RoleId) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        if !self.engine.remove_hierarchy_edge(parent, child)? {
            return Ok(false);
        }

        if let Err(err) = self.store.delete_edge(RoleHierarchyRow::new(parent, child)).await {
            self.undo(
                "remove_hierarchy_edge",
                self.engine.add_hierarchy_edge(parent, child).map(|_| ()),
            );
            return Err(err);
        }
        Ok(true)
    }

    fn permission_id(&self, name: &str) -> Result<PermissionId> {
        self.engine
            .permission_by_name(name)
            .map(|p| p.id)
            .ok_or_else(|| AuthzError::UnknownPermission(name.to_string()))
    }

    fn undo(&self, operation: &str, result: Result<()>) {
        if let Err(err) = result {
            warn!("Failed to undo {} after store error: {}", operation, err);
        }
    }
}
