//! Read-only view of an engine
//!
//! Handed out where mutations must go through another path, such as
//! [`crate::PersistentRbac`], whose writes have to reach the store as well.
//!
//! ```compile_fail
//! use rolegraph_authz::{InMemoryRbacStore, PersistentRbac};
//! use rolegraph_core::RoleId;
//!
//! async fn bypass(rbac: &PersistentRbac<InMemoryRbacStore>) {
//!     rbac.engine().grant_permission(RoleId::new(1), "league_read").unwrap();
//! }
//! ```

use super::{HierarchyNode, PermissionMatrix, RbacEngine, RolePermissionDetail};
use crate::cache::CacheStats;
use crate::error::Result;
use crate::graph::PermissionSet;
use crate::resolver::ResolutionStats;
use rolegraph_core::{Permission, RbacSnapshot, Role, RoleId};
use std::sync::Arc;

/// Query-only handle to an [`RbacEngine`]
#[derive(Clone, Copy)]
pub struct RbacReader<'a> {
    engine: &'a RbacEngine,
}

impl<'a> RbacReader<'a> {
    pub(crate) fn new(engine: &'a RbacEngine) -> Self {
        Self { engine }
    }

    pub fn effective_permissions(&self, role: RoleId) -> Result<Arc<PermissionSet>> {
        self.engine.effective_permissions(role)
    }

    pub fn effective_permission_names(&self, role: RoleId) -> Result<Vec<String>> {
        self.engine.effective_permission_names(role)
    }

    pub fn has_permission(&self, role: RoleId, permission: &str) -> Result<bool> {
        self.engine.has_permission(role, permission)
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, role: RoleId, permissions: &[S]) -> Result<bool> {
        self.engine.has_all_permissions(role, permissions)
    }

    pub fn resolve_with_stats(&self, role: RoleId) -> Result<(PermissionSet, ResolutionStats)> {
        self.engine.resolve_with_stats(role)
    }

    pub fn children(&self, role: RoleId) -> Result<Vec<RoleId>> {
        self.engine.children(role)
    }

    pub fn parents(&self, role: RoleId) -> Result<Vec<RoleId>> {
        self.engine.parents(role)
    }

    pub fn accessible_roles(&self, role: RoleId) -> Result<Vec<RoleId>> {
        self.engine.accessible_roles(role)
    }

    pub fn ancestors(&self, role: RoleId) -> Result<Vec<RoleId>> {
        self.engine.ancestors(role)
    }

    pub fn impacted_by(&self, role: RoleId) -> Result<Vec<RoleId>> {
        self.engine.impacted_by(role)
    }

    pub fn roles_with_permission(&self, permission: &str) -> Result<Vec<RoleId>> {
        self.engine.roles_with_permission(permission)
    }

    pub fn can_add_edge(&self, parent: RoleId, child: RoleId) -> Result<bool> {
        self.engine.can_add_edge(parent, child)
    }

    pub fn role(&self, id: RoleId) -> Option<Role> {
        self.engine.role(id)
    }

    pub fn role_by_name(&self, name: &str) -> Option<Role> {
        self.engine.role_by_name(name)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.engine.roles()
    }

    pub fn permission_by_name(&self, name: &str) -> Option<Permission> {
        self.engine.permission_by_name(name)
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.engine.permissions()
    }

    pub fn direct_permission_names(&self, role: RoleId) -> Result<Vec<String>> {
        self.engine.direct_permission_names(role)
    }

    pub fn direct_holders(&self, permission: &str) -> Result<Vec<RoleId>> {
        self.engine.direct_holders(permission)
    }

    pub fn role_permission_detail(&self, role: RoleId) -> Result<RolePermissionDetail> {
        self.engine.role_permission_detail(role)
    }

    pub fn permission_matrix(&self) -> PermissionMatrix {
        self.engine.permission_matrix()
    }

    pub fn hierarchy_tree(&self) -> Vec<HierarchyNode> {
        self.engine.hierarchy_tree()
    }

    pub fn snapshot(&self) -> RbacSnapshot {
        self.engine.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.engine.cache_stats()
    }
}

impl RbacEngine {
    /// Query-only view of this engine
    pub fn reader(&self) -> RbacReader<'_> {
        RbacReader::new(self)
    }
}
