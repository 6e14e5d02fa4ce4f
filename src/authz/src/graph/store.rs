//! In-memory role graph
//!
//! Holds roles, permissions, direct grants and hierarchy edges. The hierarchy
//! is a `petgraph` `DiGraphMap` keyed by `RoleId`, so both directions of
//! neighbor lookup are hash lookups:
//!
//! - outgoing edges of `r` are its **children** (roles `r` inherits from)
//! - incoming edges of `r` are its **parents** (roles that inherit from `r`)
//!
//! The store performs no cycle checks of its own; hierarchy inserts go through
//! [`super::guard`] first.

use crate::error::{AuthzError, Result};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use rolegraph_core::{
    Permission, PermissionId, RbacSnapshot, Role, RoleHierarchyRow, RoleId, RolePermissionRow,
};
use std::collections::{BTreeSet, HashMap};

/// Direct permission set of a single role
pub type PermissionSet = BTreeSet<PermissionId>;

/// Authoritative in-memory copy of the access-control tables
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Role definitions by id
    roles: HashMap<RoleId, Role>,

    /// Role name index
    role_names: HashMap<String, RoleId>,

    /// Permission definitions by id
    permissions: HashMap<PermissionId, Permission>,

    /// Permission name index
    permission_names: HashMap<String, PermissionId>,

    /// Direct grants (role -> permissions)
    grants: HashMap<RoleId, PermissionSet>,

    /// Hierarchy edges (parent -> child)
    hierarchy: DiGraphMap<RoleId, ()>,
}

impl GraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // ── Roles ──

    /// Add a role
    ///
    /// # Errors
    ///
    /// - `DuplicateRole` if the id or the name is already taken
    /// - `Core` if the role fails validation
    pub fn add_role(&mut self, role: Role) -> Result<()> {
        role.validate()?;

        if self.roles.contains_key(&role.id) {
            return Err(AuthzError::DuplicateRole(role.id.to_string()));
        }
        if self.role_names.contains_key(&role.name) {
            return Err(AuthzError::DuplicateRole(role.name.clone()));
        }

        self.hierarchy.add_node(role.id);
        self.role_names.insert(role.name.clone(), role.id);
        self.grants.insert(role.id, PermissionSet::new());
        self.roles.insert(role.id, role);

        Ok(())
    }

    /// Remove a role together with its grants and its outgoing edges
    ///
    /// # Errors
    ///
    /// - `UnknownRole` if absent
    /// - `RoleInUse` if any role still inherits from it
    pub fn remove_role(&mut self, id: RoleId) -> Result<Role> {
        self.require_role(id)?;

        let mut inherited_by: Vec<RoleId> = self.parents(id).collect();
        if !inherited_by.is_empty() {
            inherited_by.sort();
            return Err(AuthzError::RoleInUse {
                role: id,
                inherited_by,
            });
        }

        self.hierarchy.remove_node(id);
        self.grants.remove(&id);
        let role = self
            .roles
            .remove(&id)
            .ok_or(AuthzError::UnknownRole(id))?;
        self.role_names.remove(&role.name);

        Ok(role)
    }

    /// Get a role by id
    pub fn role(&self, id: RoleId) -> Option<&Role> {
        self.roles.get(&id)
    }

    /// Get a role by name
    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.role_names.get(name).and_then(|id| self.roles.get(id))
    }

    /// Whether a role exists
    pub fn contains_role(&self, id: RoleId) -> bool {
        self.roles.contains_key(&id)
    }

    /// Fail with `UnknownRole` unless the role exists
    pub fn require_role(&self, id: RoleId) -> Result<&Role> {
        self.roles.get(&id).ok_or(AuthzError::UnknownRole(id))
    }

    /// All roles, sorted by id
    pub fn roles(&self) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self.roles.values().collect();
        roles.sort_by_key(|r| r.id);
        roles
    }

    /// Number of roles
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    // ── Permissions ──

    /// Add a permission
    ///
    /// # Errors
    ///
    /// - `DuplicatePermission` if the id or the name is already taken
    /// - `Core` if the permission fails validation
    pub fn add_permission(&mut self, permission: Permission) -> Result<()> {
        permission.validate()?;

        if self.permissions.contains_key(&permission.id) {
            return Err(AuthzError::DuplicatePermission(permission.id.to_string()));
        }
        if self.permission_names.contains_key(&permission.name) {
            return Err(AuthzError::DuplicatePermission(permission.name.clone()));
        }

        self.permission_names
            .insert(permission.name.clone(), permission.id);
        self.permissions.insert(permission.id, permission);

        Ok(())
    }

    /// Remove a permission and every direct grant of it
    ///
    /// Returns the removed permission and the roles that granted it directly.
    pub fn remove_permission(&mut self, name: &str) -> Result<(Permission, Vec<RoleId>)> {
        let id = self.require_permission(name)?;

        let mut holders = Vec::new();
        for (role, granted) in self.grants.iter_mut() {
            if granted.remove(&id) {
                holders.push(*role);
            }
        }
        holders.sort();

        self.permission_names.remove(name);
        let permission = self
            .permissions
            .remove(&id)
            .ok_or_else(|| AuthzError::UnknownPermission(name.to_string()))?;

        Ok((permission, holders))
    }

    /// Look up a permission id by name
    pub fn permission_id(&self, name: &str) -> Option<PermissionId> {
        self.permission_names.get(name).copied()
    }

    /// Fail with `UnknownPermission` unless the name exists
    pub fn require_permission(&self, name: &str) -> Result<PermissionId> {
        self.permission_id(name)
            .ok_or_else(|| AuthzError::UnknownPermission(name.to_string()))
    }

    /// Get a permission by id
    pub fn permission(&self, id: PermissionId) -> Option<&Permission> {
        self.permissions.get(&id)
    }

    /// All permissions, sorted by id
    pub fn permissions(&self) -> Vec<&Permission> {
        let mut permissions: Vec<&Permission> = self.permissions.values().collect();
        permissions.sort_by_key(|p| p.id);
        permissions
    }

    /// Number of permissions
    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }

    // ── Grants ──

    /// Directly grant a permission to a role
    ///
    /// Idempotent: returns `false` if the grant already existed.
    pub fn grant_permission(&mut self, role: RoleId, permission: PermissionId) -> Result<bool> {
        self.require_role(role)?;
        if !self.permissions.contains_key(&permission) {
            return Err(AuthzError::UnknownPermission(permission.to_string()));
        }

        Ok(self.grants.entry(role).or_default().insert(permission))
    }

    /// Revoke a direct grant
    ///
    /// Idempotent: returns `false` if the grant was absent.
    pub fn revoke_permission(&mut self, role: RoleId, permission: PermissionId) -> Result<bool> {
        self.require_role(role)?;
        if !self.permissions.contains_key(&permission) {
            return Err(AuthzError::UnknownPermission(permission.to_string()));
        }

        Ok(self
            .grants
            .get_mut(&role)
            .map(|granted| granted.remove(&permission))
            .unwrap_or(false))
    }

    /// Replace the direct grant set of a role, returning the previous set
    pub(crate) fn replace_grants(&mut self, role: RoleId, granted: PermissionSet) -> Result<PermissionSet> {
        self.require_role(role)?;
        Ok(self.grants.insert(role, granted).unwrap_or_default())
    }

    /// Direct permissions of a role (empty for unknown roles)
    pub fn direct_permissions(&self, role: RoleId) -> &PermissionSet {
        static EMPTY: PermissionSet = PermissionSet::new();
        self.grants.get(&role).unwrap_or(&EMPTY)
    }

    // ── Hierarchy ──

    /// Roles that `role` directly inherits from
    pub fn children(&self, role: RoleId) -> impl Iterator<Item = RoleId> + '_ {
        self.hierarchy.neighbors_directed(role, Direction::Outgoing)
    }

    /// Roles that directly inherit from `role`
    pub fn parents(&self, role: RoleId) -> impl Iterator<Item = RoleId> + '_ {
        self.hierarchy.neighbors_directed(role, Direction::Incoming)
    }

    /// Whether the edge `parent -> child` exists
    pub fn contains_edge(&self, parent: RoleId, child: RoleId) -> bool {
        self.hierarchy.contains_edge(parent, child)
    }

    /// Insert an edge without a cycle check
    ///
    /// Callers must have validated the edge through the cycle guard.
    pub(crate) fn insert_edge(&mut self, parent: RoleId, child: RoleId) -> bool {
        self.hierarchy.add_edge(parent, child, ()).is_none()
    }

    /// Drop an edge without checking its endpoints
    pub(crate) fn unlink_edge(&mut self, parent: RoleId, child: RoleId) -> bool {
        self.hierarchy.remove_edge(parent, child).is_some()
    }

    /// Remove the edge `parent -> child`
    ///
    /// Idempotent: returns `false` if the edge was absent.
    pub fn remove_edge(&mut self, parent: RoleId, child: RoleId) -> Result<bool> {
        self.require_role(parent)?;
        self.require_role(child)?;
        Ok(self.hierarchy.remove_edge(parent, child).is_some())
    }

    /// All hierarchy edges as rows, sorted
    pub fn edges(&self) -> Vec<RoleHierarchyRow> {
        let mut rows: Vec<RoleHierarchyRow> = self
            .hierarchy
            .all_edges()
            .map(|(parent, child, _)| RoleHierarchyRow {
                parent_role_id: parent,
                child_role_id: child,
            })
            .collect();
        rows.sort();
        rows
    }

    /// Number of hierarchy edges
    pub fn edge_count(&self) -> usize {
        self.hierarchy.edge_count()
    }

    // ── Snapshots ──

    /// Export the full state as persisted rows
    pub fn to_snapshot(&self) -> RbacSnapshot {
        let mut role_permissions: Vec<RolePermissionRow> = self
            .grants
            .iter()
            .flat_map(|(role, granted)| {
                granted.iter().map(move |permission| RolePermissionRow {
                    role_id: *role,
                    permission_id: *permission,
                })
            })
            .collect();
        role_permissions.sort();

        RbacSnapshot {
            roles: self.roles().into_iter().cloned().collect(),
            permissions: self.permissions().into_iter().cloned().collect(),
            role_permissions,
            role_hierarchy: self.edges(),
        }
    }
}
