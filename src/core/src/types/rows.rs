//! Persisted row shapes
//!
//! These mirror the `role_hierarchy` and `role_permissions` tables: each row
//! is unique per ordered pair. `RbacSnapshot` bundles every table so a store
//! can hand the engine its complete state in one value.

use super::entities::{Permission, Role};
use super::ids::{PermissionId, RoleId};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A `(parent_role_id, child_role_id)` row: the parent inherits everything
/// the child can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleHierarchyRow {
    pub parent_role_id: RoleId,
    pub child_role_id: RoleId,
}

impl RoleHierarchyRow {
    pub fn new(parent: impl Into<RoleId>, child: impl Into<RoleId>) -> Self {
        Self {
            parent_role_id: parent.into(),
            child_role_id: child.into(),
        }
    }
}

/// A `(role_id, permission_id)` row: the role directly grants the permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RolePermissionRow {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

impl RolePermissionRow {
    pub fn new(role: impl Into<RoleId>, permission: impl Into<PermissionId>) -> Self {
        Self {
            role_id: role.into(),
            permission_id: permission.into(),
        }
    }
}

/// Complete persisted state of the access-control tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacSnapshot {
    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    #[serde(default)]
    pub role_permissions: Vec<RolePermissionRow>,

    #[serde(default)]
    pub role_hierarchy: Vec<RoleHierarchyRow>,
}

impl RbacSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the snapshot as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Sort every table by key so equal states compare equal
    pub fn normalize(&mut self) {
        self.roles.sort_by_key(|r| r.id);
        self.permissions.sort_by_key(|p| p.id);
        self.role_permissions.sort();
        self.role_permissions.dedup();
        self.role_hierarchy.sort();
        self.role_hierarchy.dedup();
    }
}
