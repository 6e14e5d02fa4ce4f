//! Tagged identifiers
//!
//! Role and permission identifiers are distinct newtypes so a role id can
//! never be compared against, or passed in place of, a permission id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub u64);

impl RoleId {
    /// Create a new role ID
    pub fn new(id: u64) -> Self {
        RoleId(id)
    }

    /// Get the raw numeric value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RoleId {
    fn from(id: u64) -> Self {
        RoleId(id)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role#{}", self.0)
    }
}

/// Unique identifier for a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(pub u64);

impl PermissionId {
    /// Create a new permission ID
    pub fn new(id: u64) -> Self {
        PermissionId(id)
    }

    /// Get the raw numeric value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for PermissionId {
    fn from(id: u64) -> Self {
        PermissionId(id)
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "permission#{}", self.0)
    }
}
