//! Role and permission entities

use super::ids::{PermissionId, RoleId};
use crate::error::{CoreError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Role names start with a lowercase letter and contain only lowercase
/// letters, digits and underscores.
const ROLE_NAME_PATTERN: &str = "^[a-z][a-z0-9_]*$";

fn role_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ROLE_NAME_PATTERN).expect("role name pattern is valid"))
}

/// Role definition
///
/// A named bundle of access rights. Roles inherit from other roles through
/// hierarchy edges held by the engine, not by the role itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable unique identifier
    pub id: RoleId,

    /// Unique human-readable name (e.g., "league_admin")
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    /// Create a new role
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    /// Add a description to the role
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate the role definition
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CoreError::invalid("Role name cannot be empty"));
        }

        if !role_name_regex().is_match(&self.name) {
            return Err(CoreError::invalid(format!(
                "Role name '{}' must start with a letter and contain only lowercase letters, numbers, and underscores",
                self.name
            )));
        }

        Ok(())
    }
}

/// Permission definition
///
/// An atomic, named capability. Permissions are flat: they never inherit
/// from other permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable unique identifier
    pub id: PermissionId,

    /// Unique permission key (e.g., "league_read")
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Permission {
    /// Create a new permission
    pub fn new(id: impl Into<PermissionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    /// Add a description to the permission
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate the permission definition
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("Permission name cannot be empty"));
        }

        if self.name.chars().any(char::is_whitespace) {
            return Err(CoreError::invalid(format!(
                "Permission name '{}' cannot contain whitespace",
                self.name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_creation() {
        let role = Role::new(2, "league_admin").with_description("Manage leagues and games");

        assert_eq!(role.id, RoleId::new(2));
        assert_eq!(role.name, "league_admin");
        assert!(role.description.is_some());
    }

    #[test]
    fn test_role_validation() {
        assert!(Role::new(1, "super_admin").validate().is_ok());
        assert!(Role::new(1, "tier2").validate().is_ok());

        // Empty name
        assert!(Role::new(1, "").validate().is_err());

        // Must start with a letter
        assert!(Role::new(1, "2fast").validate().is_err());
        assert!(Role::new(1, "_hidden").validate().is_err());

        // Lowercase only
        assert!(Role::new(1, "LeagueAdmin").validate().is_err());
        assert!(Role::new(1, "league-admin").validate().is_err());
    }

    #[test]
    fn test_permission_validation() {
        assert!(Permission::new(6, "league_read").validate().is_ok());
        assert!(Permission::new(6, "").validate().is_err());
        assert!(Permission::new(6, "   ").validate().is_err());
        assert!(Permission::new(6, "league read").validate().is_err());
    }

    #[test]
    fn test_description_omitted_when_absent() {
        let json = serde_json::to_string(&Permission::new(1, "auth_login")).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"auth_login"}"#);
    }
}
