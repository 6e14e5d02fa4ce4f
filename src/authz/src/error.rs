//! Error types for the role graph engine

use rolegraph_core::{CoreError, RoleId};
use thiserror::Error;

/// Role graph engine errors
///
/// Every failure names the kind of violation. The engine never retries and
/// never logs-and-swallows: each variant is returned to the caller.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Reference to a role not present in the graph
    #[error("Unknown role: {0}")]
    UnknownRole(RoleId),

    /// Reference to a permission not present in the graph
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// Role id or name already exists
    #[error("Duplicate role: {0}")]
    DuplicateRole(String),

    /// Permission id or name already exists
    #[error("Duplicate permission: {0}")]
    DuplicatePermission(String),

    /// Adding `parent -> child` would let `parent` reach itself
    #[error("Cycle violation: adding {parent} -> {child} would close {}", format_path(.path))]
    CycleViolation {
        parent: RoleId,
        child: RoleId,
        /// Witness cycle, starting and ending at `parent`
        path: Vec<RoleId>,
    },

    /// Role cannot be removed while other roles inherit from it
    #[error("Role {role} is inherited by {}", format_list(.inherited_by))]
    RoleInUse {
        role: RoleId,
        inherited_by: Vec<RoleId>,
    },

    /// Role is shielded by the protected-role policy
    #[error("Role {role} ({name}) is protected against {operation}")]
    ProtectedRole {
        role: RoleId,
        name: String,
        operation: &'static str,
    },

    /// Persistence collaborator failure
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data model error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AuthzError {
    /// True for the unknown-reference kinds
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownRole(_) | Self::UnknownPermission(_))
    }
}

fn format_path(path: &[RoleId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_list(roles: &[RoleId]) -> String {
    roles
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for role graph operations
pub type Result<T> = std::result::Result<T, AuthzError>;
