//! Engine configuration loading and validation

use crate::cache::CacheConfig;
use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Complete engine configuration
///
/// ```toml
/// log_level = "info"
/// snapshot_path = "/var/lib/rolegraph/snapshot.json"
///
/// [cache]
/// enabled = true
/// capacity = 10000
///
/// [protected]
/// undeletable = ["super_admin", "user", "league_user"]
/// fixed_inheritance = ["super_admin", "user"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON snapshot loaded by the command-line tool
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default)]
    pub protected: ProtectedRoles,
}

/// Roles shielded from structural changes, by name
///
/// Checked by [`crate::RbacEngine`] on role removal and on any change to a
/// role's own inheritance edges. Loading a snapshot is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtectedRoles {
    /// Roles that can never be removed
    pub undeletable: BTreeSet<String>,

    /// Roles whose inherited roles can never change
    pub fixed_inheritance: BTreeSet<String>,
}

impl ProtectedRoles {
    /// No protection at all
    pub fn none() -> Self {
        Self {
            undeletable: BTreeSet::new(),
            fixed_inheritance: BTreeSet::new(),
        }
    }

    pub fn is_undeletable(&self, name: &str) -> bool {
        self.undeletable.contains(name)
    }

    pub fn has_fixed_inheritance(&self, name: &str) -> bool {
        self.fixed_inheritance.contains(name)
    }
}

impl Default for ProtectedRoles {
    fn default() -> Self {
        let names = |list: &[&str]| -> BTreeSet<String> { list.iter().map(|n| n.to_string()).collect() };
        Self {
            undeletable: names(&["super_admin", "user", "league_user"]),
            fixed_inheritance: names(&["super_admin", "user"]),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            log_level: default_log_level(),
            snapshot_path: None,
            protected: ProtectedRoles::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthzError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(AuthzError::Config(
                "Cache capacity must be positive while caching is enabled".to_string(),
            ));
        }

        if self.log_level.trim().is_empty() {
            return Err(AuthzError::Config("Log level must not be empty".to_string()));
        }

        let protected = &self.protected;
        if let Some(name) = protected
            .undeletable
            .iter()
            .chain(&protected.fixed_inheritance)
            .find(|name| name.trim().is_empty())
        {
            return Err(AuthzError::Config(format!(
                "Protected role name must not be blank: {:?}",
                name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_partial_cache_section() {
        let config = EngineConfig::from_toml(
            r#"
            log_level = "debug"

            [cache]
            capacity = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.cache.capacity, 64);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_zero_capacity_rejected_only_when_enabled() {
        let result = EngineConfig::from_toml("[cache]\ncapacity = 0\n");
        assert!(matches!(result, Err(AuthzError::Config(_))));

        let config = EngineConfig::from_toml("[cache]\nenabled = false\ncapacity = 0\n").unwrap();
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_protected_roles_default_and_override() {
        let config = EngineConfig::default();
        assert!(config.protected.is_undeletable("league_user"));
        assert!(!config.protected.has_fixed_inheritance("league_user"));
        assert!(config.protected.has_fixed_inheritance("super_admin"));

        let config = EngineConfig::from_toml(
            r#"
            [protected]
            undeletable = ["owner"]
            "#,
        )
        .unwrap();
        assert!(config.protected.is_undeletable("owner"));
        assert!(!config.protected.is_undeletable("super_admin"));
        // unset list keeps its default
        assert!(config.protected.has_fixed_inheritance("user"));

        let result = EngineConfig::from_toml("[protected]\nundeletable = [\" \"]\n");
        assert!(matches!(result, Err(AuthzError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "snapshot_path = \"/tmp/rbac.json\"").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/rbac.json")));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = EngineConfig::from_file("/nonexistent/rolegraph.toml");
        assert!(matches!(result, Err(AuthzError::Config(_))));
    }
}
