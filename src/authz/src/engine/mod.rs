//! Query façade over the role graph
//!
//! `RbacEngine` is the single entry point callers use. It owns the graph
//! store behind a reader/writer lock and the resolution cache beside it.
//!
//! # Architecture
//!
//! ```text
//! read:     effective_permissions ─→ [Cache] ──miss──→ ClosureResolver ─→ GraphStore
//!                                       ↑                     │
//!                                       └────────── put ──────┘
//!
//! mutation: grant / edge / role ─→ CycleGuard ─→ GraphStore ─→ invalidate ancestors-or-self
//! ```
//!
//! Reads hold the shared lock for the whole cache-check/resolve/put sequence,
//! and mutations hold the exclusive lock until their invalidation is done, so
//! no reader can observe an edge without its invalidation or cache a closure
//! computed from a graph that has since changed.

pub mod inspect;
pub mod reader;

pub use inspect::{
    HierarchyNode, InheritedPermission, MatrixCell, MatrixRow, PermissionMatrix,
    RolePermissionDetail,
};
pub use reader::RbacReader;

use crate::cache::{CacheConfig, CacheStats, ResolutionCache};
use crate::config::{EngineConfig, ProtectedRoles};
use crate::error::{AuthzError, Result};
use crate::graph::{add_edge_or_fail, CycleGuard, GraphStore, PermissionSet};
use crate::resolver::{ClosureResolver, ResolutionStats};
use parking_lot::RwLock;
use rolegraph_core::{Permission, PermissionId, RbacSnapshot, Role, RoleId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Direct-permission changes made by [`RbacEngine::set_role_permissions`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl PermissionDiff {
    /// True when nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Hierarchical role-permission resolution engine
///
/// # Thread Safety
///
/// Any number of reads proceed in parallel; a mutation blocks new reads until
/// it and its cache invalidation complete. Share across threads with `Arc`.
pub struct RbacEngine {
    /// Authoritative role graph
    graph: RwLock<GraphStore>,

    /// Resolved closures
    cache: ResolutionCache,

    /// Roles shielded from removal or inheritance changes
    protected: ProtectedRoles,
}

impl RbacEngine {
    /// Create an empty engine with the default cache settings
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create an empty engine with custom cache settings and no protected roles
    pub fn with_config(cache_config: CacheConfig) -> Self {
        Self {
            graph: RwLock::new(GraphStore::new()),
            cache: ResolutionCache::new(cache_config),
            protected: ProtectedRoles::none(),
        }
    }

    /// Create an empty engine from a full configuration, protected roles included
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_config(config.cache.clone()).with_protected_roles(config.protected.clone())
    }

    /// Replace the protected-role policy
    pub fn with_protected_roles(mut self, protected: ProtectedRoles) -> Self {
        self.protected = protected;
        self
    }

    /// Current protected-role policy
    pub fn protected_roles(&self) -> &ProtectedRoles {
        &self.protected
    }

    /// Build an engine from persisted rows
    ///
    /// # Errors
    ///
    /// Fails on the first duplicate, unknown reference or cycle in the rows.
    pub fn from_snapshot(snapshot: &RbacSnapshot, cache_config: CacheConfig) -> Result<Self> {
        let engine = Self::with_config(cache_config);
        engine.load_snapshot(snapshot)?;
        Ok(engine)
    }

    /// Replace the whole graph with the given rows
    ///
    /// The new graph is built aside and swapped in only if every row is valid;
    /// on error the current graph is untouched.
    pub fn load_snapshot(&self, snapshot: &RbacSnapshot) -> Result<()> {
        let store = Self::build_store(snapshot)?;

        info!(
            "Loaded role graph: {} roles, {} permissions, {} edges",
            store.role_count(),
            store.permission_count(),
            store.edge_count()
        );

        let mut graph = self.graph.write();
        *graph = store;
        self.cache.clear();
        Ok(())
    }

    fn build_store(snapshot: &RbacSnapshot) -> Result<GraphStore> {
        let mut store = GraphStore::new();

        for role in &snapshot.roles {
            store.add_role(role.clone())?;
        }
        for permission in &snapshot.permissions {
            store.add_permission(permission.clone())?;
        }
        for row in &snapshot.role_permissions {
            store.grant_permission(row.role_id, row.permission_id)?;
        }
        for row in &snapshot.role_hierarchy {
            add_edge_or_fail(&mut store, row.parent_role_id, row.child_role_id)?;
        }

        Ok(store)
    }

    /// Export the current state as persisted rows
    pub fn snapshot(&self) -> RbacSnapshot {
        self.graph.read().to_snapshot()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Effective permission set of a role
    ///
    /// The returned set is a shared snapshot; it is never mutated afterwards.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRole` if the role does not exist.
    pub fn effective_permissions(&self, role: RoleId) -> Result<Arc<PermissionSet>> {
        let graph = self.graph.read();
        self.closure(&graph, role)
    }

    /// Effective permission names of a role, sorted
    pub fn effective_permission_names(&self, role: RoleId) -> Result<Vec<String>> {
        let graph = self.graph.read();
        let closure = self.closure(&graph, role)?;

        let mut names: Vec<String> = closure
            .iter()
            .filter_map(|id| graph.permission(*id).map(|p| p.name.clone()))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Whether `role` holds the named permission
    ///
    /// An unknown permission name is simply not held.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRole` if the role does not exist.
    pub fn has_permission(&self, role: RoleId, permission: &str) -> Result<bool> {
        let graph = self.graph.read();
        graph.require_role(role)?;

        let Some(permission_id) = graph.permission_id(permission) else {
            return Ok(false);
        };

        self.holds(&graph, role, permission_id)
    }

    /// Whether `role` holds every named permission (true for an empty list)
    pub fn has_all_permissions<S: AsRef<str>>(&self, role: RoleId, permissions: &[S]) -> Result<bool> {
        let graph = self.graph.read();
        graph.require_role(role)?;

        for name in permissions {
            let Some(permission_id) = graph.permission_id(name.as_ref()) else {
                return Ok(false);
            };
            if !self.holds(&graph, role, permission_id)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Resolve without the cache, returning expansion counters
    pub fn resolve_with_stats(&self, role: RoleId) -> Result<(PermissionSet, ResolutionStats)> {
        let graph = self.graph.read();
        ClosureResolver::new(&graph).resolve_with_stats(role)
    }

    fn closure(&self, graph: &GraphStore, role: RoleId) -> Result<Arc<PermissionSet>> {
        graph.require_role(role)?;

        if let Some(cached) = self.cache.get(role) {
            return Ok(cached);
        }

        let (permissions, stats) = ClosureResolver::new(graph).resolve_counted(role)?;
        debug!(
            "Resolved {}: {} permissions, {} expansions, {} edges",
            role,
            permissions.len(),
            stats.expansions,
            stats.edges_followed
        );

        let permissions = Arc::new(permissions);
        self.cache.put(role, Arc::clone(&permissions));
        Ok(permissions)
    }

    fn holds(&self, graph: &GraphStore, role: RoleId, permission: PermissionId) -> Result<bool> {
        if self.cache.is_enabled() {
            Ok(self.closure(graph, role)?.contains(&permission))
        } else {
            ClosureResolver::new(graph).holds(role, permission)
        }
    }

    // ========================================================================
    // Graph queries
    // ========================================================================

    /// Roles that `role` directly inherits from, sorted
    pub fn children(&self, role: RoleId) -> Result<Vec<RoleId>> {
        let graph = self.graph.read();
        graph.require_role(role)?;
        Ok(sorted(graph.children(role)))
    }

    /// Roles that directly inherit from `role`, sorted
    pub fn parents(&self, role: RoleId) -> Result<Vec<RoleId>> {
        let graph = self.graph.read();
        graph.require_role(role)?;
        Ok(sorted(graph.parents(role)))
    }

    /// `role` itself plus every role it inherits from, sorted
    pub fn accessible_roles(&self, role: RoleId) -> Result<Vec<RoleId>> {
        let graph = self.graph.read();
        let mut roles = ClosureResolver::new(&graph).descendants(role)?;
        roles.insert(role);
        Ok(roles.into_iter().collect())
    }

    /// Every role that inherits from `role`, directly or transitively, sorted
    pub fn ancestors(&self, role: RoleId) -> Result<Vec<RoleId>> {
        let graph = self.graph.read();
        Ok(ClosureResolver::new(&graph).ancestors(role)?.into_iter().collect())
    }

    /// Roles whose effective set changes if `role`'s grants change
    ///
    /// This is `role` plus its ancestors: everyone who would gain a permission
    /// granted to `role`.
    pub fn impacted_by(&self, role: RoleId) -> Result<Vec<RoleId>> {
        let graph = self.graph.read();
        Ok(ClosureResolver::new(&graph)
            .ancestors_or_self(role)?
            .into_iter()
            .collect())
    }

    /// Every role whose effective set contains the named permission, sorted
    pub fn roles_with_permission(&self, permission: &str) -> Result<Vec<RoleId>> {
        let graph = self.graph.read();
        let permission_id = graph.require_permission(permission)?;
        let resolver = ClosureResolver::new(&graph);

        let mut holders = BTreeSet::new();
        for role in graph.roles() {
            if holders.contains(&role.id) || !graph.direct_permissions(role.id).contains(&permission_id) {
                continue;
            }
            holders.extend(resolver.ancestors_or_self(role.id)?);
        }

        Ok(holders.into_iter().collect())
    }

    /// Whether `parent -> child` could be added without a cycle
    ///
    /// # Errors
    ///
    /// Returns `UnknownRole` if either role does not exist.
    pub fn can_add_edge(&self, parent: RoleId, child: RoleId) -> Result<bool> {
        let graph = self.graph.read();
        graph.require_role(parent)?;
        graph.require_role(child)?;
        Ok(CycleGuard::new(&graph).can_add_edge(parent, child))
    }

    /// Get a role by id
    pub fn role(&self, id: RoleId) -> Option<Role> {
        self.graph.read().role(id).cloned()
    }

    /// Get a role by name
    pub fn role_by_name(&self, name: &str) -> Option<Role> {
        self.graph.read().role_by_name(name).cloned()
    }

    /// All roles, sorted by id
    pub fn roles(&self) -> Vec<Role> {
        self.graph.read().roles().into_iter().cloned().collect()
    }

    /// Get a permission by name
    pub fn permission_by_name(&self, name: &str) -> Option<Permission> {
        let graph = self.graph.read();
        graph
            .permission_id(name)
            .and_then(|id| graph.permission(id).cloned())
    }

    /// All permissions, sorted by id
    pub fn permissions(&self) -> Vec<Permission> {
        self.graph.read().permissions().into_iter().cloned().collect()
    }

    /// Direct permission names of a role, sorted
    pub fn direct_permission_names(&self, role: RoleId) -> Result<Vec<String>> {
        let graph = self.graph.read();
        graph.require_role(role)?;
        Ok(permission_names(&graph, graph.direct_permissions(role).iter().copied()))
    }

    /// Roles that grant the named permission directly, sorted
    pub fn direct_holders(&self, permission: &str) -> Result<Vec<RoleId>> {
        let graph = self.graph.read();
        let permission_id = graph.require_permission(permission)?;
        Ok(graph
            .roles()
            .into_iter()
            .filter(|role| graph.direct_permissions(role.id).contains(&permission_id))
            .map(|role| role.id)
            .collect())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a role
    ///
    /// # Errors
    ///
    /// `DuplicateRole` if the id or name exists, `Core` if the name is invalid.
    pub fn add_role(&self, role: Role) -> Result<()> {
        let mut graph = self.graph.write();
        let id = role.id;
        graph.add_role(role)?;

        // a previously removed role with the same id may still be cached
        self.cache.invalidate([id]);
        info!("Added role {}", id);
        Ok(())
    }

    /// Remove a role, its grants and its outgoing edges
    ///
    /// # Errors
    ///
    /// `UnknownRole` if absent, `ProtectedRole` if the role is undeletable,
    /// `RoleInUse` if other roles inherit from it.
    pub fn remove_role(&self, id: RoleId) -> Result<Role> {
        self.remove_role_inner(id, true)
    }

    /// [`Self::remove_role`] without the protected-role check, for undoing an add
    pub(crate) fn remove_role_unguarded(&self, id: RoleId) -> Result<Role> {
        self.remove_role_inner(id, false)
    }

    fn remove_role_inner(&self, id: RoleId, guarded: bool) -> Result<Role> {
        let mut graph = self.graph.write();
        if guarded {
            let name = &graph.require_role(id)?.name;
            if self.protected.is_undeletable(name) {
                return Err(protected(id, name, "removal"));
            }
        }
        let role = graph.remove_role(id)?;

        // no role inherits from it, so it is its own only ancestor-or-self
        self.cache.invalidate([id]);
        info!("Removed role {} ({})", id, role.name);
        Ok(role)
    }

    /// Add a permission
    pub fn add_permission(&self, permission: Permission) -> Result<()> {
        let mut graph = self.graph.write();
        let name = permission.name.clone();
        graph.add_permission(permission)?;
        info!("Added permission {}", name);
        Ok(())
    }

    /// Remove a permission and every grant of it
    pub fn remove_permission(&self, name: &str) -> Result<Permission> {
        let mut graph = self.graph.write();
        let (permission, holders) = graph.remove_permission(name)?;

        let resolver = ClosureResolver::new(&graph);
        let mut affected = BTreeSet::new();
        for holder in holders {
            affected.extend(resolver.ancestors_or_self(holder)?);
        }
        let invalidated = self.cache.invalidate(affected);

        info!("Removed permission {} ({} cached closures invalidated)", name, invalidated);
        Ok(permission)
    }

    /// Directly grant a permission to a role
    ///
    /// Idempotent: returns `false` if the grant already existed.
    pub fn grant_permission(&self, role: RoleId, permission: &str) -> Result<bool> {
        let mut graph = self.graph.write();
        graph.require_role(role)?;
        let permission_id = graph.require_permission(permission)?;

        let granted = graph.grant_permission(role, permission_id)?;
        if granted {
            let invalidated = self.invalidate_from(&graph, role)?;
            info!("Granted {} to {} ({} cached closures invalidated)", permission, role, invalidated);
        }
        Ok(granted)
    }

    /// Revoke a direct grant
    ///
    /// Idempotent: returns `false` if the grant was absent.
    pub fn revoke_permission(&self, role: RoleId, permission: &str) -> Result<bool> {
        let mut graph = self.graph.write();
        graph.require_role(role)?;
        let permission_id = graph.require_permission(permission)?;

        let revoked = graph.revoke_permission(role, permission_id)?;
        if revoked {
            let invalidated = self.invalidate_from(&graph, role)?;
            info!("Revoked {} from {} ({} cached closures invalidated)", permission, role, invalidated);
        }
        Ok(revoked)
    }

    /// Replace a role's direct permissions
    ///
    /// All names are validated before anything changes.
    ///
    /// # Errors
    ///
    /// `UnknownRole`, or `UnknownPermission` naming the first unknown entry.
    pub fn set_role_permissions<S: AsRef<str>>(&self, role: RoleId, permissions: &[S]) -> Result<PermissionDiff> {
        let mut graph = self.graph.write();
        graph.require_role(role)?;

        let mut granted = PermissionSet::new();
        for name in permissions {
            granted.insert(graph.require_permission(name.as_ref())?);
        }

        let previous = graph.replace_grants(role, granted.clone())?;
        let diff = PermissionDiff {
            added: permission_names(&graph, granted.difference(&previous).copied()),
            removed: permission_names(&graph, previous.difference(&granted).copied()),
        };

        if !diff.is_empty() {
            self.invalidate_from(&graph, role)?;
            info!(
                "Updated permissions for {}: {} added, {} removed",
                role,
                diff.added.len(),
                diff.removed.len()
            );
        }
        Ok(diff)
    }

    /// Add the hierarchy edge `parent -> child` (parent inherits from child)
    ///
    /// Returns `false` if the edge already existed.
    ///
    /// # Errors
    ///
    /// `UnknownRole`, `ProtectedRole` if `parent` has fixed inheritance, or
    /// `CycleViolation` if `child` can already reach `parent`. A rejected edge
    /// leaves the graph unchanged.
    pub fn add_hierarchy_edge(&self, parent: RoleId, child: RoleId) -> Result<bool> {
        let mut graph = self.graph.write();
        self.check_inheritance_change(&graph, parent)?;
        let inserted = add_edge_or_fail(&mut graph, parent, child)?;

        if inserted {
            let invalidated = self.invalidate_from(&graph, parent)?;
            info!("Added edge {} -> {} ({} cached closures invalidated)", parent, child, invalidated);
        }
        Ok(inserted)
    }

    /// Remove the hierarchy edge `parent -> child`
    ///
    /// Returns `false` if the edge was absent.
    pub fn remove_hierarchy_edge(&self, parent: RoleId, child: RoleId) -> Result<bool> {
        let mut graph = self.graph.write();
        self.check_inheritance_change(&graph, parent)?;
        let removed = graph.remove_edge(parent, child)?;

        if removed {
            let invalidated = self.invalidate_from(&graph, parent)?;
            info!("Removed edge {} -> {} ({} cached closures invalidated)", parent, child, invalidated);
        }
        Ok(removed)
    }

    /// Replace every role `role` directly inherits from
    ///
    /// Each new edge is checked against the graph without `role`'s old edges.
    /// On any violation the previous edges are restored and the error returned.
    /// Returns the previous children, sorted.
    ///
    /// # Errors
    ///
    /// `UnknownRole`, `ProtectedRole` if `role` has fixed inheritance, or
    /// `CycleViolation`.
    pub fn set_inheritance(&self, role: RoleId, children: &[RoleId]) -> Result<Vec<RoleId>> {
        self.set_inheritance_inner(role, children, true)
    }

    /// [`Self::set_inheritance`] without the protected-role check, for undoing a removal
    pub(crate) fn restore_inheritance(&self, role: RoleId, children: &[RoleId]) -> Result<Vec<RoleId>> {
        self.set_inheritance_inner(role, children, false)
    }

    fn set_inheritance_inner(&self, role: RoleId, children: &[RoleId], guarded: bool) -> Result<Vec<RoleId>> {
        let mut graph = self.graph.write();
        if guarded {
            self.check_inheritance_change(&graph, role)?;
        } else {
            graph.require_role(role)?;
        }
        for child in children {
            graph.require_role(*child)?;
        }

        let previous = sorted(graph.children(role));
        for child in &previous {
            graph.unlink_edge(role, *child);
        }

        let mut inserted = Vec::new();
        for child in children {
            match add_edge_or_fail(&mut graph, role, *child) {
                Ok(true) => inserted.push(*child),
                Ok(false) => {}
                Err(err) => {
                    for child in &inserted {
                        graph.unlink_edge(role, *child);
                    }
                    for child in &previous {
                        graph.insert_edge(role, *child);
                    }
                    return Err(err);
                }
            }
        }

        let invalidated = self.invalidate_from(&graph, role)?;
        info!(
            "Replaced inheritance of {}: {} -> {} children ({} cached closures invalidated)",
            role,
            previous.len(),
            inserted.len(),
            invalidated
        );
        Ok(previous)
    }

    fn check_inheritance_change(&self, graph: &GraphStore, role: RoleId) -> Result<()> {
        let name = &graph.require_role(role)?.name;
        if self.protected.has_fixed_inheritance(name) {
            return Err(protected(role, name, "inheritance changes"));
        }
        Ok(())
    }

    fn invalidate_from(&self, graph: &GraphStore, role: RoleId) -> Result<usize> {
        let affected = ClosureResolver::new(graph).ancestors_or_self(role)?;
        Ok(self.cache.invalidate(affected))
    }

    // ========================================================================
    // Cache
    // ========================================================================

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached closure
    pub fn clear_cache(&self) {
        // exclusive lock so no reader is mid-resolution while stats reset
        let _graph = self.graph.write();
        self.cache.clear();
    }
}

impl Default for RbacEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn protected(role: RoleId, name: &str, operation: &'static str) -> AuthzError {
    AuthzError::ProtectedRole {
        role,
        name: name.to_string(),
        operation,
    }
}

fn sorted<I: Iterator<Item = RoleId>>(roles: I) -> Vec<RoleId> {
    let mut roles: Vec<RoleId> = roles.collect();
    roles.sort();
    roles
}

fn permission_names<I: Iterator<Item = PermissionId>>(graph: &GraphStore, ids: I) -> Vec<String> {
    let mut names: Vec<String> = ids
        .filter_map(|id| graph.permission(id).map(|p| p.name.clone()))
        .collect();
    names.sort();
    names
}
