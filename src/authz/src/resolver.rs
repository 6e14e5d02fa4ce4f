//! Closure resolver
//!
//! Computes the effective permission set of a role: its direct grants united
//! with the direct grants of every role reachable through hierarchy edges.
//!
//! # Algorithm
//!
//! Iterative worklist with a visited set:
//! 1. Push the starting role
//! 2. Pop a role; skip it if already expanded
//! 3. Otherwise mark it expanded, union its direct grants, push its children
//! 4. Stop when the worklist is empty
//!
//! Every role is expanded at most once, so resolution is O(V + E) regardless
//! of how many distinct paths reach a shared descendant.

use crate::error::Result;
use crate::graph::{GraphStore, PermissionSet};
use rolegraph_core::{PermissionId, RoleId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Counters collected during one resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Total role expansions
    pub expansions: usize,

    /// Hierarchy edges followed
    pub edges_followed: usize,

    /// Expansions per role; every value is 1 for a correct resolution
    pub expansions_per_role: HashMap<RoleId, usize>,
}

impl ResolutionStats {
    /// Expansion count for a single role
    pub fn expansions_of(&self, role: RoleId) -> usize {
        self.expansions_per_role.get(&role).copied().unwrap_or(0)
    }
}

/// Resolves effective permission sets against a [`GraphStore`]
pub struct ClosureResolver<'a> {
    store: &'a GraphStore,
}

impl<'a> ClosureResolver<'a> {
    /// Create a resolver over the given store
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Effective permissions of `role`
    ///
    /// # Errors
    ///
    /// Returns `UnknownRole` if the role does not exist.
    pub fn resolve(&self, role: RoleId) -> Result<PermissionSet> {
        self.resolve_counted(role).map(|(permissions, _)| permissions)
    }

    /// Effective permissions of `role` together with expansion counters
    pub fn resolve_with_stats(&self, role: RoleId) -> Result<(PermissionSet, ResolutionStats)> {
        self.expand(role, true)
    }

    /// Like [`Self::resolve_with_stats`] but leaves `expansions_per_role` empty
    pub(crate) fn resolve_counted(&self, role: RoleId) -> Result<(PermissionSet, ResolutionStats)> {
        self.expand(role, false)
    }

    fn expand(&self, role: RoleId, per_role: bool) -> Result<(PermissionSet, ResolutionStats)> {
        self.store.require_role(role)?;

        let mut stats = ResolutionStats::default();
        let mut result = PermissionSet::new();
        let mut visited: HashSet<RoleId> = HashSet::new();
        let mut worklist = vec![role];

        while let Some(current) = worklist.pop() {
            if !visited.insert(current) {
                continue;
            }

            stats.expansions += 1;
            if per_role {
                *stats.expansions_per_role.entry(current).or_insert(0) += 1;
            }

            result.extend(self.store.direct_permissions(current).iter().copied());

            for child in self.store.children(current) {
                stats.edges_followed += 1;
                if !visited.contains(&child) {
                    worklist.push(child);
                }
            }
        }

        Ok((result, stats))
    }

    /// Whether `role` holds `permission`, stopping at the first granting role
    pub fn holds(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        self.store.require_role(role)?;

        let mut visited: HashSet<RoleId> = HashSet::new();
        let mut worklist = vec![role];

        while let Some(current) = worklist.pop() {
            if !visited.insert(current) {
                continue;
            }
            if self.store.direct_permissions(current).contains(&permission) {
                return Ok(true);
            }
            worklist.extend(self.store.children(current).filter(|c| !visited.contains(c)));
        }

        Ok(false)
    }

    /// Every role reachable from `role` by following edges forward (excluding `role`)
    pub fn descendants(&self, role: RoleId) -> Result<BTreeSet<RoleId>> {
        self.store.require_role(role)?;
        Ok(self.walk(role, |store, r| store.children(r).collect()))
    }

    /// Every role that can reach `role` (excluding `role`)
    pub fn ancestors(&self, role: RoleId) -> Result<BTreeSet<RoleId>> {
        self.store.require_role(role)?;
        Ok(self.walk(role, |store, r| store.parents(r).collect()))
    }

    /// `role` plus all of its ancestors; the set whose cached closures a
    /// mutation at `role` can change
    pub fn ancestors_or_self(&self, role: RoleId) -> Result<BTreeSet<RoleId>> {
        let mut affected = self.ancestors(role)?;
        affected.insert(role);
        Ok(affected)
    }

    fn walk<F>(&self, start: RoleId, next: F) -> BTreeSet<RoleId>
    where
        F: Fn(&GraphStore, RoleId) -> Vec<RoleId>,
    {
        let mut seen = BTreeSet::new();
        let mut worklist = vec![start];

        while let Some(current) = worklist.pop() {
            for neighbor in next(self.store, current) {
                if neighbor != start && seen.insert(neighbor) {
                    worklist.push(neighbor);
                }
            }
        }

        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::add_edge_or_fail;
    use rolegraph_core::{Permission, Role};

    fn role(id: u64) -> RoleId {
        RoleId::new(id)
    }

    fn build(roles: &[(u64, &str)], edges: &[(u64, u64)]) -> GraphStore {
        let mut store = GraphStore::new();
        for (id, name) in roles {
            store.add_role(Role::new(*id, *name)).unwrap();
        }
        for (parent, child) in edges {
            add_edge_or_fail(&mut store, role(*parent), role(*child)).unwrap();
        }
        store
    }

    #[test]
    fn test_isolated_role_resolves_empty() {
        let store = build(&[(1, "loner")], &[]);
        let permissions = ClosureResolver::new(&store).resolve(role(1)).unwrap();
        assert!(permissions.is_empty());
    }

    #[test]
    fn test_unknown_role() {
        let store = GraphStore::new();
        let result = ClosureResolver::new(&store).resolve(role(1));
        assert!(matches!(result, Err(crate::AuthzError::UnknownRole(_))));
    }

    #[test]
    fn test_chain_inherits_transitively() {
        let mut store = build(
            &[(1, "super_admin"), (2, "league_admin"), (3, "pod_admin")],
            &[(1, 2), (2, 3)],
        );
        store.add_permission(Permission::new(18, "pod_read")).unwrap();
        store.grant_permission(role(3), PermissionId::new(18)).unwrap();

        let permissions = ClosureResolver::new(&store).resolve(role(1)).unwrap();
        assert!(permissions.contains(&PermissionId::new(18)));
    }

    #[test]
    fn test_diamond_expands_shared_role_once() {
        // a -> b, a -> c, b -> d, c -> d
        let mut store = build(
            &[(1, "a"), (2, "b"), (3, "c"), (4, "d")],
            &[(1, 2), (1, 3), (2, 4), (3, 4)],
        );
        store.add_permission(Permission::new(1, "shared")).unwrap();
        store.grant_permission(role(4), PermissionId::new(1)).unwrap();

        let (permissions, stats) = ClosureResolver::new(&store)
            .resolve_with_stats(role(1))
            .unwrap();

        assert_eq!(permissions.len(), 1);
        assert_eq!(stats.expansions_of(role(4)), 1);
        assert_eq!(stats.expansions, 4);
        assert_eq!(stats.edges_followed, 4);
    }

    #[test]
    fn test_counted_resolution_skips_per_role_map() {
        let mut store = build(
            &[(1, "a"), (2, "b"), (3, "c"), (4, "d")],
            &[(1, 2), (1, 3), (2, 4), (3, 4)],
        );
        store.add_permission(Permission::new(1, "shared")).unwrap();
        store.grant_permission(role(4), PermissionId::new(1)).unwrap();

        let resolver = ClosureResolver::new(&store);
        let (counted, totals) = resolver.resolve_counted(role(1)).unwrap();
        let (full, stats) = resolver.resolve_with_stats(role(1)).unwrap();

        assert_eq!(counted, full);
        assert_eq!(totals.expansions, stats.expansions);
        assert_eq!(totals.edges_followed, stats.edges_followed);
        assert!(totals.expansions_per_role.is_empty());
        assert_eq!(stats.expansions_per_role.len(), 4);
    }

    #[test]
    fn test_holds_short_circuits() {
        let mut store = build(&[(1, "a"), (2, "b")], &[(1, 2)]);
        store.add_permission(Permission::new(1, "p")).unwrap();
        store.add_permission(Permission::new(2, "q")).unwrap();
        store.grant_permission(role(2), PermissionId::new(1)).unwrap();

        let resolver = ClosureResolver::new(&store);
        assert!(resolver.holds(role(1), PermissionId::new(1)).unwrap());
        assert!(!resolver.holds(role(1), PermissionId::new(2)).unwrap());
        assert!(!resolver.holds(role(2), PermissionId::new(2)).unwrap());
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let store = build(
            &[(1, "super_admin"), (2, "league_admin"), (4, "user_admin"), (5, "user")],
            &[(1, 2), (1, 4), (2, 5), (4, 5)],
        );
        let resolver = ClosureResolver::new(&store);

        let ancestors = resolver.ancestors(role(5)).unwrap();
        assert_eq!(ancestors.into_iter().collect::<Vec<_>>(), vec![role(1), role(2), role(4)]);

        let descendants = resolver.descendants(role(1)).unwrap();
        assert_eq!(descendants.into_iter().collect::<Vec<_>>(), vec![role(2), role(4), role(5)]);

        let affected = resolver.ancestors_or_self(role(2)).unwrap();
        assert_eq!(affected.into_iter().collect::<Vec<_>>(), vec![role(1), role(2)]);
    }
}
