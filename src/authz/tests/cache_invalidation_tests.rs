//! Resolution cache behavior through the engine
//!
//! Hits, misses, targeted invalidation on every mutation kind, and the
//! capacity limit.

use rolegraph_authz::{CacheConfig, RbacEngine};
use rolegraph_core::{Permission, Role, RoleId};

fn role(id: u64) -> RoleId {
    RoleId::new(id)
}

/// Two independent branches under one root:
/// root(1) -> left(2) -> left_leaf(3), root(1) -> right(4) -> right_leaf(5)
fn forked(cache: CacheConfig) -> RbacEngine {
    let engine = RbacEngine::with_config(cache);
    for (id, name) in [(1, "root"), (2, "left"), (3, "left_leaf"), (4, "right"), (5, "right_leaf")] {
        engine.add_role(Role::new(id, name)).unwrap();
    }
    for (parent, child) in [(1, 2), (2, 3), (1, 4), (4, 5)] {
        engine.add_hierarchy_edge(role(parent), role(child)).unwrap();
    }
    for (id, name) in [(1, "read"), (2, "write")] {
        engine.add_permission(Permission::new(id, name)).unwrap();
    }
    engine.grant_permission(role(3), "read").unwrap();
    engine
}

fn warm(engine: &RbacEngine) {
    for id in 1..=5 {
        engine.effective_permissions(role(id)).unwrap();
    }
}

// ============================================================================
// BASIC CACHE OPERATIONS
// ============================================================================

#[test]
fn test_second_lookup_is_a_hit() {
    let engine = forked(CacheConfig::default());

    let first = engine.effective_permissions(role(1)).unwrap();
    let second = engine.effective_permissions(role(1)).unwrap();

    assert_eq!(first, second);
    let stats = engine.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn test_unknown_role_is_not_cached() {
    let engine = forked(CacheConfig::default());
    assert!(engine.effective_permissions(role(99)).is_err());
    assert_eq!(engine.cache_stats().entries, 0);
}

// ============================================================================
// TARGETED INVALIDATION
// ============================================================================

#[test]
fn test_grant_invalidates_only_ancestors_or_self() {
    let engine = forked(CacheConfig::default());
    warm(&engine);

    engine.grant_permission(role(5), "write").unwrap();

    // right_leaf, right and root dropped; the left branch is untouched
    let stats = engine.cache_stats();
    assert_eq!(stats.invalidations, 3);
    assert_eq!(stats.entries, 2);

    assert!(engine.has_permission(role(1), "write").unwrap());
    assert!(!engine.has_permission(role(2), "write").unwrap());
}

#[test]
fn test_idempotent_grant_invalidates_nothing() {
    let engine = forked(CacheConfig::default());
    warm(&engine);

    assert!(!engine.grant_permission(role(3), "read").unwrap());
    assert_eq!(engine.cache_stats().entries, 5);
}

#[test]
fn test_edge_changes_invalidate_parent_side() {
    let engine = forked(CacheConfig::default());
    warm(&engine);

    engine.add_hierarchy_edge(role(4), role(3)).unwrap();
    assert!(engine.has_permission(role(4), "read").unwrap());
    // left branch entries survived
    assert_eq!(
        engine.effective_permissions(role(2)).unwrap().len(),
        1
    );

    engine.remove_hierarchy_edge(role(4), role(3)).unwrap();
    assert!(!engine.has_permission(role(4), "read").unwrap());
    assert!(engine.has_permission(role(1), "read").unwrap());
}

#[test]
fn test_remove_permission_invalidates_every_holder_chain() {
    let engine = forked(CacheConfig::default());
    engine.grant_permission(role(5), "read").unwrap();
    warm(&engine);

    engine.remove_permission("read").unwrap();

    for id in 1..=5 {
        assert!(engine.effective_permissions(role(id)).unwrap().is_empty());
    }
}

#[test]
fn test_set_inheritance_invalidates() {
    let engine = forked(CacheConfig::default());
    warm(&engine);

    engine.set_inheritance(role(1), &[role(4)]).unwrap();
    assert!(!engine.has_permission(role(1), "read").unwrap());
    assert!(engine.has_permission(role(2), "read").unwrap());
}

#[test]
fn test_remove_and_readd_role_with_same_id() {
    let engine = forked(CacheConfig::default());
    engine.remove_hierarchy_edge(role(2), role(3)).unwrap();
    engine.effective_permissions(role(3)).unwrap();

    engine.remove_role(role(3)).unwrap();
    engine.add_role(Role::new(3, "fresh_leaf")).unwrap();

    assert!(engine.effective_permissions(role(3)).unwrap().is_empty());
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_capacity_limit_still_serves_results() {
    let engine = forked(CacheConfig {
        enabled: true,
        capacity: 2,
    });
    warm(&engine);

    let stats = engine.cache_stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.rejected, 3);

    // uncached roles still resolve correctly
    assert!(engine.has_permission(role(1), "read").unwrap());
}

#[test]
fn test_disabled_cache_resolves_every_time() {
    let engine = forked(CacheConfig {
        enabled: false,
        capacity: 0,
    });
    warm(&engine);

    assert_eq!(engine.cache_stats().entries, 0);
    assert!(engine.has_permission(role(1), "read").unwrap());
    assert!(!engine.has_permission(role(1), "write").unwrap());
}

#[test]
fn test_clear_cache() {
    let engine = forked(CacheConfig::default());
    warm(&engine);

    engine.clear_cache();
    let stats = engine.cache_stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.hits, 0);

    assert!(engine.has_permission(role(1), "read").unwrap());
}
