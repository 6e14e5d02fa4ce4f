//! Cycle guard for hierarchy mutations
//!
//! Adding `parent -> child` is only allowed when `child` cannot already reach
//! `parent`. Reachability is a breadth-first search with a visited set, so each
//! role is enqueued at most once no matter how many paths lead to it. Dense
//! diamond-shaped hierarchies cost the same as a tree with the same edge count.

use super::store::GraphStore;
use crate::error::{AuthzError, Result};
use rolegraph_core::RoleId;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Read-only view of the store used to vet hierarchy edges
pub struct CycleGuard<'a> {
    store: &'a GraphStore,
}

impl<'a> CycleGuard<'a> {
    /// Create a guard over the given store
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Whether `parent -> child` can be added without creating a cycle
    ///
    /// Unknown roles and self-edges are never addable.
    pub fn can_add_edge(&self, parent: RoleId, child: RoleId) -> bool {
        self.check(parent, child).is_ok()
    }

    /// Validate `parent -> child`
    ///
    /// # Errors
    ///
    /// - `UnknownRole` if either endpoint is missing
    /// - `CycleViolation` with a witness path `parent -> child -> ... -> parent`
    pub fn check(&self, parent: RoleId, child: RoleId) -> Result<()> {
        self.store.require_role(parent)?;
        self.store.require_role(child)?;

        if parent == child {
            return Err(AuthzError::CycleViolation {
                parent,
                child,
                path: vec![parent, parent],
            });
        }

        if let Some(back) = self.find_path(child, parent) {
            let mut path = Vec::with_capacity(back.len() + 1);
            path.push(parent);
            path.extend(back);

            debug!("Rejected edge {} -> {}: cycle of length {}", parent, child, path.len() - 1);
            return Err(AuthzError::CycleViolation {
                parent,
                child,
                path,
            });
        }

        Ok(())
    }

    /// Find one path `from -> ... -> to` following hierarchy edges forward
    ///
    /// Returns `None` if `to` is unreachable. The path includes both endpoints.
    pub fn find_path(&self, from: RoleId, to: RoleId) -> Option<Vec<RoleId>> {
        if from == to {
            return Some(vec![from]);
        }

        // predecessor map doubles as the visited set
        let mut predecessor: HashMap<RoleId, RoleId> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        predecessor.insert(from, from);

        while let Some(current) = queue.pop_front() {
            for next in self.store.children(current) {
                if predecessor.contains_key(&next) {
                    continue;
                }
                predecessor.insert(next, current);

                if next == to {
                    return Some(Self::unwind(&predecessor, from, to));
                }
                queue.push_back(next);
            }
        }

        None
    }

    fn unwind(predecessor: &HashMap<RoleId, RoleId>, from: RoleId, to: RoleId) -> Vec<RoleId> {
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            match predecessor.get(&current) {
                Some(&prev) => {
                    path.push(prev);
                    current = prev;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

/// Validate and insert `parent -> child`
///
/// Returns `false` when the edge already existed. On any error the store is
/// left untouched.
pub fn add_edge_or_fail(store: &mut GraphStore, parent: RoleId, child: RoleId) -> Result<bool> {
    if store.contains_edge(parent, child) {
        return Ok(false);
    }

    CycleGuard::new(store).check(parent, child)?;
    Ok(store.insert_edge(parent, child))
}
