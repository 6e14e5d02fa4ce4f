//! Administrative views over the role graph
//!
//! Read-only reports for operators: where each effective permission comes
//! from, the full role × permission matrix, and the inheritance forest.

use super::RbacEngine;
use crate::error::Result;
use crate::graph::GraphStore;
use rolegraph_core::{Permission, PermissionId, Role, RoleId};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Direct and inherited permissions of one role
#[derive(Debug, Clone, Serialize)]
pub struct RolePermissionDetail {
    pub role: Role,

    /// Permissions granted to the role itself
    pub direct: Vec<Permission>,

    /// Permissions reached only through inheritance
    pub inherited: Vec<InheritedPermission>,

    /// Every role inherited from, nearest first
    pub inherited_roles: Vec<RoleId>,
}

/// A permission reached through inheritance
#[derive(Debug, Clone, Serialize)]
pub struct InheritedPermission {
    pub permission: Permission,

    /// Nearest role that grants it directly
    pub source_role: RoleId,
    pub source_role_name: String,
}

/// Effective permissions of every role
#[derive(Debug, Clone, Serialize)]
pub struct PermissionMatrix {
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub rows: Vec<MatrixRow>,
}

impl PermissionMatrix {
    /// Look up the cell for a role/permission pair
    pub fn cell(&self, role: RoleId, permission: PermissionId) -> Option<&MatrixCell> {
        self.rows
            .iter()
            .find(|row| row.role == role)
            .and_then(|row| row.cells.get(&permission))
    }
}

/// One role's line in the matrix
#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub role: RoleId,
    pub inherited_roles: Vec<RoleId>,

    /// Only permissions the role holds
    pub cells: BTreeMap<PermissionId, MatrixCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatrixCell {
    pub direct: bool,
    pub source_role: RoleId,
}

/// One occurrence of a role in the inheritance forest
///
/// The forest is a flat list in depth-first order, so depth never costs
/// stack: each node names the role it is listed under instead of nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    pub id: RoleId,
    pub name: String,

    /// Role this occurrence is listed under; `None` for roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<RoleId>,

    /// Zero for roots
    pub depth: usize,

    /// Subtree already listed earlier in the forest; children omitted
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub collapsed: bool,
}

impl RbacEngine {
    /// Break down where each of a role's effective permissions comes from
    ///
    /// An inherited permission is attributed to the nearest granting role by
    /// inheritance depth, ties broken by the smaller role id.
    pub fn role_permission_detail(&self, role: RoleId) -> Result<RolePermissionDetail> {
        let graph = self.graph.read();
        let record = graph.require_role(role)?.clone();
        let (sources, inherited_roles) = nearest_sources(&graph, role);

        let direct = graph
            .direct_permissions(role)
            .iter()
            .filter_map(|id| graph.permission(*id).cloned())
            .collect();

        let inherited = sources
            .into_iter()
            .filter_map(|(permission, source)| {
                let permission = graph.permission(permission)?.clone();
                let source_role_name = graph.role(source)?.name.clone();
                Some(InheritedPermission {
                    permission,
                    source_role: source,
                    source_role_name,
                })
            })
            .collect();

        Ok(RolePermissionDetail {
            role: record,
            direct,
            inherited,
            inherited_roles,
        })
    }

    /// Build the role × permission matrix
    pub fn permission_matrix(&self) -> PermissionMatrix {
        let graph = self.graph.read();

        let rows = graph
            .roles()
            .into_iter()
            .map(|role| {
                let (sources, mut inherited_roles) = nearest_sources(&graph, role.id);
                inherited_roles.sort();

                let mut cells: BTreeMap<PermissionId, MatrixCell> = sources
                    .into_iter()
                    .map(|(permission, source)| {
                        (
                            permission,
                            MatrixCell {
                                direct: false,
                                source_role: source,
                            },
                        )
                    })
                    .collect();
                for permission in graph.direct_permissions(role.id) {
                    cells.insert(
                        *permission,
                        MatrixCell {
                            direct: true,
                            source_role: role.id,
                        },
                    );
                }

                MatrixRow {
                    role: role.id,
                    inherited_roles,
                    cells,
                }
            })
            .collect();

        PermissionMatrix {
            roles: graph.roles().into_iter().cloned().collect(),
            permissions: graph.permissions().into_iter().cloned().collect(),
            rows,
        }
    }

    /// Inheritance forest rooted at roles nobody inherits from, flattened
    ///
    /// Nodes come in depth-first pre-order, roots and siblings by ascending
    /// id. Roles with neither parents nor children are left out. A role
    /// reachable along several paths is expanded at its first occurrence only;
    /// later occurrences are `collapsed`, which keeps the output linear in the
    /// graph.
    pub fn hierarchy_tree(&self) -> Vec<HierarchyNode> {
        let graph = self.graph.read();
        let mut expanded = HashSet::new();
        let mut nodes = Vec::new();

        for role in graph.roles() {
            if graph.parents(role.id).next().is_none() && graph.children(role.id).next().is_some() {
                push_subtree(&graph, role.id, &mut expanded, &mut nodes);
            }
        }

        nodes
    }
}

/// Level-by-level walk from `role` recording, for each permission `role` does
/// not hold directly, the first role that grants it. Returns the sources and
/// the inherited roles in visit order.
fn nearest_sources(graph: &GraphStore, role: RoleId) -> (BTreeMap<PermissionId, RoleId>, Vec<RoleId>) {
    let direct = graph.direct_permissions(role);
    let mut sources = BTreeMap::new();
    let mut visited = HashSet::from([role]);
    let mut visit_order = Vec::new();
    let mut frontier = vec![role];

    while !frontier.is_empty() {
        let mut next: Vec<RoleId> = Vec::new();
        for current in &frontier {
            for child in graph.children(*current) {
                if visited.insert(child) {
                    next.push(child);
                }
            }
        }
        next.sort();

        for current in &next {
            for permission in graph.direct_permissions(*current) {
                if !direct.contains(permission) {
                    sources.entry(*permission).or_insert(*current);
                }
            }
        }

        visit_order.extend(next.iter().copied());
        frontier = next;
    }

    (sources, visit_order)
}

/// Append the subtree under `root` in pre-order, using an explicit stack
fn push_subtree(
    graph: &GraphStore,
    root: RoleId,
    expanded: &mut HashSet<RoleId>,
    nodes: &mut Vec<HierarchyNode>,
) {
    let mut stack = vec![(root, None, 0)];

    while let Some((id, parent, depth)) = stack.pop() {
        let collapsed = !expanded.insert(id);
        if !collapsed {
            let mut children: Vec<RoleId> = graph.children(id).collect();
            // reversed so the smallest id is popped first
            children.sort_unstable_by(|a, b| b.cmp(a));
            stack.extend(children.into_iter().map(|child| (child, Some(id), depth + 1)));
        }

        nodes.push(HierarchyNode {
            id,
            name: graph.role(id).map(|r| r.name.clone()).unwrap_or_default(),
            parent,
            depth,
            collapsed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: u64) -> RoleId {
        RoleId::new(id)
    }

    /// super_admin -> {league_admin, user_admin}, both -> user
    fn diamond_engine() -> RbacEngine {
        let engine = RbacEngine::new();
        for (id, name) in [(1, "super_admin"), (2, "league_admin"), (4, "user_admin"), (5, "user"), (9, "guest")] {
            engine.add_role(Role::new(id, name)).unwrap();
        }
        for (parent, child) in [(1, 2), (1, 4), (2, 5), (4, 5)] {
            engine.add_hierarchy_edge(role(parent), role(child)).unwrap();
        }
        for (id, name) in [(6, "league_read"), (10, "league_edit"), (20, "user_edit")] {
            engine.add_permission(Permission::new(id, name)).unwrap();
        }
        engine.grant_permission(role(5), "league_read").unwrap();
        engine.grant_permission(role(2), "league_edit").unwrap();
        engine.grant_permission(role(4), "user_edit").unwrap();
        engine.grant_permission(role(4), "league_read").unwrap();
        engine
    }

    #[test]
    fn test_detail_attributes_nearest_source() {
        let engine = diamond_engine();
        let detail = engine.role_permission_detail(role(1)).unwrap();

        assert!(detail.direct.is_empty());
        assert_eq!(detail.inherited_roles, vec![role(2), role(4), role(5)]);

        let sources: Vec<(String, RoleId)> = detail
            .inherited
            .iter()
            .map(|p| (p.permission.name.clone(), p.source_role))
            .collect();
        // league_read is granted by user_admin at depth 1, before user at depth 2
        assert_eq!(
            sources,
            vec![
                ("league_read".to_string(), role(4)),
                ("league_edit".to_string(), role(2)),
                ("user_edit".to_string(), role(4)),
            ]
        );
    }

    #[test]
    fn test_detail_skips_directly_held() {
        let engine = diamond_engine();
        let detail = engine.role_permission_detail(role(4)).unwrap();

        assert_eq!(detail.direct.len(), 2);
        assert!(detail.inherited.is_empty());
        assert_eq!(detail.inherited_roles, vec![role(5)]);
    }

    #[test]
    fn test_matrix_marks_direct_and_inherited() {
        let engine = diamond_engine();
        let matrix = engine.permission_matrix();

        assert_eq!(matrix.rows.len(), 5);
        assert_eq!(
            matrix.cell(role(4), PermissionId::new(6)),
            Some(&MatrixCell { direct: true, source_role: role(4) })
        );
        assert_eq!(
            matrix.cell(role(2), PermissionId::new(6)),
            Some(&MatrixCell { direct: false, source_role: role(5) })
        );
        assert!(matrix.cell(role(9), PermissionId::new(6)).is_none());
    }

    #[test]
    fn test_tree_collapses_shared_roles() {
        let engine = diamond_engine();
        let tree = engine.hierarchy_tree();

        // guest is isolated and left out
        let order: Vec<(RoleId, Option<RoleId>, usize, bool)> = tree
            .iter()
            .map(|node| (node.id, node.parent, node.depth, node.collapsed))
            .collect();
        assert_eq!(
            order,
            vec![
                (role(1), None, 0, false),
                (role(2), Some(role(1)), 1, false),
                (role(5), Some(role(2)), 2, false),
                (role(4), Some(role(1)), 1, false),
                (role(5), Some(role(4)), 2, true),
            ]
        );
        assert_eq!(tree[0].name, "super_admin");
    }
}
