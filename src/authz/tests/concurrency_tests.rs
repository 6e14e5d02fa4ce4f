//! Concurrent access tests
//!
//! Readers run in parallel with a writer that toggles hierarchy edges and
//! grants. Every read must observe either the state before or after a
//! mutation, never a stale cached closure.

use rolegraph_authz::{AuthzError, RbacEngine};
use rolegraph_core::{Permission, PermissionId, Role, RoleId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn role(id: u64) -> RoleId {
    RoleId::new(id)
}

fn chain(len: u64) -> RbacEngine {
    let engine = RbacEngine::new();
    for id in 0..len {
        engine.add_role(Role::new(id, format!("level_{}", id))).unwrap();
    }
    for id in 0..len - 1 {
        engine.add_hierarchy_edge(role(id), role(id + 1)).unwrap();
    }
    engine.add_permission(Permission::new(1, "read")).unwrap();
    engine.add_permission(Permission::new(2, "write")).unwrap();
    engine.grant_permission(role(len - 1), "read").unwrap();
    engine
}

#[test]
fn test_readers_never_see_stale_closures() {
    let engine = Arc::new(chain(16));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::Acquire) {
                    let top = engine.effective_permissions(role(0)).unwrap();
                    let bottom = engine.effective_permissions(role(15)).unwrap();

                    // read never moves; write comes and goes with the writer
                    assert!(top.contains(&PermissionId::new(1)));
                    assert!(bottom.contains(&PermissionId::new(1)));
                    assert!(top.len() <= 2 && bottom.len() <= 2);
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..200 {
                engine.grant_permission(role(15), "write").unwrap();
                assert!(engine.has_permission(role(0), "write").unwrap());

                engine.revoke_permission(role(15), "write").unwrap();
                assert!(!engine.has_permission(role(0), "write").unwrap());
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }

    assert!(!engine.has_permission(role(0), "write").unwrap());
}

#[test]
fn test_concurrent_edge_toggles_stay_consistent() {
    let engine = Arc::new(chain(8));

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..100 {
                    // shortcut edges never change any closure
                    engine.add_hierarchy_edge(role(t), role(7)).unwrap();
                    engine.remove_hierarchy_edge(role(t), role(7)).unwrap();
                    assert!(engine.has_permission(role(0), "read").unwrap());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.snapshot().role_hierarchy.len(), 7);
}

#[test]
fn test_concurrent_cycle_attempts_all_rejected() {
    let engine = Arc::new(chain(8));

    let handles: Vec<_> = (1..8u64)
        .map(|child| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                // every role is reachable from 0, so child -> 0 closes a cycle
                let result = engine.add_hierarchy_edge(role(child), role(0));
                matches!(result, Err(AuthzError::CycleViolation { .. }))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(engine.snapshot().role_hierarchy.len(), 7);
}
