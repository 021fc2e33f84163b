//! Delete executor: lock check, delete batch, follow-up releases

use crate::core::error::RailResult;
use crate::delete::closure::DeleteSets;
use crate::graph::accessor::{BatchResult, ContentGraphAccessor, DeleteParams, DependentRelease, ReleaseParams};
use crate::graph::model::{NodeId, ObjectRef};
use crate::release::executor::{ApplyObserver, ExecutionReport};
use crate::release::verdict::{Conflict, describe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Object held by another session, as `(kind, uid-or-name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedObject {
  pub kind: String,
  pub name: String,
}

/// Result of the check-only delete pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCheck {
  pub success: bool,
  pub locked: Vec<LockedObject>,
}

/// Dry run: every node the delete would touch must be free of foreign locks
pub fn test_delete<A: ContentGraphAccessor + ?Sized>(accessor: &A, sets: &DeleteSets) -> DeleteCheck {
  let mut check = DeleteCheck {
    success: true,
    locked: Vec::new(),
  };
  for id in sets.all() {
    let locked = match accessor.is_locked_elsewhere(id) {
      Ok(locked) => locked,
      Err(e) => {
        error!(node = %id, error = %e, "lock state unavailable");
        true
      }
    };
    if locked {
      check.success = false;
      check.locked.push(match accessor.get_node(id) {
        Ok(node) => LockedObject {
          kind: node.kind.to_string(),
          name: node.uid_or_name(),
        },
        Err(_) => LockedObject {
          kind: "unknown".to_string(),
          name: id.to_string(),
        },
      });
    }
  }
  if !check.success {
    warn!(locked = check.locked.len(), "delete blocked by locked objects");
  }
  check
}

/// Delete the delete set in one batch, then release every release-set node
/// with dependent release limited to new items.
pub fn execute_delete<A: ContentGraphAccessor + ?Sized>(
  accessor: &mut A,
  sets: &DeleteSets,
  start: NodeId,
  observer: &mut dyn ApplyObserver,
) -> RailResult<ExecutionReport> {
  let mut report = ExecutionReport::default();
  observer.started(sets.delete.len() + sets.release.len());

  if let Err(e) = accessor.unlock(start) {
    warn!(node = %start, error = %e, "could not unlock workflow node");
  }

  if !sets.delete.is_empty() {
    // Labels are taken up front, deleted subtrees no longer resolve
    let labels: BTreeMap<ObjectRef, Conflict> = sets
      .delete
      .iter()
      .map(|id| {
        let object = ObjectRef::Node(*id);
        (object, describe(accessor, &object))
      })
      .collect();
    match accessor.apply_delete(&sets.delete, &DeleteParams { dry_run: false }) {
      Ok(batch) => {
        let rejected = BatchResult {
          failed: Vec::new(),
          ..batch.clone()
        };
        report.conflicts.record_batch(accessor, &rejected);
        for object in &batch.failed {
          error!(object = %object, "delete failed");
          if let Some(label) = labels.get(object) {
            report.conflicts.failed.insert(label.clone());
          }
        }
        for object in &batch.applied {
          info!(object = %object, "deleted");
        }
        report.applied.extend(batch.applied);
      }
      Err(e) => {
        error!(error = %e, "delete batch failed");
        report.conflicts.failed.extend(labels.into_values());
      }
    }
    for id in &sets.delete {
      observer.applied(&ObjectRef::Node(*id));
    }
  }

  let params = ReleaseParams {
    ensure_accessibility: true,
    recursive: false,
    dependent: DependentRelease::NewOnly,
    dry_run: false,
  };
  for &id in &sets.release {
    let object = ObjectRef::Node(id);
    match accessor.apply_release(&[object], &params) {
      Ok(batch) => {
        report.conflicts.record_batch(accessor, &batch);
        report.applied.extend(batch.applied);
      }
      Err(e) => {
        error!(node = %id, error = %e, "follow-up release failed");
        report.conflicts.failed.insert(describe(accessor, &object));
      }
    }
    observer.applied(&object);
  }
  observer.finished();

  report.success = report.conflicts.is_empty();
  info!(applied = report.applied.len(), success = report.success, "delete executed");
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::DeleteEnvironment;
  use crate::delete::closure::build_delete_closure;
  use crate::graph::fixtures::GraphBuilder;
  use crate::graph::model::NodeKind;
  use crate::graph::model::ReleaseStatus::*;
  use crate::release::executor::Silent;

  fn folder_with_two() -> (crate::graph::content_graph::ContentGraph, NodeId, NodeId, NodeId) {
    let mut b = GraphBuilder::new();
    let root = b.node(NodeKind::SiteRoot, Released, None);
    let folder = b.node(NodeKind::SiteFolder, Changed, Some(root));
    let child = b.node(NodeKind::DocumentGroup, Released, Some(folder));
    let sibling = b.node(NodeKind::DocumentGroup, Released, Some(folder));
    (b.build(), folder, child, sibling)
  }

  #[test]
  fn test_locked_release_target_fails_check() {
    let (mut g, folder, child, _) = folder_with_two();
    g.state.locked_elsewhere.insert(folder);
    let sets = build_delete_closure(&g, child, DeleteEnvironment::Interactive).unwrap();

    let check = test_delete(&g, &sets);
    assert!(!check.success);
    assert_eq!(
      check.locked,
      vec![LockedObject {
        kind: "site-folder".to_string(),
        name: format!("n{}", folder),
      }]
    );
  }

  #[test]
  fn test_delete_then_release_parent() {
    let (mut g, folder, child, sibling) = folder_with_two();
    let sets = build_delete_closure(&g, child, DeleteEnvironment::Interactive).unwrap();
    assert!(test_delete(&g, &sets).success);

    let report = execute_delete(&mut g, &sets, child, &mut Silent).unwrap();
    assert!(report.success);
    assert!(g.get_node(child).is_err());
    assert!(g.get_node(sibling).is_ok());
    assert_eq!(g.get_node(folder).unwrap().status, Released);
  }

  #[test]
  fn test_denied_delete_reported() {
    let (mut g, _, child, _) = folder_with_two();
    g.state.denied.insert(child);
    let sets = build_delete_closure(&g, child, DeleteEnvironment::Headless).unwrap();

    let report = execute_delete(&mut g, &sets, child, &mut Silent).unwrap();
    assert!(!report.success);
    assert_eq!(report.conflicts.denied.len(), 1);
    assert!(g.get_node(child).is_ok());
  }

  #[test]
  fn test_failing_member_does_not_stop_delete_batch() {
    let mut b = GraphBuilder::new();
    let root = b.node(NodeKind::SiteRoot, Released, None);
    let folder = b.node(NodeKind::SiteFolder, Released, Some(root));
    let child = b.node(NodeKind::DocumentGroup, Released, Some(folder));
    let mut g = b.build();
    g.state.failing.insert(folder);
    let folder_label = describe(&g, &ObjectRef::Node(folder));
    let sets = DeleteSets {
      delete: vec![child, folder],
      release: vec![root],
    };

    let report = execute_delete(&mut g, &sets, child, &mut Silent).unwrap();
    assert!(!report.success);
    assert!(report.applied.contains(&ObjectRef::Node(child)));
    assert!(report.applied.contains(&ObjectRef::Node(root)));
    assert!(g.get_node(child).is_err());
    assert!(g.get_node(folder).is_ok());
    assert_eq!(report.conflicts.failed.len(), 1);
    assert!(report.conflicts.failed.contains(&folder_label));
  }
}
