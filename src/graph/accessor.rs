//! Boundary to the content store
//!
//! The closure builder only reads through this trait. The executors also call the
//! transactional `apply_*` primitives and the lock helpers. Every call may fail
//! with an `AccessError`; callers decide whether that failure is per node or fatal.

use crate::core::error::AccessError;
use crate::graph::model::{ContentNode, NodeId, NodeKind, ObjectRef, RecordId, ReferenceEdge, ReleaseStatus, StructuredRecord};
use serde::{Deserialize, Serialize};

/// How far a release drags in never-released dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentRelease {
  #[default]
  None,
  NewOnly,
}

/// Parameters for one release call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseParams {
  pub ensure_accessibility: bool,
  pub recursive: bool,
  pub dependent: DependentRelease,
  /// Check-only pass: the store validates but does not change release state
  pub dry_run: bool,
}

/// Parameters for one delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteParams {
  pub dry_run: bool,
}

/// Partial-failure result of a batch call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
  pub applied: Vec<ObjectRef>,
  pub lock_failed: Vec<ObjectRef>,
  pub denied: Vec<ObjectRef>,
  /// Store rejected the call for these objects
  pub failed: Vec<ObjectRef>,
}

impl BatchResult {
  pub fn is_clean(&self) -> bool {
    self.lock_failed.is_empty() && self.denied.is_empty() && self.failed.is_empty()
  }
}

/// Read/write access to the content store
pub trait ContentGraphAccessor {
  fn get_node(&self, id: NodeId) -> Result<ContentNode, AccessError>;

  fn get_record(&self, id: RecordId) -> Result<StructuredRecord, AccessError>;

  /// Look a node up by its uid
  fn node_by_uid(&self, uid: &str) -> Result<Option<ContentNode>, AccessError>;

  /// Children of `node` whose kind is in `filter` (empty filter = all kinds)
  fn children(&self, node: NodeId, filter: &[NodeKind], recursive: bool) -> Result<Vec<ContentNode>, AccessError>;

  fn outgoing_references(&self, node: NodeId) -> Result<Vec<ReferenceEdge>, AccessError>;

  fn incoming_references(&self, node: NodeId) -> Result<Vec<ReferenceEdge>, AccessError>;

  /// References held by a structured record, resolved through its schema
  fn record_references(&self, record: RecordId) -> Result<Vec<ReferenceEdge>, AccessError>;

  fn release_status(&self, node: NodeId, languages: &[String]) -> Result<ReleaseStatus, AccessError>;

  /// Held by a session other than the one running the workflow
  fn is_locked_elsewhere(&self, node: NodeId) -> Result<bool, AccessError>;

  /// Per-object failures land in the result; the batch keeps going past them
  fn apply_release(&mut self, objects: &[ObjectRef], params: &ReleaseParams) -> Result<BatchResult, AccessError>;

  fn apply_delete(&mut self, nodes: &[NodeId], params: &DeleteParams) -> Result<BatchResult, AccessError>;

  fn lock(&mut self, node: NodeId) -> Result<(), AccessError>;

  fn unlock(&mut self, node: NodeId) -> Result<(), AccessError>;

  /// Walk parent links up to the root, nearest first
  fn ancestors(&self, node: NodeId) -> Result<Vec<ContentNode>, AccessError> {
    let mut out = Vec::new();
    let mut current = self.get_node(node)?.parent;
    while let Some(id) = current {
      let parent = self.get_node(id)?;
      current = parent.parent;
      out.push(parent);
    }
    Ok(out)
  }

  /// True when `ancestor` is a proper ancestor of `node`
  fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> Result<bool, AccessError> {
    Ok(self.ancestors(node)?.iter().any(|n| n.id == ancestor))
  }

  /// Page that owns a section (sections may nest)
  fn owning_page(&self, section: &ContentNode) -> Result<Option<ContentNode>, AccessError> {
    for ancestor in self.ancestors(section.id)? {
      if ancestor.kind == NodeKind::Page {
        return Ok(Some(ancestor));
      }
    }
    Ok(None)
  }
}
