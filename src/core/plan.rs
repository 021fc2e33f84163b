//! Plan-based operations for reviewable release and delete runs
//!
//! Every release or delete computes a `Plan` before anything is applied:
//!
//! - **Dry-run mode**: show what will happen without touching the store
//! - **Idempotency**: same snapshot and flags → same operations → same plan id
//! - **Auditability**: plans are JSON-serializable for logging/review
//!
//! # Architecture
//!
//! ```text
//! Command (release, delete)
//!   ↓
//! Closure (what has to go together)
//!   ↓
//! Plan (ordered operations)
//!   ↓
//! Executor (apply, best effort)
//! ```

use crate::core::error::RailResult;
use crate::delete::closure::DeleteSets;
use crate::graph::accessor::{ContentGraphAccessor, DependentRelease};
use crate::graph::model::{NodeId, NodeKind, ObjectRef, RecordId};
use crate::release::closure::ReleaseClosure;
use crate::release::eligibility::ReleaseScope;
use crate::release::executor::release_params;
use crate::release::verdict::describe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Plan identifier (SHA256 hash of plan operations)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
  /// Create a plan ID from plan contents
  pub fn from_contents(contents: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let result = hasher.finalize();
    Self(format!("{:x}", result))
  }

  /// Get the short ID (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// One step of a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
  /// Release a content node
  ReleaseNode {
    node: NodeId,
    kind: NodeKind,
    label: String,
    ensure_accessibility: bool,
    recursive: bool,
    dependent: DependentRelease,
  },

  /// Release a structured record through its schema
  ReleaseRecord { record: RecordId, label: String },

  /// Delete a content node and its subtree
  DeleteNode { node: NodeId, kind: NodeKind, label: String },
}

/// Type of operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
  Release,
  Delete,
}

impl fmt::Display for OperationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OperationType::Release => write!(f, "release"),
      OperationType::Delete => write!(f, "delete"),
    }
  }
}

/// Plan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
  /// Plan ID (content hash of the operations)
  pub id: PlanId,

  pub operation_type: OperationType,

  /// Label of the node the workflow runs on
  pub start: String,

  pub created_at: DateTime<Utc>,

  /// Whether this plan removes content
  pub is_destructive: bool,
}

/// A plan represents a sequence of operations to perform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
  pub metadata: PlanMetadata,

  /// Operations to perform (in order)
  pub operations: Vec<Operation>,

  /// Human-readable summary
  pub summary: String,
}

impl Plan {
  /// Create a new plan
  pub fn new(operation_type: OperationType, start: impl Into<String>) -> Self {
    Self {
      metadata: PlanMetadata {
        id: PlanId::from_contents(&[]),
        operation_type,
        start: start.into(),
        created_at: Utc::now(),
        is_destructive: operation_type == OperationType::Delete,
      },
      operations: Vec::new(),
      summary: String::new(),
    }
  }

  /// Plan for releasing `closure` in closure order
  pub fn for_release<A: ContentGraphAccessor + ?Sized>(
    accessor: &A,
    closure: &ReleaseClosure,
    scope: &ReleaseScope,
    dry_run: bool,
  ) -> Self {
    let start = describe(accessor, &ObjectRef::Node(scope.start)).display_name;
    let mut plan = Plan::new(OperationType::Release, start);
    for member in closure.set.members() {
      let conflict = describe(accessor, member);
      let operation = match *member {
        ObjectRef::Node(node) => {
          let kind = accessor.get_node(node).map(|n| n.kind).unwrap_or(NodeKind::Page);
          let params = release_params(kind, scope.recursive, dry_run);
          Operation::ReleaseNode {
            node,
            kind,
            label: conflict.display_name,
            ensure_accessibility: params.ensure_accessibility,
            recursive: params.recursive,
            dependent: params.dependent,
          }
        }
        ObjectRef::Record(record) => Operation::ReleaseRecord {
          record,
          label: conflict.display_name,
        },
      };
      plan.add_operation(operation);
    }
    plan
  }

  /// Plan for a delete: the delete set first, then the releases it triggers
  pub fn for_delete<A: ContentGraphAccessor + ?Sized>(accessor: &A, sets: &DeleteSets, target: NodeId) -> Self {
    let start = describe(accessor, &ObjectRef::Node(target)).display_name;
    let mut plan = Plan::new(OperationType::Delete, start);
    for &node in &sets.delete {
      let conflict = describe(accessor, &ObjectRef::Node(node));
      let kind = accessor.get_node(node).map(|n| n.kind).unwrap_or(NodeKind::Page);
      plan.add_operation(Operation::DeleteNode {
        node,
        kind,
        label: conflict.display_name,
      });
    }
    for &node in &sets.release {
      let conflict = describe(accessor, &ObjectRef::Node(node));
      let kind = accessor.get_node(node).map(|n| n.kind).unwrap_or(NodeKind::Page);
      plan.add_operation(Operation::ReleaseNode {
        node,
        kind,
        label: conflict.display_name,
        ensure_accessibility: true,
        recursive: false,
        dependent: DependentRelease::NewOnly,
      });
    }
    plan
  }

  /// Add an operation to the plan
  pub fn add_operation(&mut self, operation: Operation) {
    self.operations.push(operation);
    self.recompute_id();
  }

  /// Set the summary
  pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
    self.summary = summary.into();
    self
  }

  /// Recompute plan ID based on current operations
  fn recompute_id(&mut self) {
    let json = serde_json::to_vec(&self.operations).unwrap_or_default();
    self.metadata.id = PlanId::from_contents(&json);
  }

  /// Serialize to JSON
  pub fn to_json(&self) -> RailResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Deserialize from JSON
  pub fn from_json(json: &str) -> RailResult<Self> {
    Ok(serde_json::from_str(json)?)
  }

  /// Get human-readable representation
  pub fn to_human_readable(&self) -> String {
    let mut output = String::new();

    output.push_str(&format!(
      "📋 Plan: {} ({})\n",
      self.metadata.operation_type, self.metadata.id
    ));
    output.push_str(&format!("   Start: {}\n", self.metadata.start));
    output.push_str(&format!(
      "   Created: {}\n",
      self.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if !self.summary.is_empty() {
      output.push_str(&format!("\n{}\n", self.summary));
    }

    output.push_str(&format!("\n   Operations ({}):\n", self.operations.len()));

    for (i, op) in self.operations.iter().enumerate() {
      output.push_str(&format!("   {}. {}\n", i + 1, operation_to_string(op)));
    }

    if self.metadata.is_destructive {
      output.push_str("\n⚠️  NOTE: Deleted nodes cannot be restored from the release store\n");
    }

    output
  }

  /// Get number of operations
  pub fn len(&self) -> usize {
    self.operations.len()
  }

  /// Check if plan is empty
  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }
}

/// Convert operation to human-readable string
fn operation_to_string(op: &Operation) -> String {
  match op {
    Operation::ReleaseNode {
      kind,
      label,
      recursive,
      dependent,
      ..
    } => {
      let mut line = format!("Release {} {}", kind, label);
      if *recursive {
        line.push_str(" (recursive)");
      }
      if *dependent == DependentRelease::NewOnly {
        line.push_str(" (+ new dependents)");
      }
      line
    }
    Operation::ReleaseRecord { label, .. } => format!("Release record {}", label),
    Operation::DeleteNode { kind, label, .. } => format!("Delete {} {}", kind, label),
  }
}
