//! Release executor
//!
//! Applies an ordered closure node by node. Every store call is its own
//! per-node boundary: a failing node lands in the conflict record and the batch
//! carries on. The overall run only succeeds when no node failed.

use crate::checks::CheckRunner;
use crate::core::error::{AbortError, AccessError, RailResult};
use crate::graph::accessor::{ContentGraphAccessor, DependentRelease, ReleaseParams};
use crate::graph::model::{ContentNode, EdgeKind, Flags, NodeId, NodeKind, ObjectRef, RecordId};
use crate::release::closure::ReleaseClosure;
use crate::release::eligibility::ReleaseScope;
use crate::release::verdict::{Conflict, ConflictRecord, describe};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Store parameters for releasing one node of `kind`
pub fn release_params(kind: NodeKind, recursive: bool, dry_run: bool) -> ReleaseParams {
  let (ensure_accessibility, cascade, dependent) = match kind {
    NodeKind::PageReference => (true, false, dependent_for_dry_run(dry_run)),
    NodeKind::SiteFolder => (true, recursive, dependent_for_dry_run(dry_run)),
    NodeKind::Page | NodeKind::DocumentGroup | NodeKind::Media => (true, false, DependentRelease::None),
    NodeKind::PageFolder | NodeKind::MediaFolder => (true, recursive, DependentRelease::None),
    NodeKind::GlobalContentFolder | NodeKind::SiteRoot => (false, recursive, DependentRelease::None),
    NodeKind::GlobalContentPage
    | NodeKind::ProjectProperties
    | NodeKind::StructuredRecord
    | NodeKind::StructuredRecordFolder
    | NodeKind::Section
    | NodeKind::TemplateElement
    | NodeKind::Query => (false, false, DependentRelease::None),
  };
  ReleaseParams {
    ensure_accessibility,
    recursive: cascade,
    dependent,
    dry_run,
  }
}

fn dependent_for_dry_run(dry_run: bool) -> DependentRelease {
  if dry_run {
    DependentRelease::NewOnly
  } else {
    DependentRelease::None
  }
}

/// Receives progress while a batch is applied
pub trait ApplyObserver {
  fn started(&mut self, _total: usize) {}
  fn applied(&mut self, _object: &ObjectRef) {}
  fn finished(&mut self) {}
}

/// Observer that ignores everything
pub struct Silent;

impl ApplyObserver for Silent {}

/// Options for one executor run
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
  /// Check-only pass
  pub dry_run: bool,
  /// Project the workflow runs in; nodes of other projects are skipped
  pub project: Option<String>,
}

/// Outcome of one executor run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
  pub success: bool,
  pub dry_run: bool,
  pub applied: Vec<ObjectRef>,
  pub skipped: Vec<ObjectRef>,
  pub conflicts: ConflictRecord,
}

impl ExecutionReport {
  fn finish(mut self) -> Self {
    self.success = self.conflicts.is_empty();
    self
  }
}

/// Release every member of `closure` in closure order.
///
/// Validation runs over the whole plan first; any failure ends the run without
/// touching the store.
pub fn execute_release<A: ContentGraphAccessor + ?Sized>(
  accessor: &mut A,
  closure: &ReleaseClosure,
  scope: &ReleaseScope,
  runner: &CheckRunner,
  options: &ExecuteOptions,
  observer: &mut dyn ApplyObserver,
) -> RailResult<ExecutionReport> {
  let mut report = ExecutionReport {
    dry_run: options.dry_run,
    ..Default::default()
  };

  let mut plan: Vec<ContentNode> = Vec::new();
  for member in closure.set.members() {
    let ObjectRef::Node(id) = *member else {
      debug!(member = %member, "structured record left to the record channel");
      report.skipped.push(*member);
      continue;
    };
    let node = match accessor.get_node(id) {
      Ok(node) => node,
      Err(e) => {
        error!(node = %id, error = %e, "closure member not resolvable");
        report.conflicts.failed.insert(describe(accessor, member));
        continue;
      }
    };
    if skip_node(accessor, scope, options, &node) {
      report.skipped.push(*member);
      continue;
    }
    plan.push(node);
  }

  for node in &plan {
    let validation = runner.validate_tree(accessor, node, &scope.languages)?;
    report.conflicts.validation.merge(validation);
  }
  if !report.conflicts.validation.is_valid() {
    warn!(failures = report.conflicts.validation.len(), "validation failed, nothing released");
    return Ok(report.finish());
  }

  if let Err(e) = accessor.unlock(scope.start) {
    warn!(node = %scope.start, error = %e, "could not unlock start node");
  }

  observer.started(plan.len());
  for node in &plan {
    let object = ObjectRef::Node(node.id);
    let params = release_params(node.kind, scope.recursive, options.dry_run);
    match accessor.apply_release(&[object], &params) {
      Ok(batch) => {
        report.conflicts.record_batch(accessor, &batch);
        report.applied.extend(batch.applied);
      }
      Err(e) => {
        error!(node = %node.id, error = %e, "release failed");
        report.conflicts.failed.insert(Conflict::of(node));
      }
    }
    observer.applied(&object);
  }
  observer.finished();

  if let Err(e) = accessor.lock(scope.start) {
    warn!(node = %scope.start, error = %e, "could not re-lock start node");
  }

  let report = report.finish();
  info!(
    applied = report.applied.len(),
    skipped = report.skipped.len(),
    success = report.success,
    dry_run = options.dry_run,
    "release executed"
  );
  Ok(report)
}

fn skip_node<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  scope: &ReleaseScope,
  options: &ExecuteOptions,
  node: &ContentNode,
) -> bool {
  if let (Some(project), Some(own)) = (&options.project, &node.project)
    && project != own
  {
    debug!(node = %node.id, project = %own, "node of another project skipped");
    return true;
  }
  if scope.recursive && node.id != scope.start {
    match accessor.is_descendant_of(node.id, scope.start) {
      Ok(true) => {
        debug!(node = %node.id, "covered by recursive release of start node");
        return true;
      }
      Ok(false) => {}
      Err(e) => warn!(node = %node.id, error = %e, "ancestry unavailable"),
    }
  }
  false
}

/// Release a workflow started on a structured record.
///
/// The record's schema references go first; the record follows only when every
/// one of them went through.
pub fn execute_record_release<A: ContentGraphAccessor + ?Sized>(
  accessor: &mut A,
  record_id: RecordId,
  flags: &Flags,
  options: &ExecuteOptions,
  observer: &mut dyn ApplyObserver,
) -> RailResult<ExecutionReport> {
  let mut report = ExecutionReport {
    dry_run: options.dry_run,
    ..Default::default()
  };

  let record = accessor.get_record(record_id)?;
  if record.table.is_none() {
    return Err(AbortError::OrphanRecord(record_id).into());
  }
  for message in &record.validation_errors {
    report.conflicts.validation.add(record.label(), message.clone());
  }
  if !report.conflicts.validation.is_valid() {
    warn!(record = %record.label(), "record validation failed");
    return Ok(report.finish());
  }

  let mut targets: Vec<NodeId> = Vec::new();
  for edge in accessor.record_references(record_id)? {
    if edge.broken {
      report.conflicts.broken.insert(Conflict::new(record.label(), NodeKind::StructuredRecord.as_str()));
      continue;
    }
    let Some(target) = edge.target.as_node() else { continue };
    if edge.kind == EdgeKind::Template || (edge.kind == EdgeKind::Media && !flags.include_media) {
      continue;
    }
    if !targets.contains(&target) {
      targets.push(target);
    }
  }

  observer.started(targets.len() + 1);
  for target in targets {
    let node = match accessor.get_node(target) {
      Ok(node) => node,
      Err(e) => {
        error!(node = %target, error = %e, "record reference not resolvable");
        report.conflicts.failed.insert(describe(accessor, &ObjectRef::Node(target)));
        continue;
      }
    };
    if node.kind == NodeKind::TemplateElement || (node.kind.is_media() && !flags.include_media) {
      continue;
    }
    release_one(accessor, &mut report, &node, flags.recursive, options.dry_run);
    observer.applied(&ObjectRef::Node(target));
  }

  if report.conflicts.is_empty() {
    let object = ObjectRef::Record(record_id);
    let params = release_params(NodeKind::StructuredRecord, false, options.dry_run);
    match accessor.apply_release(&[object], &params) {
      Ok(batch) => {
        report.conflicts.record_batch(accessor, &batch);
        report.applied.extend(batch.applied);
      }
      Err(e) => {
        error!(record = %record_id, error = %e, "record release failed");
        report.conflicts.failed.insert(Conflict::new(record.label(), NodeKind::StructuredRecord.as_str()));
      }
    }
    observer.applied(&object);
  } else {
    warn!(record = %record.label(), "references failed, record not released");
  }
  observer.finished();

  Ok(report.finish())
}

fn release_one<A: ContentGraphAccessor + ?Sized>(
  accessor: &mut A,
  report: &mut ExecutionReport,
  node: &ContentNode,
  recursive: bool,
  dry_run: bool,
) {
  let object = ObjectRef::Node(node.id);
  let params = release_params(node.kind, recursive, dry_run);
  match accessor.apply_release(&[object], &params) {
    Ok(batch) => {
      report.conflicts.record_batch(accessor, &batch);
      report.applied.extend(batch.applied);
    }
    Err(AccessError::Locked(_)) => {
      report.conflicts.locked.insert(Conflict::of(node));
    }
    Err(AccessError::Denied(_)) => {
      report.conflicts.denied.insert(Conflict::of(node));
    }
    Err(e) => {
      error!(node = %node.id, error = %e, "release failed");
      report.conflicts.failed.insert(Conflict::of(node));
    }
  }
}
