//! Conflict aggregation
//!
//! Reference checking produces a stream of `Finding`s. `ReleaseVerdict::fold`
//! reduces their signals into five flags that start `true` and only ever flip
//! to `false`; `has_release_issues` turns those flags into the gate decision.
//! The reduction is pure so the gate can be tested without a graph.

use crate::core::error::{AbortError, RailResult};
use crate::graph::accessor::{BatchResult, ContentGraphAccessor};
use crate::graph::model::{ContentNode, NodeId, NodeKind, ObjectRef, ReleaseStatus};
use crate::release::closure::ReleaseClosure;
use crate::release::eligibility::{ReleaseScope, rule_for};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// A single observation that can flip one aggregate flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
  /// A non-media node (or a record) is referenced
  NonMediaReferenced,
  /// A referenced non-media node was never released
  NonMediaNotReleased,
  /// A releasable node was never released and is not part of this release
  ReleasableNotReleased,
  BrokenReference,
  InWorkflow,
}

/// Aggregate flags of one reference check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseVerdict {
  pub only_media_referenced: bool,
  pub non_media_elements_released: bool,
  pub all_objects_released: bool,
  pub no_broken_references: bool,
  /// Reported, but not part of the gate
  pub no_objects_in_workflow: bool,
}

impl Default for ReleaseVerdict {
  fn default() -> Self {
    Self {
      only_media_referenced: true,
      non_media_elements_released: true,
      all_objects_released: true,
      no_broken_references: true,
      no_objects_in_workflow: true,
    }
  }
}

impl ReleaseVerdict {
  pub fn apply(mut self, signal: Signal) -> Self {
    match signal {
      Signal::NonMediaReferenced => self.only_media_referenced = false,
      Signal::NonMediaNotReleased => self.non_media_elements_released = false,
      Signal::ReleasableNotReleased => self.all_objects_released = false,
      Signal::BrokenReference => self.no_broken_references = false,
      Signal::InWorkflow => self.no_objects_in_workflow = false,
    }
    self
  }

  pub fn fold(signals: impl IntoIterator<Item = Signal>) -> Self {
    signals.into_iter().fold(Self::default(), Self::apply)
  }

  pub fn has_release_issues(&self, release_with_media: bool) -> bool {
    has_release_issues(
      self.only_media_referenced,
      self.non_media_elements_released,
      self.all_objects_released,
      self.no_broken_references,
      release_with_media,
    )
  }
}

/// Gate decision. `noObjectsInWorkflow` does not take part.
pub fn has_release_issues(
  only_media_referenced: bool,
  non_media_elements_released: bool,
  all_objects_released: bool,
  no_broken_references: bool,
  release_with_media: bool,
) -> bool {
  let all_released = (only_media_referenced && release_with_media)
    || (non_media_elements_released && release_with_media)
    || (all_objects_released && !release_with_media);
  !(all_released && no_broken_references)
}

/// Object named in a conflict dialog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Conflict {
  pub display_name: String,
  pub kind: String,
}

impl Conflict {
  pub fn new(display_name: impl Into<String>, kind: impl Into<String>) -> Self {
    Self {
      display_name: display_name.into(),
      kind: kind.into(),
    }
  }

  pub fn of(node: &ContentNode) -> Self {
    Self::new(node.label(), node.kind.as_str())
  }
}

/// Multiset of validation failures keyed by the failing node's label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
  pub failures: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
  pub fn add(&mut self, subject: impl Into<String>, message: impl Into<String>) {
    self.failures.entry(subject.into()).or_default().push(message.into());
  }

  pub fn merge(&mut self, other: ValidationReport) {
    for (subject, messages) in other.failures {
      self.failures.entry(subject).or_default().extend(messages);
    }
  }

  pub fn is_valid(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn len(&self) -> usize {
    self.failures.values().map(Vec::len).sum()
  }
}

/// Per-operation aggregate of recoverable conflicts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
  pub locked: BTreeSet<Conflict>,
  pub denied: BTreeSet<Conflict>,
  pub broken: BTreeSet<Conflict>,
  pub in_workflow: BTreeSet<Conflict>,
  /// Nodes whose store call failed outright
  pub failed: BTreeSet<Conflict>,
  pub validation: ValidationReport,
}

impl ConflictRecord {
  pub fn is_empty(&self) -> bool {
    self.locked.is_empty()
      && self.denied.is_empty()
      && self.broken.is_empty()
      && self.in_workflow.is_empty()
      && self.failed.is_empty()
      && self.validation.is_valid()
  }

  pub fn merge(&mut self, other: ConflictRecord) {
    self.locked.extend(other.locked);
    self.denied.extend(other.denied);
    self.broken.extend(other.broken);
    self.in_workflow.extend(other.in_workflow);
    self.failed.extend(other.failed);
    self.validation.merge(other.validation);
  }

  /// Fold the per-object failures of a batch result into the record
  pub fn record_batch<A: ContentGraphAccessor + ?Sized>(&mut self, accessor: &A, batch: &BatchResult) {
    for object in &batch.lock_failed {
      self.locked.insert(describe(accessor, object));
    }
    for object in &batch.denied {
      self.denied.insert(describe(accessor, object));
    }
    for object in &batch.failed {
      self.failed.insert(describe(accessor, object));
    }
  }
}

/// Dialog entry for an object, falling back to its id when it cannot be resolved
pub fn describe<A: ContentGraphAccessor + ?Sized>(accessor: &A, object: &ObjectRef) -> Conflict {
  match object {
    ObjectRef::Node(id) => match accessor.get_node(*id) {
      Ok(node) => Conflict::of(&node),
      Err(_) => Conflict::new(format!("? (-, {})", id), "unknown"),
    },
    ObjectRef::Record(id) => match accessor.get_record(*id) {
      Ok(record) => Conflict::new(record.label(), NodeKind::StructuredRecord.as_str()),
      Err(_) => Conflict::new(format!("? (-, {})", id), NodeKind::StructuredRecord.as_str()),
    },
  }
}

/// One observation, optionally naming the object it is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
  pub signal: Signal,
  pub subject: Option<Conflict>,
}

impl Finding {
  fn about(signal: Signal, subject: Conflict) -> Self {
    Self {
      signal,
      subject: Some(subject),
    }
  }

  fn bare(signal: Signal) -> Self {
    Self { signal, subject: None }
  }
}

/// Outcome of checking the references of a closure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCheck {
  pub verdict: ReleaseVerdict,
  /// label -> kind of never-released objects
  pub not_released: BTreeMap<String, String>,
  /// label -> kind of objects with a pending workflow task
  pub in_workflow: BTreeMap<String, String>,
  /// sources of broken references
  pub broken: BTreeSet<Conflict>,
}

impl ReferenceCheck {
  /// Fold another check in; flags only ever flip to false
  pub fn merge(&mut self, other: ReferenceCheck) {
    let (mine, theirs) = (&mut self.verdict, other.verdict);
    mine.only_media_referenced &= theirs.only_media_referenced;
    mine.non_media_elements_released &= theirs.non_media_elements_released;
    mine.all_objects_released &= theirs.all_objects_released;
    mine.no_broken_references &= theirs.no_broken_references;
    mine.no_objects_in_workflow &= theirs.no_objects_in_workflow;
    self.not_released.extend(other.not_released);
    self.in_workflow.extend(other.in_workflow);
    self.broken.extend(other.broken);
  }

  pub fn from_findings(findings: Vec<Finding>) -> Self {
    let mut check = ReferenceCheck {
      verdict: ReleaseVerdict::fold(findings.iter().map(|f| f.signal)),
      ..Default::default()
    };
    for finding in findings {
      let Some(subject) = finding.subject else { continue };
      match finding.signal {
        Signal::NonMediaNotReleased | Signal::ReleasableNotReleased => {
          check.not_released.insert(subject.display_name, subject.kind);
        }
        Signal::InWorkflow => {
          check.in_workflow.insert(subject.display_name, subject.kind);
        }
        Signal::BrokenReference => {
          check.broken.insert(subject);
        }
        Signal::NonMediaReferenced => {}
      }
    }
    check
  }
}

/// Walk the references of a closure and collect findings.
///
/// `recursive_set` holds the nodes an explicit recursive pass already covers;
/// those do not count as "not released".
pub fn check_references<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  closure: &ReleaseClosure,
  scope: &ReleaseScope,
  recursive_set: &HashSet<NodeId>,
) -> RailResult<ReferenceCheck> {
  let mut findings = Vec::new();

  for edge in closure.references.iter() {
    let source = describe(accessor, &edge.source);
    if edge.broken {
      warn!(source = %source.display_name, target = %edge.target, "broken reference");
      findings.push(Finding::about(Signal::BrokenReference, source));
      continue;
    }
    match edge.target {
      ObjectRef::Record(id) => {
        let record = match accessor.get_record(id) {
          Ok(record) => record,
          Err(e) => {
            warn!(record = %id, error = %e, "record not resolvable, counted as broken");
            findings.push(Finding::about(Signal::BrokenReference, source));
            continue;
          }
        };
        if record.table.is_none() {
          return Err(AbortError::OrphanRecord(id).into());
        }
        findings.push(Finding::bare(Signal::NonMediaReferenced));
        if !record.read_only && !record.released {
          let subject = Conflict::new(record.label(), NodeKind::StructuredRecord.as_str());
          warn!(record = %subject.display_name, "referenced record never released");
          findings.push(Finding::about(Signal::NonMediaNotReleased, subject.clone()));
          findings.push(Finding::about(Signal::ReleasableNotReleased, subject));
        }
        if accessor.record_references(id).map(|refs| refs.iter().any(|e| e.broken)).unwrap_or(false) {
          findings.push(Finding::about(Signal::BrokenReference, Conflict::new(record.label(), "structured-record")));
        }
      }
      ObjectRef::Node(id) => {
        let node = match accessor.get_node(id) {
          Ok(node) => node,
          Err(e) => {
            warn!(node = %id, error = %e, "reference target not resolvable, counted as broken");
            findings.push(Finding::about(Signal::BrokenReference, source));
            continue;
          }
        };
        findings.extend(check_node(accessor, closure, scope, recursive_set, node)?);
      }
    }
  }

  let check = ReferenceCheck::from_findings(findings);
  debug!(verdict = ?check.verdict, "reference check finished");
  Ok(check)
}

fn check_node<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  closure: &ReleaseClosure,
  scope: &ReleaseScope,
  recursive_set: &HashSet<NodeId>,
  target: ContentNode,
) -> RailResult<Vec<Finding>> {
  let mut findings = Vec::new();

  let node = if target.kind == NodeKind::Section {
    match accessor.owning_page(&target) {
      Ok(Some(page)) => page,
      Ok(None) => target,
      Err(e) => {
        warn!(section = %target.id, error = %e, "owning page not resolvable");
        target
      }
    }
  } else {
    target
  };

  if node.id == scope.start || Some(node.id) == scope.start_page {
    return Ok(findings);
  }

  let status = match accessor.release_status(node.id, &scope.languages) {
    Ok(status) => status,
    Err(e) => {
      warn!(node = %node.id, error = %e, "release status unavailable, counted as broken");
      findings.push(Finding::about(Signal::BrokenReference, Conflict::of(&node)));
      return Ok(findings);
    }
  };
  let never_released = status == ReleaseStatus::NeverReleased;
  let counts_as_content = !matches!(
    node.kind,
    NodeKind::Media | NodeKind::MediaFolder | NodeKind::TemplateElement | NodeKind::Query
  ) && !node.kind.is_record_channel();

  if counts_as_content {
    findings.push(Finding::bare(Signal::NonMediaReferenced));
    if never_released && !recursive_set.contains(&node.id) {
      warn!(node = %node.label(), "referenced node never released");
      findings.push(Finding::about(Signal::NonMediaNotReleased, Conflict::of(&node)));
    }
  }

  if rule_for(node.kind).is_release_candidate()
    && node.release_supported
    && never_released
    && !closure.set.contains_node(node.id)
  {
    findings.push(Finding::about(Signal::ReleasableNotReleased, Conflict::of(&node)));
  }

  if node.has_task {
    warn!(node = %node.label(), "referenced node is in a workflow");
    findings.push(Finding::about(Signal::InWorkflow, Conflict::of(&node)));
  }

  match accessor.outgoing_references(node.id) {
    Ok(edges) => {
      if edges.iter().any(|e| e.broken) {
        findings.push(Finding::about(Signal::BrokenReference, Conflict::of(&node)));
      }
    }
    Err(e) => warn!(node = %node.id, error = %e, "could not check onward references"),
  }

  Ok(findings)
}
