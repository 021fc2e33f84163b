//! Eligibility classifier
//!
//! Per-kind behaviour is data: `rule_for` maps every `NodeKind` to a `KindRule`,
//! and the two classifier predicates only combine those bits with the scope of
//! the current release.

use crate::core::error::RailResult;
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{ContentNode, NodeId, NodeKind, ReleaseStatus};
use std::collections::HashSet;

/// What a node kind may do in a release closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRule {
  /// Always swept into a closure when referenced
  pub swept: bool,
  /// Releasable structural kind when the release is recursive
  pub recursive_releasable: bool,
  /// Never part of a release closure, whatever the flags
  pub excluded: bool,
}

const fn rule(swept: bool, recursive_releasable: bool, excluded: bool) -> KindRule {
  KindRule {
    swept,
    recursive_releasable,
    excluded,
  }
}

pub fn rule_for(kind: NodeKind) -> KindRule {
  match kind {
    NodeKind::Media => rule(true, true, false),
    NodeKind::SiteFolder => rule(true, true, false),
    NodeKind::SiteRoot => rule(true, false, false),
    NodeKind::Page
    | NodeKind::PageFolder
    | NodeKind::MediaFolder
    | NodeKind::PageReference
    | NodeKind::DocumentGroup
    | NodeKind::GlobalContentFolder
    | NodeKind::GlobalContentPage => rule(false, true, false),
    NodeKind::TemplateElement | NodeKind::StructuredRecord | NodeKind::StructuredRecordFolder => {
      rule(false, false, true)
    }
    NodeKind::Section | NodeKind::Query | NodeKind::ProjectProperties => rule(false, false, false),
  }
}

impl KindRule {
  /// Kind that a release could legitimately pick up on its own
  pub fn is_release_candidate(&self) -> bool {
    self.swept || self.recursive_releasable
  }
}

/// Scope of one release: who started it and what else was asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseScope {
  pub start: NodeId,
  /// Page behind a page-reference start node
  pub start_page: Option<NodeId>,
  /// Extra nodes named by the caller (related page-references and their pages)
  pub custom_targets: HashSet<NodeId>,
  pub recursive: bool,
  pub languages: Vec<String>,
}

impl ReleaseScope {
  pub fn new(start: &ContentNode, recursive: bool, languages: Vec<String>) -> Self {
    let start_page = match start.kind {
      NodeKind::PageReference => start.page,
      _ => None,
    };
    Self {
      start: start.id,
      start_page,
      custom_targets: HashSet::new(),
      recursive,
      languages,
    }
  }

  /// Resolve the start node through the store
  pub fn resolve<A: ContentGraphAccessor + ?Sized>(
    accessor: &A,
    start: NodeId,
    recursive: bool,
    languages: Vec<String>,
  ) -> RailResult<Self> {
    let node = accessor.get_node(start)?;
    Ok(Self::new(&node, recursive, languages))
  }

  pub fn with_custom_targets(mut self, targets: impl IntoIterator<Item = NodeId>) -> Self {
    self.custom_targets.extend(targets);
    self
  }

  /// `is_releasable(node, customTargets, recursiveFlag, startNode)`
  pub fn is_releasable(&self, node: &ContentNode) -> bool {
    if node.id == self.start || Some(node.id) == self.start_page {
      return true;
    }
    let rule = rule_for(node.kind);
    rule.swept || self.custom_targets.contains(&node.id) || (self.recursive && rule.recursive_releasable)
  }

  /// `should_be_released(node, recursiveFlag)`
  pub fn should_be_released(&self, node: &ContentNode) -> bool {
    let status = node.status_for(&self.languages);
    (status != ReleaseStatus::Released || self.recursive) && !rule_for(node.kind).excluded
  }

  /// Both predicates hold
  pub fn admits(&self, node: &ContentNode) -> bool {
    self.is_releasable(node) && self.should_be_released(node)
  }
}
