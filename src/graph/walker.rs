//! Reference graph walker
//!
//! Computes the reference edges a release of one node has to account for:
//!
//! 1. The node's own outgoing edges
//! 2. For pages (and the page behind a page-reference) the edges of every section,
//!    skipping record-backed sections
//! 3. For never-released nodes the edges of every ancestor, unless the node sits
//!    under the start node of a recursive release
//! 4. For folders in recursive mode, the union of every child's walk
//!
//! Self references, template targets and (unless requested) media are dropped.

use crate::core::error::{AbortError, RailResult};
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{ContentNode, EdgeKind, Flags, NodeId, NodeKind, ObjectRef, ReferenceEdge, ReleaseStatus};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Ordered, de-duplicated set of reference edges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
  edges: Vec<ReferenceEdge>,
  seen: HashSet<ReferenceEdge>,
}

impl ReferenceSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, edge: ReferenceEdge) -> bool {
    if self.seen.insert(edge) {
      self.edges.push(edge);
      true
    } else {
      false
    }
  }

  pub fn extend(&mut self, other: ReferenceSet) {
    for edge in other.edges {
      self.insert(edge);
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &ReferenceEdge> {
    self.edges.iter()
  }

  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.edges.is_empty()
  }

  /// Distinct targets in first-seen order
  pub fn targets(&self) -> Vec<ObjectRef> {
    let mut seen = HashSet::new();
    self.edges.iter().map(|e| e.target).filter(|t| seen.insert(*t)).collect()
  }
}

/// Walks references for one closure computation
pub struct ReferenceWalker<'a, A: ContentGraphAccessor + ?Sized> {
  accessor: &'a A,
  start: NodeId,
  flags: &'a Flags,
}

impl<'a, A: ContentGraphAccessor + ?Sized> ReferenceWalker<'a, A> {
  pub fn new(accessor: &'a A, start: NodeId, flags: &'a Flags) -> Self {
    Self { accessor, start, flags }
  }

  /// `collect_references(node, includeMedia)`
  ///
  /// Structured records and their folders abort: they cannot go through the tree.
  pub fn collect_references(&self, node: NodeId) -> RailResult<ReferenceSet> {
    let current = self.accessor.get_node(node)?;
    if current.kind.is_record_channel() {
      return Err(
        AbortError::IllegalKind {
          operation: "release",
          kind: current.kind,
          id: node,
        }
        .into(),
      );
    }

    let mut set = ReferenceSet::new();

    if self.flags.recursive && current.kind.is_folder() {
      match self.accessor.children(node, &[], false) {
        Ok(children) => {
          for child in children {
            set.extend(self.collect_references(child.id)?);
          }
        }
        Err(e) => warn!(node = %node, error = %e, "could not list children, skipping recursive walk"),
      }
    }

    self.add_edges_of(node, node, &mut set);

    if let Some(page) = self.page_of(&current) {
      if page.id != node {
        self.add_edges_of(page.id, node, &mut set);
      }
      self.add_section_edges(&page, node, &mut set);
    }

    if self.walks_ancestors(&current) {
      match self.accessor.ancestors(node) {
        Ok(ancestors) => {
          for ancestor in ancestors {
            self.add_edges_of(ancestor.id, node, &mut set);
          }
        }
        Err(e) => warn!(node = %node, error = %e, "could not resolve ancestors"),
      }
    }

    debug!(node = %node, references = set.len(), "collected references");
    Ok(set)
  }

  /// Page behind a page or page-reference
  fn page_of(&self, node: &ContentNode) -> Option<ContentNode> {
    match node.kind {
      NodeKind::Page => Some(node.clone()),
      NodeKind::PageReference => node.page.and_then(|page| match self.accessor.get_node(page) {
        Ok(page) => Some(page),
        Err(e) => {
          warn!(page_ref = %node.id, error = %e, "page of page-reference not resolvable");
          None
        }
      }),
      _ => None,
    }
  }

  fn walks_ancestors(&self, node: &ContentNode) -> bool {
    let status = match self.accessor.release_status(node.id, &self.flags.languages) {
      Ok(status) => status,
      Err(e) => {
        warn!(node = %node.id, error = %e, "release status unavailable");
        return false;
      }
    };
    if status != ReleaseStatus::NeverReleased {
      return false;
    }
    if !self.flags.recursive {
      return true;
    }
    // nodes under the start of a recursive release were already decided by that pass
    !self.accessor.is_descendant_of(node.id, self.start).unwrap_or(false)
  }

  fn add_section_edges(&self, page: &ContentNode, origin: NodeId, set: &mut ReferenceSet) {
    match self.accessor.children(page.id, &[NodeKind::Section], true) {
      Ok(sections) => {
        for section in sections.iter().filter(|s| !s.record_backed) {
          self.add_edges_of(section.id, origin, set);
        }
      }
      Err(e) => warn!(page = %page.id, error = %e, "could not list sections"),
    }
  }

  fn add_edges_of(&self, walked: NodeId, origin: NodeId, set: &mut ReferenceSet) {
    let edges = match self.accessor.outgoing_references(walked) {
      Ok(edges) => edges,
      Err(e) => {
        warn!(node = %walked, error = %e, "outgoing references unavailable");
        return;
      }
    };
    for edge in edges {
      if self.keeps(&edge, walked, origin) {
        set.insert(edge);
      }
    }
  }

  fn keeps(&self, edge: &ReferenceEdge, walked: NodeId, origin: NodeId) -> bool {
    if edge.target == ObjectRef::Node(walked) || edge.target == ObjectRef::Node(origin) {
      return false;
    }
    match edge.kind {
      EdgeKind::Template => return false,
      EdgeKind::Media if !self.flags.include_media => return false,
      _ => {}
    }
    if let ObjectRef::Node(target) = edge.target
      && !edge.broken
      && let Ok(target) = self.accessor.get_node(target)
    {
      if target.kind == NodeKind::TemplateElement {
        return false;
      }
      if target.kind.is_media() && !self.flags.include_media {
        return false;
      }
    }
    true
  }
}
