//! Release closure builder
//!
//! # Design
//!
//! Candidates (the start node plus any recursive descendants carried over from an
//! earlier step) are put into store order first, then each one is walked:
//!
//! ```text
//! candidate ──walker──▶ references ──classifier──▶ closure
//!     │                                               ▲
//!     ├── unreleased page of a page-reference ────────┤
//!     ├── changed parent (interactive, non-recursive) ┤
//!     └── the candidate itself ───────────────────────┘
//! ```
//!
//! The finished closure is sorted again with the same store order, because the
//! executor releases in that order: pages before the site structure that points
//! at them, site structure before media and everything else.

use crate::core::error::RailResult;
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{Flags, NodeId, NodeKind, ObjectRef, ReleaseStatus, StoreType};
use crate::graph::walker::{ReferenceSet, ReferenceWalker};
use crate::release::eligibility::{ReleaseScope, rule_for};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Ordered, de-duplicated closure members keyed by identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureSet {
  members: Vec<ObjectRef>,
  seen: HashSet<ObjectRef>,
}

impl ClosureSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, member: ObjectRef) -> bool {
    if self.seen.insert(member) {
      self.members.push(member);
      true
    } else {
      false
    }
  }

  pub fn contains(&self, member: &ObjectRef) -> bool {
    self.seen.contains(member)
  }

  pub fn contains_node(&self, id: NodeId) -> bool {
    self.seen.contains(&ObjectRef::Node(id))
  }

  pub fn members(&self) -> &[ObjectRef] {
    &self.members
  }

  pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.members.iter().filter_map(|m| m.as_node())
  }

  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  /// Stable sort into store order
  pub fn sort_by_store<A: ContentGraphAccessor + ?Sized>(&mut self, accessor: &A) {
    order_by_store(accessor, &mut self.members);
  }
}

/// Rank used by the store ordering: page store, site store, everything else,
/// then objects that do not resolve to a content node.
pub fn store_rank<A: ContentGraphAccessor + ?Sized>(accessor: &A, member: &ObjectRef) -> u8 {
  match member {
    ObjectRef::Node(id) => match accessor.get_node(*id) {
      Ok(node) => match node.kind.store() {
        StoreType::PageStore => 0,
        StoreType::SiteStore => 1,
        _ => 2,
      },
      Err(_) => 3,
    },
    ObjectRef::Record(_) => 3,
  }
}

/// Stable sort by `store_rank`; ties keep their relative order
pub fn order_by_store<A: ContentGraphAccessor + ?Sized>(accessor: &A, members: &mut [ObjectRef]) {
  members.sort_by_cached_key(|m| store_rank(accessor, m));
}

/// Options that change how candidates are expanded
#[derive(Debug, Clone, Default)]
pub struct ClosureOptions {
  /// Interactive environment: also sweep in a changed parent of the start node
  pub interactive: bool,
  /// Explicitly requested nodes (related page-references and their pages)
  pub custom_targets: Vec<NodeId>,
}

/// A computed release closure plus the references it was derived from
#[derive(Debug, Clone, Default)]
pub struct ReleaseClosure {
  pub scope_start: Option<NodeId>,
  pub set: ClosureSet,
  pub references: ReferenceSet,
  /// Candidates the store could not resolve
  pub unresolved: Vec<NodeId>,
}

/// `build_release_closure(startNodes, flags)`
///
/// `start_nodes[0]` is the primary target. The rest are pre-resolved recursive
/// descendants or related page-references.
pub fn build_release_closure<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  start_nodes: &[NodeId],
  flags: &Flags,
  options: &ClosureOptions,
) -> RailResult<ReleaseClosure> {
  let Some(&primary) = start_nodes.first() else {
    return Ok(ReleaseClosure::default());
  };
  let scope = ReleaseScope::resolve(accessor, primary, flags.recursive, flags.languages.clone())?
    .with_custom_targets(options.custom_targets.iter().copied());

  let mut candidates: Vec<ObjectRef> = Vec::new();
  let mut seen = HashSet::new();
  for id in start_nodes {
    if seen.insert(*id) {
      candidates.push(ObjectRef::Node(*id));
    }
  }
  order_by_store(accessor, &mut candidates);

  let walker = ReferenceWalker::new(accessor, primary, flags);
  let mut closure = ReleaseClosure {
    scope_start: Some(primary),
    ..Default::default()
  };

  for candidate in candidates.iter().filter_map(|c| c.as_node()) {
    let node = match accessor.get_node(candidate) {
      Ok(node) => node,
      Err(e) if candidate == primary => return Err(e.into()),
      Err(e) => {
        error!(node = %candidate, error = %e, "candidate not resolvable, skipped");
        closure.unresolved.push(candidate);
        continue;
      }
    };

    let references = walker.collect_references(candidate)?;
    for target in references.targets() {
      add_target(accessor, &scope, &mut closure.set, target);
    }
    closure.references.extend(references);

    if node.kind == NodeKind::PageReference
      && let Some(page) = node.page
    {
      match accessor.release_status(page, &flags.languages) {
        Ok(ReleaseStatus::Released) => {}
        Ok(_) => {
          if closure.set.insert(ObjectRef::Node(page)) {
            info!(page = %page, page_ref = %candidate, "unreleased page added to closure");
          }
        }
        Err(e) => warn!(page = %page, error = %e, "page status unavailable"),
      }
    }

    if options.interactive && !flags.recursive && candidate == primary {
      sweep_parent(accessor, &scope, &mut closure.set, &node);
    }

    if !rule_for(node.kind).excluded {
      closure.set.insert(ObjectRef::Node(candidate));
    }
  }

  closure.set.sort_by_store(accessor);
  debug!(start = %primary, members = closure.set.len(), "release closure built");
  Ok(closure)
}

fn add_target<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  scope: &ReleaseScope,
  set: &mut ClosureSet,
  target: ObjectRef,
) {
  match target {
    ObjectRef::Node(id) => match accessor.get_node(id) {
      Ok(node) => {
        if scope.admits(&node) && set.insert(target) {
          info!(node = %id, kind = %node.kind, "referenced node added to closure");
        }
      }
      Err(e) => debug!(node = %id, error = %e, "unresolvable reference target left out"),
    },
    ObjectRef::Record(id) => match accessor.get_record(id) {
      Ok(record) => {
        if !record.released && !record.read_only {
          set.insert(target);
        }
      }
      Err(e) => debug!(record = %id, error = %e, "unresolvable record left out"),
    },
  }
}

fn sweep_parent<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  scope: &ReleaseScope,
  set: &mut ClosureSet,
  node: &crate::graph::model::ContentNode,
) {
  let Some(parent_id) = node.parent else {
    return;
  };
  match accessor.get_node(parent_id) {
    Ok(parent) => {
      if parent.status_for(&scope.languages) == ReleaseStatus::Changed
        && !rule_for(parent.kind).excluded
        && set.insert(ObjectRef::Node(parent_id))
      {
        info!(parent = %parent_id, "changed parent folder added to closure");
      }
    }
    Err(e) => warn!(parent = %parent_id, error = %e, "parent not resolvable"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::content_graph::ContentGraph;
  use crate::graph::fixtures::GraphBuilder;
  use crate::graph::model::EdgeKind;
  use crate::graph::model::ReleaseStatus::*;
  use proptest::prelude::*;

  fn flat() -> Flags {
    Flags::default()
  }

  fn nodes(closure: &ReleaseClosure) -> Vec<NodeId> {
    closure.set.nodes().collect()
  }

  #[test]
  fn test_page_reference_with_unreleased_page() {
    let mut b = GraphBuilder::new();
    let q = b.node(NodeKind::Page, NeverReleased, None);
    let p = b.page_ref(Changed, None, q);
    let g = b.build();

    let closure = build_release_closure(&g, &[p], &flat(), &ClosureOptions::default()).unwrap();
    let members = nodes(&closure);
    assert_eq!(members.len(), 2);
    // page store first
    assert_eq!(members, vec![q, p]);
  }

  #[test]
  fn test_media_excluded_without_flag() {
    let mut b = GraphBuilder::new();
    let q = b.node(NodeKind::Page, Released, None);
    let m = b.node(NodeKind::Media, Changed, None);
    b.reference(q, m, EdgeKind::Media);
    let g = b.build();

    let closure = build_release_closure(&g, &[q], &flat(), &ClosureOptions::default()).unwrap();
    assert_eq!(nodes(&closure), vec![q]);

    let with_media = Flags {
      include_media: true,
      ..Flags::default()
    };
    let closure = build_release_closure(&g, &[q], &with_media, &ClosureOptions::default()).unwrap();
    assert_eq!(nodes(&closure), vec![q, m]);
  }

  #[test]
  fn test_unreleasable_reference_left_out() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, Changed, None);
    let group = b.node(NodeKind::DocumentGroup, NeverReleased, None);
    let released = b.node(NodeKind::Media, Released, None);
    b.reference(page, group, EdgeKind::Structural);
    b.reference(page, released, EdgeKind::Structural);
    let g = b.build();

    let with_media = Flags {
      include_media: true,
      ..Flags::default()
    };
    let closure = build_release_closure(&g, &[page], &with_media, &ClosureOptions::default()).unwrap();
    assert_eq!(nodes(&closure), vec![page]);
    assert_eq!(closure.references.len(), 2);
  }

  #[test]
  fn test_interactive_sweeps_changed_parent() {
    let mut b = GraphBuilder::new();
    let folder = b.node(NodeKind::SiteFolder, Changed, None);
    let pr = b.node(NodeKind::PageReference, Changed, Some(folder));
    let g = b.build();

    let interactive = ClosureOptions {
      interactive: true,
      ..Default::default()
    };
    let closure = build_release_closure(&g, &[pr], &flat(), &interactive).unwrap();
    assert_eq!(nodes(&closure), vec![folder, pr]);

    let closure = build_release_closure(&g, &[pr], &flat(), &ClosureOptions::default()).unwrap();
    assert_eq!(nodes(&closure), vec![pr]);
  }

  #[test]
  fn test_records_sort_last() {
    use crate::graph::model::{ReferenceEdge, RecordId, StructuredRecord};

    let mut b = GraphBuilder::new();
    let media = b.node(NodeKind::Media, Changed, None);
    let page = b.node(NodeKind::Page, Changed, None);
    b.record(StructuredRecord {
      id: RecordId(1),
      display_name: "row".to_string(),
      table: Some("products".to_string()),
      read_only: false,
      released: false,
      validation_errors: Vec::new(),
    });
    b.raw_edge(ReferenceEdge {
      source: ObjectRef::Node(media),
      target: ObjectRef::Record(RecordId(1)),
      kind: EdgeKind::Structural,
      broken: false,
    });
    b.reference(media, page, EdgeKind::Structural);
    let g = b.build();

    let closure = build_release_closure(&g, &[media], &flat(), &ClosureOptions::default()).unwrap();
    assert_eq!(
      closure.set.members(),
      &[ObjectRef::Node(media), ObjectRef::Record(RecordId(1))]
    );
  }

  #[test]
  fn test_template_start_is_excluded() {
    let mut b = GraphBuilder::new();
    let tpl = b.node(NodeKind::TemplateElement, Changed, None);
    let g = b.build();

    let closure = build_release_closure(&g, &[tpl], &flat(), &ClosureOptions::default()).unwrap();
    assert!(closure.set.is_empty());
  }

  #[test]
  fn test_missing_descendant_is_reported_not_fatal() {
    let mut b = GraphBuilder::new();
    let folder = b.node(NodeKind::PageFolder, Changed, None);
    let g = b.build();

    let closure = build_release_closure(&g, &[folder, NodeId(77)], &flat(), &ClosureOptions::default()).unwrap();
    assert_eq!(closure.unresolved, vec![NodeId(77)]);
    assert!(closure.set.contains_node(folder));
  }

  const KINDS: [NodeKind; 9] = [
    NodeKind::Page,
    NodeKind::PageFolder,
    NodeKind::PageReference,
    NodeKind::SiteFolder,
    NodeKind::DocumentGroup,
    NodeKind::Media,
    NodeKind::MediaFolder,
    NodeKind::GlobalContentPage,
    NodeKind::TemplateElement,
  ];

  const STATUSES: [ReleaseStatus; 3] = [NeverReleased, Changed, Released];

  fn random_graph(spec: &[(usize, usize, Option<usize>)], edges: &[(usize, usize, bool)]) -> ContentGraph {
    let mut b = GraphBuilder::new();
    let mut ids: Vec<NodeId> = Vec::new();
    for (kind, status, parent) in spec {
      let parent = parent.and_then(|p| ids.get(p % ids.len().max(1)).copied());
      ids.push(b.node(KINDS[kind % KINDS.len()], STATUSES[status % STATUSES.len()], parent));
    }
    for (from, to, media) in edges {
      let kind = if *media { EdgeKind::Media } else { EdgeKind::Structural };
      b.reference(ids[from % ids.len()], ids[to % ids.len()], kind);
    }
    b.build()
  }

  proptest! {
    #[test]
    fn prop_closure_is_idempotent_ordered_and_contains_start(
      spec in prop::collection::vec((0usize..9, 0usize..3, prop::option::of(0usize..8)), 1..12),
      edges in prop::collection::vec((0usize..12, 0usize..12, any::<bool>()), 0..24),
      include_media in any::<bool>(),
      recursive in any::<bool>(),
      start in 0usize..12,
    ) {
      let g = random_graph(&spec, &edges);
      let start = NodeId((start % spec.len()) as u64 + 1);
      let flags = Flags { include_media, recursive, languages: Vec::new() };

      let first = build_release_closure(&g, &[start], &flags, &ClosureOptions::default()).unwrap();
      let second = build_release_closure(&g, &[start], &flags, &ClosureOptions::default()).unwrap();
      prop_assert_eq!(first.set.members(), second.set.members());

      let start_kind = g.get_node(start).unwrap().kind;
      if start_kind != NodeKind::TemplateElement {
        prop_assert!(first.set.contains_node(start));
      }

      let ranks: Vec<u8> = first.set.members().iter().map(|m| store_rank(&g, m)).collect();
      prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "ranks out of order: {:?}", ranks);
    }
  }
}
