//! Delete closure
//!
//! Headless deletes touch exactly one node and release its parent. Interactive
//! deletes of site-store elements prune upwards: a folder left empty and
//! unreferenced goes too, the first folder that keeps other children (or is
//! still referenced) is released instead and ends the walk. Store roots are
//! never deleted or released.

use crate::core::config::DeleteEnvironment;
use crate::core::error::RailResult;
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{ContentNode, NodeId, NodeKind, ObjectRef, StoreType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SITE_STORE_KINDS: &[NodeKind] = &[NodeKind::SiteFolder, NodeKind::PageReference, NodeKind::DocumentGroup];
const PAGE_STORE_KINDS: &[NodeKind] = &[NodeKind::PageFolder, NodeKind::Page];

/// What a delete removes and what it releases afterwards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSets {
  pub delete: Vec<NodeId>,
  pub release: Vec<NodeId>,
}

impl DeleteSets {
  fn delete(&mut self, id: NodeId) {
    if !self.delete.contains(&id) {
      self.delete.push(id);
    }
  }

  fn release(&mut self, id: NodeId) {
    if !self.release.contains(&id) && !self.delete.contains(&id) {
      self.release.push(id);
    }
  }

  /// Every node the delete touches, deletes first
  pub fn all(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.delete.iter().chain(self.release.iter()).copied()
  }
}

/// `build_delete_closure(startNode, env)`
pub fn build_delete_closure<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  target: NodeId,
  environment: DeleteEnvironment,
) -> RailResult<DeleteSets> {
  let node = accessor.get_node(target)?;
  let mut sets = DeleteSets::default();

  match environment {
    DeleteEnvironment::Headless => {
      sets.delete(target);
      if node.kind.store() != StoreType::TemplateStore
        && let Some(parent) = node.parent
      {
        sets.release(parent);
      }
    }
    DeleteEnvironment::Interactive => match node.kind {
      NodeKind::PageReference => {
        if let Some(page) = node.page {
          prune_page(accessor, &mut sets, target, page)?;
        }
        sets.delete(target);
        prune_upwards(accessor, &mut sets, &node, SITE_STORE_KINDS)?;
      }
      NodeKind::DocumentGroup => {
        sets.delete(target);
        prune_upwards(accessor, &mut sets, &node, SITE_STORE_KINDS)?;
      }
      kind => {
        let filter = own_store_kinds(kind);
        sets.delete(target);
        prune_upwards(accessor, &mut sets, &node, &filter)?;
      }
    },
  }

  debug!(
    target = %target,
    environment = %environment,
    delete = sets.delete.len(),
    release = sets.release.len(),
    "delete closure built"
  );
  Ok(sets)
}

/// Kinds counted as siblings for a node in `kind`'s store
fn own_store_kinds(kind: NodeKind) -> Vec<NodeKind> {
  let store = kind.store();
  NodeKind::ALL
    .iter()
    .copied()
    .filter(|k| k.store() == store && *k != NodeKind::Section)
    .collect()
}

/// A page only referenced by the page-reference being deleted goes with it
fn prune_page<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  sets: &mut DeleteSets,
  page_ref: NodeId,
  page: NodeId,
) -> RailResult<()> {
  let referrers = accessor
    .incoming_references(page)?
    .into_iter()
    .filter(|e| !e.broken && e.source != ObjectRef::Node(page_ref))
    .count();
  if referrers > 0 {
    debug!(page = %page, referrers, "page still referenced, kept");
    return Ok(());
  }

  let page_node = accessor.get_node(page)?;
  info!(page = %page, "page no longer referenced, deleted with its page-reference");
  sets.delete(page);
  prune_upwards(accessor, sets, &page_node, PAGE_STORE_KINDS)
}

fn prune_upwards<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  sets: &mut DeleteSets,
  from: &ContentNode,
  filter: &[NodeKind],
) -> RailResult<()> {
  let mut current = from.parent;
  while let Some(folder_id) = current {
    let folder = accessor.get_node(folder_id)?;
    if folder.is_root() {
      break;
    }

    let remaining = accessor
      .children(folder_id, filter, false)?
      .into_iter()
      .filter(|c| !sets.delete.contains(&c.id))
      .count();
    if remaining > 0 {
      debug!(folder = %folder_id, remaining, "folder keeps children, released");
      sets.release(folder_id);
      break;
    }

    let referenced = accessor
      .incoming_references(folder_id)?
      .into_iter()
      .any(|e| !e.broken && e.source.as_node().is_none_or(|s| !sets.delete.contains(&s)));
    if referenced {
      debug!(folder = %folder_id, "emptied folder still referenced, released");
      sets.release(folder_id);
      break;
    }

    info!(folder = %folder_id, "emptied folder deleted");
    sets.delete(folder_id);
    current = folder.parent;
  }
  Ok(())
}
