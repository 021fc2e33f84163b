//! Checks that run before anything is deleted

use crate::core::config::DeleteEnvironment;
use crate::core::error::{AbortError, RailResult};
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{ContentNode, NodeId, NodeKind, ObjectRef};
use crate::release::verdict::describe;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Kinds counted when asking whether a folder still has content
const CONTENT_KINDS: &[NodeKind] = &[
  NodeKind::TemplateElement,
  NodeKind::PageFolder,
  NodeKind::Page,
  NodeKind::SiteFolder,
  NodeKind::PageReference,
  NodeKind::DocumentGroup,
  NodeKind::StructuredRecordFolder,
  NodeKind::StructuredRecord,
  NodeKind::MediaFolder,
  NodeKind::Media,
  NodeKind::GlobalContentPage,
  NodeKind::GlobalContentFolder,
];

const SITE_STORE_KINDS: &[NodeKind] = &[NodeKind::SiteFolder, NodeKind::PageReference, NodeKind::DocumentGroup];

/// Labels of every object that still references the delete target.
///
/// Pages also count references into their sections. In the interactive
/// environment a page-reference also counts the references of its page,
/// without the page-reference itself.
pub fn related_objects<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  target: NodeId,
  environment: DeleteEnvironment,
) -> RailResult<Vec<String>> {
  let node = accessor.get_node(target)?;
  ensure_deletable(&node)?;

  let mut sources: Vec<ObjectRef> = Vec::new();
  let mut collect = |id: NodeId| -> RailResult<()> {
    for edge in accessor.incoming_references(id)? {
      if !edge.broken && !sources.contains(&edge.source) {
        sources.push(edge.source);
      }
    }
    Ok(())
  };

  collect(target)?;
  match node.kind {
    NodeKind::Page => {
      for section in accessor.children(target, &[NodeKind::Section], true)? {
        collect(section.id)?;
      }
    }
    NodeKind::PageReference if environment == DeleteEnvironment::Interactive => {
      if let Some(page) = node.page {
        collect(page)?;
        for section in accessor.children(page, &[NodeKind::Section], true)? {
          collect(section.id)?;
        }
      }
    }
    _ => {}
  }

  let own = ObjectRef::Node(target);
  let labels: Vec<String> = sources
    .iter()
    .filter(|s| **s != own)
    .map(|s| describe(accessor, s).display_name)
    .collect();

  if labels.is_empty() {
    info!(node = %node.label(), "no related objects, can be deleted");
  } else {
    warn!(node = %node.label(), related = labels.len(), "still referenced, cannot be deleted");
  }
  Ok(labels)
}

fn ensure_deletable(node: &ContentNode) -> RailResult<()> {
  let illegal = match node.kind {
    NodeKind::ProjectProperties | NodeKind::StructuredRecord | NodeKind::StructuredRecordFolder => true,
    NodeKind::GlobalContentFolder => node.is_root(),
    _ => false,
  };
  if illegal {
    return Err(
      AbortError::IllegalKind {
        operation: "delete",
        kind: node.kind,
        id: node.id,
      }
      .into(),
    );
  }
  Ok(())
}

/// What the prerequisite step found out about the target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisites {
  /// The target still has content below it; the user has to confirm
  pub has_children: bool,
  /// Deleting the target empties its site-store folder
  pub last_element: bool,
}

pub fn check_prerequisites<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  target: NodeId,
  environment: DeleteEnvironment,
) -> RailResult<Prerequisites> {
  let node = accessor.get_node(target)?;
  let has_children = !accessor.children(target, CONTENT_KINDS, true)?.is_empty();

  let mut last_element = false;
  if environment == DeleteEnvironment::Headless
    && SITE_STORE_KINDS.contains(&node.kind)
    && let Some(parent) = node.parent
  {
    last_element = accessor.children(parent, SITE_STORE_KINDS, false)?.len() == 1;
  }

  Ok(Prerequisites {
    has_children,
    last_element,
  })
}

/// Branch taken by `branch_if_folder`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
  Folder,
  Element,
}

pub fn branch_if_folder(node: &ContentNode) -> Branch {
  if node.kind.is_folder() && node.kind != NodeKind::StructuredRecordFolder {
    Branch::Folder
  } else {
    Branch::Element
  }
}
