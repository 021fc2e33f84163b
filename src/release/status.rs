//! Release state shown to editors before they start a workflow

use crate::core::error::RailResult;
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{ContentNode, NodeKind, ReleaseStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse state offered to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseState {
  InWorkflow,
  Changed,
  Released,
}

impl fmt::Display for ReleaseState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseState::InWorkflow => write!(f, "in-workflow"),
      ReleaseState::Changed => write!(f, "changed"),
      ReleaseState::Released => write!(f, "released"),
    }
  }
}

fn own_state(node: &ContentNode, languages: &[String]) -> ReleaseState {
  if node.has_task {
    ReleaseState::InWorkflow
  } else if node.status_for(languages) == ReleaseStatus::Released {
    ReleaseState::Released
  } else {
    ReleaseState::Changed
  }
}

/// State of `node` for `language` (`None` = all languages).
///
/// A released node takes its parent's state when the parent never reached the
/// release store, and a page-reference takes its page's state.
pub fn release_state<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  node: &ContentNode,
  language: Option<&str>,
) -> RailResult<ReleaseState> {
  let languages: Vec<String> = language.map(|l| vec![l.to_string()]).unwrap_or_default();

  let state = own_state(node, &languages);
  if state != ReleaseState::Released {
    return Ok(state);
  }

  if let Some(parent_id) = node.parent {
    let parent = accessor.get_node(parent_id)?;
    if !parent.is_root() && parent.status_for(&languages) == ReleaseStatus::NeverReleased {
      return Ok(own_state(&parent, &languages));
    }
  }

  if node.kind == NodeKind::PageReference
    && let Some(page_id) = node.page
  {
    let page = accessor.get_node(page_id)?;
    return Ok(own_state(&page, &languages));
  }

  Ok(ReleaseState::Released)
}

/// Nodes a workflow started on `node` would be grouped under
pub fn workflow_groups<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  node: &ContentNode,
) -> RailResult<Vec<ContentNode>> {
  match node.kind {
    NodeKind::PageReference => {
      if let Some(page_id) = node.page {
        let page = accessor.get_node(page_id)?;
        if page.has_task {
          return Ok(vec![page]);
        }
      }
      Ok(vec![node.clone()])
    }
    NodeKind::Page | NodeKind::DocumentGroup | NodeKind::StructuredRecord => Ok(vec![node.clone()]),
    _ => Ok(Vec::new()),
  }
}
