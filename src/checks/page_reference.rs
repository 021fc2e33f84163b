//! Page-references must point at a page that still exists

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::RailResult;
use crate::graph::model::NodeKind;

pub struct PageReferenceTargetCheck;

impl Check for PageReferenceTargetCheck {
  fn name(&self) -> &str {
    "page-reference-target"
  }

  fn description(&self) -> &str {
    "Checks that a page-reference resolves to its page"
  }

  fn applies_to(&self, kind: NodeKind) -> bool {
    kind == NodeKind::PageReference
  }

  fn run(&self, ctx: &CheckContext) -> RailResult<CheckResult> {
    match (&ctx.node.page, &ctx.page) {
      (Some(_), Some(page)) if page.kind == NodeKind::Page => {
        Ok(CheckResult::pass(self.name(), format!("points at {}", page.label())))
      }
      (Some(id), Some(other)) => Ok(CheckResult::error(
        self.name(),
        format!("target {} is a {}, not a page", id, other.kind),
        Some("Point the page-reference at a page"),
      )),
      (Some(id), None) => Ok(CheckResult::error(
        self.name(),
        format!("target page {} does not exist", id),
        Some("Point the page-reference at an existing page or delete it"),
      )),
      (None, _) => Ok(CheckResult::error(
        self.name(),
        "no target page set",
        Some("Select a page for the page-reference"),
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::model::{ContentNode, NodeId, ReleaseStatus};

  fn page_ref(page: Option<u64>) -> ContentNode {
    let mut node = ContentNode::new(2, NodeKind::PageReference, ReleaseStatus::Changed);
    node.page = page.map(NodeId);
    node
  }

  fn ctx(node: ContentNode, page: Option<ContentNode>) -> CheckContext {
    CheckContext {
      subject: node.label(),
      node,
      page,
      languages: Vec::new(),
    }
  }

  #[test]
  fn test_resolved_page_passes() {
    let page = ContentNode::new(1, NodeKind::Page, ReleaseStatus::Released);
    let result = PageReferenceTargetCheck.run(&ctx(page_ref(Some(1)), Some(page))).unwrap();
    assert!(result.passed);
  }

  #[test]
  fn test_missing_page_blocks() {
    let result = PageReferenceTargetCheck.run(&ctx(page_ref(Some(9)), None)).unwrap();
    assert!(result.is_blocking());
    assert!(result.message.contains("does not exist"));

    let result = PageReferenceTargetCheck.run(&ctx(page_ref(None), None)).unwrap();
    assert!(result.is_blocking());
  }

  #[test]
  fn test_only_page_references() {
    assert!(PageReferenceTargetCheck.applies_to(NodeKind::PageReference));
    assert!(!PageReferenceTargetCheck.applies_to(NodeKind::Page));
  }
}
