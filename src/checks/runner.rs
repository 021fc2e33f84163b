//! Check runner for node validation

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{ContentNode, NodeKind};
use crate::release::verdict::ValidationReport;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Check runner that executes multiple checks
pub struct CheckRunner {
  checks: Vec<Arc<dyn Check>>,
}

impl CheckRunner {
  /// Create a new check runner
  pub fn new() -> Self {
    Self { checks: Vec::new() }
  }

  /// Add a check to the runner
  pub fn add_check(&mut self, check: Arc<dyn Check>) {
    self.checks.push(check);
  }

  /// Run all checks and collect results
  pub fn run_all(&self, ctx: &CheckContext) -> Result<Vec<CheckResult>> {
    let mut results = Vec::new();

    for check in &self.checks {
      if !check.applies_to(ctx.node.kind) {
        continue;
      }

      match check.run(ctx) {
        Ok(result) => results.push(result),
        Err(err) => {
          // A rule that cannot run counts as a failed validation
          results.push(CheckResult::error(
            check.name(),
            format!("Check failed to run: {}", err),
            Some("Check the logs for more details"),
          ));
        }
      }
    }

    Ok(results)
  }

  /// Validate one node into a report; warnings are logged, errors are filed
  pub fn validate(&self, ctx: &CheckContext) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    for result in self.run_all(ctx)? {
      if result.is_blocking() {
        report.add(&ctx.subject, format!("{}: {}", result.check_name, result.message));
      } else if !result.passed {
        warn!(subject = %ctx.subject, check = %result.check_name, "{}", result.message);
      }
    }
    Ok(report)
  }

  /// Validate a node and, for pages, every section below it.
  /// Section failures are filed under the page.
  pub fn validate_tree<A: ContentGraphAccessor + ?Sized>(
    &self,
    accessor: &A,
    node: &ContentNode,
    languages: &[String],
  ) -> Result<ValidationReport> {
    let page = match (node.kind, node.page) {
      (NodeKind::PageReference, Some(page)) => accessor.get_node(page).ok(),
      _ => None,
    };
    let subject = node.label();
    let mut report = self.validate(&CheckContext {
      node: node.clone(),
      subject: subject.clone(),
      page,
      languages: languages.to_vec(),
    })?;

    if node.kind == NodeKind::Page {
      for section in accessor.children(node.id, &[NodeKind::Section], true)? {
        report.merge(self.validate(&CheckContext {
          node: section,
          subject: subject.clone(),
          page: None,
          languages: languages.to_vec(),
        })?);
      }
    }
    debug!(node = %node.id, failures = report.len(), "validated");
    Ok(report)
  }

  /// Get all registered checks
  pub fn checks(&self) -> &[Arc<dyn Check>] {
    &self.checks
  }
}

impl Default for CheckRunner {
  fn default() -> Self {
    Self::new()
  }
}

/// Create a runner with all built-in checks
pub fn create_default_runner() -> CheckRunner {
  let mut runner = CheckRunner::new();

  runner.add_check(Arc::new(super::form_errors::FormErrorsCheck));
  runner.add_check(Arc::new(super::page_reference::PageReferenceTargetCheck));
  runner.add_check(Arc::new(super::display_name::DisplayNameCheck));

  runner
}
