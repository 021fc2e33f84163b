//! Business-rule errors the editor attached to a node's form

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::RailResult;
use serde_json::json;

pub struct FormErrorsCheck;

impl Check for FormErrorsCheck {
  fn name(&self) -> &str {
    "form-errors"
  }

  fn description(&self) -> &str {
    "Rejects nodes whose form carries validation errors"
  }

  fn run(&self, ctx: &CheckContext) -> RailResult<CheckResult> {
    let errors = &ctx.node.validation_errors;
    if errors.is_empty() {
      return Ok(CheckResult::pass(self.name(), "form is valid"));
    }

    let origin = if ctx.subject == ctx.node.label() {
      String::new()
    } else {
      format!(" in {}", ctx.node.label())
    };
    Ok(
      CheckResult::error(
        self.name(),
        format!("{}{}", errors.join("; "), origin),
        Some("Correct the form input and start the release again"),
      )
      .with_details(json!({ "node": ctx.node.id, "errors": errors })),
    )
  }
}
