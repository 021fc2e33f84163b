//! Missing display names are allowed but make conflict reports hard to read

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::RailResult;

pub struct DisplayNameCheck;

impl Check for DisplayNameCheck {
  fn name(&self) -> &str {
    "display-name"
  }

  fn description(&self) -> &str {
    "Warns about nodes without a display name"
  }

  fn run(&self, ctx: &CheckContext) -> RailResult<CheckResult> {
    if ctx.node.display_name.trim().is_empty() {
      Ok(CheckResult::warning(
        self.name(),
        format!("node {} has no display name", ctx.node.id),
        Some("Give the node a display name"),
      ))
    } else {
      Ok(CheckResult::pass(self.name(), "display name set"))
    }
  }
}
