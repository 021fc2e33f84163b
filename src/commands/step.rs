//! Step command: run one workflow step and print the transition it fires
//!
//! An outer workflow engine calls this once per step, passing the same
//! `--session` file each time so results flow from one step to the next.

use crate::commands::{OutputFormat, Target, Workbench};
use crate::core::config::RailConfig;
use crate::core::error::RailResult;
use crate::release::executor::Silent;
use crate::workflow::{ConsoleDialog, DialogChannel, RecordingDialog, StepOutcome, delete, release};
use serde_json::json;
use tracing::info;

/// Workflow steps reachable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StepName {
  ReleaseFindRelated,
  ReleaseTest,
  Release,
  ReleaseShowNotReleased,
  DeletePrerequisites,
  DeleteFindRelated,
  DeleteTest,
  Delete,
  DeleteBranch,
  DeleteWarning,
}

impl StepName {
  /// Steps that change the store
  fn writes(self) -> bool {
    matches!(self, StepName::Release | StepName::Delete)
  }
}

/// Switches for `step`
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOptions {
  /// Answer yes to every question
  pub yes: bool,
  /// Leave the snapshot file untouched
  pub no_write: bool,
  pub format: OutputFormat,
}

/// Run the step command
pub fn run_step(target: Target, config: RailConfig, step: StepName, options: StepOptions) -> RailResult<()> {
  let json = options.format.is_json();
  let mut bench = Workbench::open(target, config)?;
  let mut recorded = RecordingDialog::answering(options.yes);
  let mut console = ConsoleDialog::new(options.yes);
  let dialog: &mut dyn DialogChannel = if json { &mut recorded } else { &mut console };
  let mut observer = Silent;

  let outcome: StepOutcome = {
    let mut env = bench.env(dialog, &mut observer);
    match step {
      StepName::ReleaseFindRelated => release::find_related_objects(&mut env)?,
      StepName::ReleaseTest => release::test_release(&mut env)?,
      StepName::Release => release::release(&mut env)?,
      StepName::ReleaseShowNotReleased => release::show_not_released_objects(&mut env)?,
      StepName::DeletePrerequisites => delete::check_prerequisites(&mut env)?,
      StepName::DeleteFindRelated => delete::find_related_objects(&mut env)?,
      StepName::DeleteTest => delete::test_delete(&mut env)?,
      StepName::Delete => delete::delete(&mut env)?,
      StepName::DeleteBranch => delete::branch_if_folder(&mut env)?,
      StepName::DeleteWarning => delete::show_warning(&mut env)?,
    }
  };
  info!(step = ?step, transition = %outcome.transition, "step finished");

  bench.finish(step.writes() && !options.no_write)?;

  if json {
    let output = json!({
      "transition": outcome.transition,
      "report": outcome.report,
      "dialogs": recorded.shown,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
  } else {
    println!("{}", outcome.transition);
  }
  Ok(())
}
