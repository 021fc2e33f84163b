//! Delete command implementation

use crate::commands::release::failure_summary;
use crate::commands::{OutputFormat, Target, Workbench, conflict};
use crate::core::config::RailConfig;
use crate::core::context::WorkflowContext;
use crate::core::error::RailResult;
use crate::release::executor::{ApplyObserver, Silent};
use crate::ui::progress::ApplyProgress;
use crate::workflow::{ConsoleDialog, DialogChannel, RecordingDialog, StepOutcome, Transition, delete};
use serde_json::json;

/// Switches for `delete apply`
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
  /// Delete even when other objects still reference the target
  pub force: bool,
  /// Answer yes to every question
  pub yes: bool,
  /// Leave the snapshot file untouched
  pub no_write: bool,
  pub format: OutputFormat,
}

/// Run the delete plan command
pub fn run_delete_plan(target: Target, config: RailConfig, format: OutputFormat) -> RailResult<()> {
  let mut bench = Workbench::open(target, config)?;
  let mut dialog = RecordingDialog::answering(true);
  let mut observer = Silent;

  let branch = delete::branch_if_folder(&mut bench.env(&mut dialog, &mut observer))?;
  let references = delete::find_related_objects(&mut bench.env(&mut dialog, &mut observer))?;
  let plan = delete::plan_delete(&mut bench.env(&mut dialog, &mut observer))?
    .with_summary(format!("{}, reference check: {}", branch.transition, references.transition));
  let referenced_by = WorkflowContext::load(&bench.session)?.referenced_objects;
  bench.finish(false)?;

  if format.is_json() {
    let output = json!({
      "plan": plan,
      "references": references.transition,
      "referenced_by": referenced_by,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
  } else {
    println!("{}", plan.to_human_readable());
    if !referenced_by.is_empty() {
      println!("⚠️  Still referenced by:");
      for label in &referenced_by {
        println!("   {}", label);
      }
    }
  }
  Ok(())
}

/// Run the delete apply command
pub fn run_delete_apply(target: Target, config: RailConfig, options: ApplyOptions) -> RailResult<()> {
  let json = options.format.is_json();
  let mut bench = Workbench::open(target, config)?;

  let mut recorded = RecordingDialog::answering(options.yes);
  let mut console = ConsoleDialog::new(options.yes);
  let dialog: &mut dyn DialogChannel = if json { &mut recorded } else { &mut console };
  let mut progress = ApplyProgress::new("Deleting");
  let mut silent = Silent;
  let observer: &mut dyn ApplyObserver = if json { &mut silent } else { &mut progress };

  let mut steps: Vec<StepOutcome> = Vec::new();

  steps.push(delete::branch_if_folder(&mut bench.env(dialog, observer))?);

  let prerequisites = delete::check_prerequisites(&mut bench.env(dialog, observer))?;
  steps.push(prerequisites.clone());
  match prerequisites.transition {
    Transition::AbortDeletion => {
      bench.finish(false)?;
      print_steps(json, &steps, &recorded.shown)?;
      if !json {
        println!("Deletion aborted, nothing was changed");
      }
      return Ok(());
    }
    Transition::CheckConflict => {
      bench.finish(false)?;
      print_steps(json, &steps, &recorded.shown)?;
      return Err(conflict(&prerequisites, failure_summary(&prerequisites)));
    }
    _ => {}
  }

  let references = delete::find_related_objects(&mut bench.env(dialog, observer))?;
  steps.push(references.clone());
  if references.transition == Transition::ReferenceConflict {
    if !options.force {
      let referenced_by = WorkflowContext::load(&bench.session)?.referenced_objects;
      bench.finish(false)?;
      print_steps(json, &steps, &recorded.shown)?;
      return Err(conflict(
        &references,
        format!(
          "Still referenced by:\n{}\nrerun with --force to delete anyway",
          referenced_by.join("\n")
        ),
      ));
    }
    steps.push(delete::show_warning(&mut bench.env(dialog, observer))?);
  }

  let tested = delete::test_delete(&mut bench.env(dialog, observer))?;
  steps.push(tested.clone());
  if !tested.transition.is_success() {
    let locked = WorkflowContext::load(&bench.session)?.locked_objects;
    bench.finish(false)?;
    print_steps(json, &steps, &recorded.shown)?;
    let summary = if locked.is_empty() {
      failure_summary(&tested)
    } else {
      crate::workflow::report::locked_message(&locked)
    };
    return Err(conflict(&tested, summary));
  }

  let deleted = delete::delete(&mut bench.env(dialog, observer))?;
  steps.push(deleted.clone());
  bench.finish(!options.no_write)?;
  print_steps(json, &steps, &recorded.shown)?;

  if deleted.transition.is_success() {
    Ok(())
  } else {
    Err(conflict(&deleted, failure_summary(&deleted)))
  }
}

fn print_steps(json: bool, steps: &[StepOutcome], dialogs: &[(String, String)]) -> RailResult<()> {
  if json {
    let output = json!({ "steps": steps, "dialogs": dialogs });
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  println!();
  for step in steps {
    let icon = if step.transition.is_success() { "✅" } else { "❌" };
    println!("{} {}", icon, step.transition);
    if let Some(executed) = &step.report {
      println!("   changed {} object(s)", executed.applied.len());
    }
  }
  Ok(())
}
