//! Release command implementation
//!
//! `release plan` runs the reference check and prints what a release would
//! publish. `release apply` drives the whole release workflow:
//! find related objects, test release, release.

use crate::commands::{OutputFormat, Target, Workbench, conflict};
use crate::core::config::RailConfig;
use crate::core::error::RailResult;
use crate::release::executor::{ApplyObserver, Silent};
use crate::ui::progress::ApplyProgress;
use crate::workflow::report;
use crate::workflow::{ConsoleDialog, DialogChannel, RecordingDialog, StepOutcome, Transition, release};
use serde_json::json;

/// Switches for `release apply`
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
  /// Release even when references were never released
  pub force: bool,
  /// Leave the snapshot file untouched
  pub no_write: bool,
  pub format: OutputFormat,
}

/// Run the release plan command
pub fn run_release_plan(target: Target, config: RailConfig, format: OutputFormat) -> RailResult<()> {
  let mut bench = Workbench::open(target, config)?;
  let mut recorded = RecordingDialog::answering(true);
  let mut console = ConsoleDialog::new(true);
  let dialog: &mut dyn DialogChannel = if format.is_json() { &mut recorded } else { &mut console };
  let mut observer = Silent;

  let references = release::find_related_objects(&mut bench.env(dialog, &mut observer))?;
  let plan = release::plan_release(&mut bench.env(dialog, &mut observer))?
    .with_summary(format!("reference check: {}", references.transition));
  bench.finish(false)?;

  if format.is_json() {
    let output = json!({
      "plan": plan,
      "references": references.transition,
      "dialogs": recorded.shown,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
  } else {
    println!("{}", plan.to_human_readable());
    if references.transition == Transition::ReleaseConflict {
      println!("⚠️  References need attention, `release apply` stops here without --force");
    }
  }
  Ok(())
}

/// Run the release apply command
pub fn run_release_apply(target: Target, config: RailConfig, options: ApplyOptions) -> RailResult<()> {
  let json = options.format.is_json();
  let mut bench = Workbench::open(target, config)?;

  let mut recorded = RecordingDialog::answering(true);
  let mut console = ConsoleDialog::new(true);
  let dialog: &mut dyn DialogChannel = if json { &mut recorded } else { &mut console };
  let mut progress = ApplyProgress::new("Releasing");
  let mut silent = Silent;
  let observer: &mut dyn ApplyObserver = if json { &mut silent } else { &mut progress };

  let mut steps: Vec<StepOutcome> = Vec::new();

  let references = release::find_related_objects(&mut bench.env(dialog, observer))?;
  steps.push(references.clone());
  if references.transition == Transition::ReleaseConflict {
    if !options.force {
      bench.finish(false)?;
      print_steps(json, &steps, &recorded.shown)?;
      return Err(conflict(
        &references,
        "References were never released or are still in a workflow; rerun with --force to release anyway",
      ));
    }
    steps.push(release::show_not_released_objects(&mut bench.env(dialog, observer))?);
  }

  let tested = release::test_release(&mut bench.env(dialog, observer))?;
  steps.push(tested.clone());
  if !tested.transition.is_success() {
    bench.finish(false)?;
    print_steps(json, &steps, &recorded.shown)?;
    return Err(conflict(&tested, failure_summary(&tested)));
  }

  let released = release::release(&mut bench.env(dialog, observer))?;
  steps.push(released.clone());
  bench.finish(!options.no_write)?;
  print_steps(json, &steps, &recorded.shown)?;

  if released.transition.is_success() {
    Ok(())
  } else {
    Err(conflict(&released, failure_summary(&released)))
  }
}

/// Conflict dialogs of a failed step, flattened into one message
pub(crate) fn failure_summary(outcome: &StepOutcome) -> String {
  match &outcome.report {
    Some(executed) => report::conflict_dialogs(&executed.conflicts)
      .into_iter()
      .map(|(_, body)| body)
      .collect::<Vec<_>>()
      .join("\n"),
    None => "Step forced to fail by the [workflow] switches in rail.toml".to_string(),
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
      let verb = if executed.dry_run { "checked" } else { "released" };
      println!("   {} {} object(s), skipped {}", verb, executed.applied.len(), executed.skipped.len());
    }
  }
  Ok(())
}
