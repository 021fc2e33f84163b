//! Delete workflow steps

use crate::core::context::WorkflowContext;
use crate::core::error::RailResult;
use crate::core::plan::Plan;
use crate::delete::{self as deletion, Branch};
use crate::graph::accessor::ContentGraphAccessor;
use crate::workflow::report;
use crate::workflow::{StepEnv, StepOutcome, Transition};
use tracing::{info, warn};

const WARNING_TITLE: &str = "Warning";

/// Folder content and last-element checks before anything else runs
pub fn check_prerequisites<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  if env.config.workflow.fail_check {
    info!("prerequisite check forced to fail");
    return Ok(StepOutcome::to(Transition::CheckConflict));
  }
  let ctx = WorkflowContext::load(env.session)?;
  let target = env.start_node("delete")?;
  let found = deletion::check_prerequisites(&*env.accessor, target, env.config.delete.environment)?;

  if found.has_children {
    let confirmed = env.suppress_dialogs(&ctx)
      || env
        .dialog
        .ask_yes_no(WARNING_TITLE, "The element still has children. Delete it with everything below?");
    if !confirmed {
      info!(node = %target, "deletion declined");
      return Ok(StepOutcome::to(Transition::AbortDeletion));
    }
  }
  if found.last_element {
    env.show(
      &ctx,
      &[(
        WARNING_TITLE.to_string(),
        "This is the last element of its folder.".to_string(),
      )],
    );
  }
  Ok(StepOutcome::to(Transition::FolderOk))
}

/// Objects that still reference the target block the delete
pub fn find_related_objects<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  let mut ctx = WorkflowContext::load(env.session)?;
  let target = env.start_node("delete")?;
  ctx.referenced_objects = deletion::related_objects(&*env.accessor, target, env.config.delete.environment)?;
  ctx.store(env.session)?;

  if ctx.referenced_objects.is_empty() {
    Ok(StepOutcome::to(Transition::ReferenceOk))
  } else {
    Ok(StepOutcome::to(Transition::ReferenceConflict))
  }
}

/// Check-only delete: nothing the delete touches may be locked elsewhere
pub fn test_delete<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  if env.config.workflow.fail_check {
    info!("test delete forced to fail");
    return Ok(StepOutcome::to(Transition::TestFailed));
  }
  let mut ctx = WorkflowContext::load(env.session)?;
  let target = env.start_node("delete")?;
  let sets = deletion::build_delete_closure(&*env.accessor, target, env.config.delete.environment)?;
  let check = deletion::test_delete(&*env.accessor, &sets);
  ctx.locked_objects = check.locked;
  ctx.store(env.session)?;

  if check.success {
    info!("test delete successful");
    Ok(StepOutcome::to(Transition::TestFinished))
  } else {
    let message = report::locked_message(&ctx.locked_objects);
    env.show(&ctx, &[("Locked objects".to_string(), message)]);
    Ok(StepOutcome::to(Transition::TestFailed))
  }
}

/// Delete the closure, then release what it leaves behind
pub fn delete<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  if env.config.workflow.fail_apply {
    info!("delete forced to fail");
    return Ok(StepOutcome::to(Transition::DeleteFailed));
  }
  let ctx = WorkflowContext::load(env.session)?;
  let target = env.start_node("delete")?;
  let sets = deletion::build_delete_closure(&*env.accessor, target, env.config.delete.environment)?;
  let executed = deletion::execute_delete(&mut *env.accessor, &sets, target, &mut *env.observer)?;

  if executed.success {
    info!("delete successful");
    Ok(StepOutcome::with_report(Transition::Finish, executed))
  } else {
    warn!("delete failed");
    env.show(&ctx, &report::conflict_dialogs(&executed.conflicts));
    Ok(StepOutcome::with_report(Transition::DeleteFailed, executed))
  }
}

/// Plan of what the delete would remove and release
pub fn plan_delete<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<Plan> {
  let target = env.start_node("delete")?;
  let sets = deletion::build_delete_closure(&*env.accessor, target, env.config.delete.environment)?;
  Ok(Plan::for_delete(&*env.accessor, &sets, target))
}

pub fn branch_if_folder<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  let target = env.start_node("branch")?;
  let node = env.accessor.get_node(target)?;
  Ok(StepOutcome::to(match deletion::branch_if_folder(&node) {
    Branch::Folder => Transition::Folder,
    Branch::Element => Transition::Element,
  }))
}

/// Warn about remaining references and let the delete go on
pub fn show_warning<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  let ctx = WorkflowContext::load(env.session)?;
  let mut message = String::from("Deleting this element breaks references from other objects.");
  if !ctx.referenced_objects.is_empty() {
    message.push_str("\n\n");
    message.push_str(&ctx.referenced_objects.join("\n"));
  }
  env.show(&ctx, &[(WARNING_TITLE.to_string(), message)]);
  Ok(StepOutcome::to(Transition::ReferenceOk2))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::DeleteEnvironment;
  use crate::graph::fixtures::GraphBuilder;
  use crate::graph::model::ReleaseStatus::*;
  use crate::graph::model::{EdgeKind, NodeKind, ObjectRef, RecordId, ReleaseStatus};
  use crate::workflow::harness::Harness;

  fn site() -> (Harness, [crate::graph::model::NodeId; 3]) {
    let mut b = GraphBuilder::new();
    let root = b.node(NodeKind::SiteRoot, Released, None);
    let folder = b.node(NodeKind::SiteFolder, Released, Some(root));
    let group = b.node(NodeKind::DocumentGroup, Released, Some(folder));
    (Harness::new(b.build()), [root, folder, group])
  }

  #[test]
  fn test_declined_folder_delete_aborts() {
    let (mut h, [_, folder, _]) = site();
    h.dialog.answer = false;
    let outcome = check_prerequisites(&mut h.env(ObjectRef::Node(folder))).unwrap();
    assert_eq!(outcome.transition, Transition::AbortDeletion);
    assert_eq!(h.dialog.asked.len(), 1);

    h.dialog.answer = true;
    let outcome = check_prerequisites(&mut h.env(ObjectRef::Node(folder))).unwrap();
    assert_eq!(outcome.transition, Transition::FolderOk);
  }

  #[test]
  fn test_last_element_warns_in_headless() {
    let (mut h, [_, _, group]) = site();
    let outcome = check_prerequisites(&mut h.env(ObjectRef::Node(group))).unwrap();
    assert_eq!(outcome.transition, Transition::FolderOk);
    assert!(h.dialog.asked.is_empty());
    assert_eq!(h.dialog.shown.len(), 1);
  }

  #[test]
  fn test_check_switch_reports_conflict() {
    let (mut h, [_, _, group]) = site();
    h.config.workflow.fail_check = true;
    let outcome = check_prerequisites(&mut h.env(ObjectRef::Node(group))).unwrap();
    assert_eq!(outcome.transition, Transition::CheckConflict);
  }

  #[test]
  fn test_referenced_target_is_a_conflict() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, Released, None);
    let linker = b.node(NodeKind::Page, Released, None);
    b.reference(linker, page, EdgeKind::Structural);
    let mut h = Harness::new(b.build());

    let outcome = find_related_objects(&mut h.env(ObjectRef::Node(page))).unwrap();
    assert_eq!(outcome.transition, Transition::ReferenceConflict);
    let label = h.graph.get_node(linker).unwrap().label();
    assert_eq!(h.context().referenced_objects, vec![label.clone()]);

    let outcome = show_warning(&mut h.env(ObjectRef::Node(page))).unwrap();
    assert_eq!(outcome.transition, Transition::ReferenceOk2);
    assert!(h.dialog.shown[0].1.contains(&label));
  }

  #[test]
  fn test_record_start_aborts() {
    let (mut h, _) = site();
    let err = find_related_objects(&mut h.env(ObjectRef::Record(RecordId(3)))).unwrap_err();
    assert!(err.is_abort());
  }

  #[test]
  fn test_locked_objects_fail_test_delete() {
    let (mut h, [_, folder, group]) = site();
    h.graph.state.locked_elsewhere.insert(group);
    let outcome = test_delete(&mut h.env(ObjectRef::Node(group))).unwrap();
    assert_eq!(outcome.transition, Transition::TestFailed);
    assert_eq!(h.context().locked_objects.len(), 1);
    assert!(h.dialog.shown[0].1.contains("(document-group)"));
    assert!(h.graph.get_node(folder).is_ok());
  }

  #[test]
  fn test_interactive_delete_prunes_folder() {
    let (mut h, [root, folder, group]) = site();
    h.config.delete.environment = DeleteEnvironment::Interactive;

    assert_eq!(
      test_delete(&mut h.env(ObjectRef::Node(group))).unwrap().transition,
      Transition::TestFinished
    );
    let outcome = delete(&mut h.env(ObjectRef::Node(group))).unwrap();
    assert_eq!(outcome.transition, Transition::Finish);
    assert!(h.graph.get_node(group).is_err());
    assert!(h.graph.get_node(folder).is_err());
    assert!(h.graph.get_node(root).is_ok());
  }

  #[test]
  fn test_denied_delete_fails() {
    let (mut h, [_, folder, group]) = site();
    h.graph.state.denied.insert(group);
    let outcome = delete(&mut h.env(ObjectRef::Node(group))).unwrap();
    assert_eq!(outcome.transition, Transition::DeleteFailed);
    assert_eq!(h.graph.get_node(folder).unwrap().status, ReleaseStatus::Released);
    assert_eq!(h.dialog.shown[0].0, "Missing permissions");
  }

  #[test]
  fn test_plan_deletes_then_releases_parent() {
    let (mut h, [_, folder, group]) = site();
    let plan = plan_delete(&mut h.env(ObjectRef::Node(group))).unwrap();

    assert!(plan.metadata.is_destructive);
    assert_eq!(plan.len(), 2);
    assert!(h.graph.get_node(group).is_ok());
    assert_eq!(h.graph.get_node(folder).unwrap().status, ReleaseStatus::Released);
  }

  #[test]
  fn test_branch_if_folder() {
    let (mut h, [_, folder, group]) = site();
    assert_eq!(
      branch_if_folder(&mut h.env(ObjectRef::Node(folder))).unwrap().transition,
      Transition::Folder
    );
    assert_eq!(
      branch_if_folder(&mut h.env(ObjectRef::Node(group))).unwrap().transition,
      Transition::Element
    );
  }
}
