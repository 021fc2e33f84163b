//! Release workflow steps

use crate::core::context::WorkflowContext;
use crate::core::error::{AbortError, RailResult};
use crate::core::plan::{Operation, OperationType, Plan};
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{EdgeKind, Flags, NodeId, NodeKind, ObjectRef, RecordId, ReleaseStatus};
use crate::release::closure::{ClosureOptions, ReleaseClosure, build_release_closure};
use crate::release::eligibility::{ReleaseScope, rule_for};
use crate::release::executor::{ExecuteOptions, ExecutionReport, execute_record_release, execute_release};
use crate::release::verdict::{Conflict, Finding, ReferenceCheck, Signal, check_references};
use crate::workflow::report::{self, CONFLICTS_TITLE};
use crate::workflow::{StepEnv, StepOutcome, Transition};
use tracing::{info, warn};

/// Check the references of the start node (or of every related page-reference)
/// and decide whether the release can go ahead.
pub fn find_related_objects<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  let mut ctx = WorkflowContext::load(env.session)?;
  let flags = env.config.release.flags();

  let check = match env.start {
    ObjectRef::Record(record) => record_reference_check(&*env.accessor, record, &flags)?,
    ObjectRef::Node(start) => {
      if flags.recursive {
        remember_recursive_children(&*env.accessor, start, &mut ctx)?;
      }
      let targets = if ctx.related_page_refs.is_empty() {
        vec![start]
      } else {
        resolve_page_refs(&*env.accessor, &ctx.related_page_refs)?
      };
      let custom = if ctx.related_page_refs.is_empty() {
        Vec::new()
      } else {
        with_pages(&*env.accessor, &targets)
      };

      let recursive_set = ctx.recursive_ids();
      let mut combined = ReferenceCheck::default();
      for target in targets {
        let mut start_nodes = vec![target];
        if target == start {
          start_nodes.extend(ctx.recursive_children.values().copied());
        }
        let options = ClosureOptions {
          interactive: env.config.is_interactive(),
          custom_targets: custom.clone(),
        };
        let closure = build_release_closure(&*env.accessor, &start_nodes, &flags, &options)?;
        let scope = ReleaseScope::resolve(&*env.accessor, target, flags.recursive, flags.languages.clone())?
          .with_custom_targets(custom.iter().copied());
        combined.merge(check_references(&*env.accessor, &closure, &scope, &recursive_set)?);
      }
      combined
    }
  };

  ctx.record_reference_check(&check, flags.recursive);
  ctx.store(env.session)?;

  if check.verdict.has_release_issues(flags.include_media) {
    warn!(
      not_released = check.not_released.len(),
      broken = !check.verdict.no_broken_references,
      "release has conflicts"
    );
    env.show(&ctx, &report::reference_dialogs(&ctx));
    Ok(StepOutcome::to(Transition::ReleaseConflict))
  } else {
    if !check.in_workflow.is_empty() {
      warn!(objects = check.in_workflow.len(), "referenced objects have pending tasks");
    }
    info!("references ok");
    Ok(StepOutcome::to(Transition::ReferenceOk))
  }
}

/// Check-only release pass
pub fn test_release<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  let ctx = WorkflowContext::load(env.session)?;
  if env.config.workflow.fail_check {
    info!("test release forced to fail");
    return Ok(StepOutcome::to(Transition::TestFailed));
  }

  let executed = run_release(env, &ctx, true)?;
  if executed.success {
    info!("test release successful");
    Ok(StepOutcome::with_report(Transition::TestFinished, executed))
  } else {
    env.show(&ctx, &report::conflict_dialogs(&executed.conflicts));
    Ok(StepOutcome::with_report(Transition::TestFailed, executed))
  }
}

/// Real release pass
pub fn release<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<StepOutcome> {
  let ctx = WorkflowContext::load(env.session)?;
  if env.config.workflow.fail_apply {
    info!("release forced to fail");
    return Ok(StepOutcome::to(Transition::ReleaseFailed));
  }

  let executed = run_release(env, &ctx, false)?;
  if executed.success {
    info!("release successful");
    Ok(StepOutcome::with_report(Transition::Finish, executed))
  } else {
    env.show(&ctx, &report::conflict_dialogs(&executed.conflicts));
    Ok(StepOutcome::with_report(Transition::ReleaseFailed, executed))
  }
}

/// Show what an earlier reference check left in the session
pub fn show_not_released_objects<A: ContentGraphAccessor + ?Sized>(
  env: &mut StepEnv<'_, A>,
) -> RailResult<StepOutcome> {
  let ctx = WorkflowContext::load(env.session)?;
  let message = report::not_released_message(&ctx.not_released, ctx.broken_references);
  env.show(&ctx, &[(CONFLICTS_TITLE.to_string(), message)]);
  Ok(StepOutcome::to(Transition::CheckNotReleasedObjects))
}

/// Plan of the release the real pass would run
pub fn plan_release<A: ContentGraphAccessor + ?Sized>(env: &mut StepEnv<'_, A>) -> RailResult<Plan> {
  let ctx = WorkflowContext::load(env.session)?;
  match env.start {
    ObjectRef::Record(record) => {
      let label = env.accessor.get_record(record)?.label();
      let mut plan = Plan::new(OperationType::Release, label.clone());
      plan.add_operation(Operation::ReleaseRecord { record, label });
      Ok(plan)
    }
    ObjectRef::Node(start) => {
      let (closure, scope) = prepare(env, &ctx, start)?;
      Ok(Plan::for_release(&*env.accessor, &closure, &scope, false))
    }
  }
}

/// Build the closure for this run and hand it to the matching executor
fn run_release<A: ContentGraphAccessor + ?Sized>(
  env: &mut StepEnv<'_, A>,
  ctx: &WorkflowContext,
  dry_run: bool,
) -> RailResult<ExecutionReport> {
  let options = ExecuteOptions {
    dry_run,
    project: env.project.clone(),
  };

  let start = match env.start {
    ObjectRef::Record(record) => {
      let flags = env.config.release.flags();
      return execute_record_release(&mut *env.accessor, record, &flags, &options, &mut *env.observer);
    }
    ObjectRef::Node(start) => start,
  };

  let (closure, scope) = prepare(env, ctx, start)?;
  execute_release(
    &mut *env.accessor,
    &closure,
    &scope,
    env.runner,
    &options,
    &mut *env.observer,
  )
}

/// Closure and executor scope for a workflow started on `start`.
///
/// A page-reference list in the session replaces the start node; those
/// page-references and their pages become custom targets.
fn prepare<A: ContentGraphAccessor + ?Sized>(
  env: &StepEnv<'_, A>,
  ctx: &WorkflowContext,
  start: NodeId,
) -> RailResult<(ReleaseClosure, ReleaseScope)> {
  let flags = env.config.release.flags();
  let (start_nodes, custom) = if ctx.release_page_refs.is_empty() {
    let mut nodes = vec![start];
    nodes.extend(ctx.recursive_children.values().copied());
    (nodes, Vec::new())
  } else {
    let page_refs = resolve_page_refs(&*env.accessor, &ctx.release_page_refs)?;
    let custom = with_pages(&*env.accessor, &page_refs);
    (page_refs, custom)
  };

  let options = ClosureOptions {
    interactive: env.config.is_interactive(),
    custom_targets: custom.clone(),
  };
  let closure = build_release_closure(&*env.accessor, &start_nodes, &flags, &options)?;
  let scope = ReleaseScope::resolve(&*env.accessor, start, flags.recursive, flags.languages.clone())?
    .with_custom_targets(custom);
  Ok((closure, scope))
}

/// Page-reference uids from the session, resolved to ids
fn resolve_page_refs<A: ContentGraphAccessor + ?Sized>(accessor: &A, uids: &[String]) -> RailResult<Vec<NodeId>> {
  let mut ids = Vec::with_capacity(uids.len());
  for uid in uids {
    match accessor.node_by_uid(uid)? {
      Some(node) if node.kind == NodeKind::PageReference => ids.push(node.id),
      Some(node) => {
        return Err(
          AbortError::IllegalKind {
            operation: "release as page-reference",
            kind: node.kind,
            id: node.id,
          }
          .into(),
        );
      }
      None => return Err(AbortError::Inconsistent(format!("page-reference {} not found", uid)).into()),
    }
  }
  Ok(ids)
}

/// Page-references plus the pages behind them
fn with_pages<A: ContentGraphAccessor + ?Sized>(accessor: &A, page_refs: &[NodeId]) -> Vec<NodeId> {
  let mut out = page_refs.to_vec();
  for &id in page_refs {
    match accessor.get_node(id) {
      Ok(node) => out.extend(node.page),
      Err(e) => warn!(page_ref = %id, error = %e, "page-reference not resolvable"),
    }
  }
  out
}

/// Note every releasable descendant a recursive release will cover
fn remember_recursive_children<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  start: NodeId,
  ctx: &mut WorkflowContext,
) -> RailResult<()> {
  for child in accessor.children(start, &[], true)? {
    let rule = rule_for(child.kind);
    if rule.recursive_releasable && !rule.excluded {
      ctx.recursive_children.insert(child.label(), child.id);
    }
  }
  Ok(())
}

/// Reference check for a workflow started on a structured record
fn record_reference_check<A: ContentGraphAccessor + ?Sized>(
  accessor: &A,
  record_id: RecordId,
  flags: &Flags,
) -> RailResult<ReferenceCheck> {
  let record = accessor.get_record(record_id)?;
  if record.table.is_none() {
    return Err(AbortError::OrphanRecord(record_id).into());
  }
  let subject = Conflict::new(record.label(), NodeKind::StructuredRecord.as_str());
  let about = |signal, conflict: Conflict| Finding {
    signal,
    subject: Some(conflict),
  };

  let mut findings = Vec::new();
  for edge in accessor.record_references(record_id)? {
    if edge.broken {
      findings.push(about(Signal::BrokenReference, subject.clone()));
      continue;
    }
    let Some(target) = edge.target.as_node() else { continue };
    if edge.kind == EdgeKind::Template {
      continue;
    }
    let node = match accessor.get_node(target) {
      Ok(node) => node,
      Err(e) => {
        warn!(node = %target, error = %e, "record reference not resolvable, counted as broken");
        findings.push(about(Signal::BrokenReference, subject.clone()));
        continue;
      }
    };
    let media = node.kind.is_media();
    if media && !flags.include_media {
      continue;
    }
    if !media {
      findings.push(Finding {
        signal: Signal::NonMediaReferenced,
        subject: None,
      });
    }
    if node.has_task {
      findings.push(about(Signal::InWorkflow, Conflict::of(&node)));
    }
    if node.status_for(&flags.languages) == ReleaseStatus::NeverReleased && node.release_supported {
      if !media {
        findings.push(about(Signal::NonMediaNotReleased, Conflict::of(&node)));
      }
      findings.push(about(Signal::ReleasableNotReleased, Conflict::of(&node)));
    }
  }
  Ok(ReferenceCheck::from_findings(findings))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::context::{RELATED_PAGE_REF_ELEMENTS, RELEASE_PAGE_REF_ELEMENTS, SUPPRESS_DIALOG, SessionStore};
  use crate::graph::fixtures::GraphBuilder;
  use crate::graph::model::ReleaseStatus::*;
  use crate::graph::model::{ReferenceEdge, StructuredRecord};
  use crate::workflow::harness::Harness;
  use serde_json::json;

  #[test]
  fn test_unreleased_reference_is_a_conflict() {
    let mut b = GraphBuilder::new();
    let target = b.node(NodeKind::Page, NeverReleased, None);
    let page = b.node(NodeKind::Page, Changed, None);
    b.reference(page, target, EdgeKind::Structural);
    let mut h = Harness::new(b.build());

    let outcome = find_related_objects(&mut h.env(ObjectRef::Node(page))).unwrap();
    assert_eq!(outcome.transition, Transition::ReleaseConflict);

    let ctx = h.context();
    assert!(ctx.not_released.contains_key(&h.graph.get_node(target).unwrap().label()));
    assert_eq!(h.dialog.shown.len(), 1);
    assert_eq!(h.dialog.shown[0].0, CONFLICTS_TITLE);
  }

  #[test]
  fn test_clean_page_reference_is_ok() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, NeverReleased, None);
    let pr = b.page_ref(Changed, None, page);
    let mut h = Harness::new(b.build());

    let outcome = find_related_objects(&mut h.env(ObjectRef::Node(pr))).unwrap();
    assert_eq!(outcome.transition, Transition::ReferenceOk);
    assert!(h.dialog.shown.is_empty());
    assert!(h.context().not_released.is_empty());
  }

  #[test]
  fn test_suppressed_dialogs_stay_silent() {
    let mut b = GraphBuilder::new();
    let target = b.node(NodeKind::Page, NeverReleased, None);
    let page = b.node(NodeKind::Page, Changed, None);
    b.reference(page, target, EdgeKind::Structural);
    let mut h = Harness::new(b.build());
    h.session.put(SUPPRESS_DIALOG, json!("true"));

    let outcome = find_related_objects(&mut h.env(ObjectRef::Node(page))).unwrap();
    assert_eq!(outcome.transition, Transition::ReleaseConflict);
    assert!(h.dialog.shown.is_empty());
  }

  #[test]
  fn test_related_page_refs_are_checked_instead_of_start() {
    let mut b = GraphBuilder::new();
    let page_a = b.node(NodeKind::Page, NeverReleased, None);
    let page_b = b.node(NodeKind::Page, NeverReleased, None);
    let pr_a = b.page_ref(Changed, None, page_a);
    let pr_b = b.page_ref(Changed, None, page_b);
    b.reference(pr_a, pr_b, EdgeKind::Structural);
    let mut h = Harness::new(b.build());
    h.session.put(RELATED_PAGE_REF_ELEMENTS, json!([format!("n{}", pr_a), format!("n{}", pr_b)]));

    let outcome = find_related_objects(&mut h.env(ObjectRef::Node(pr_a))).unwrap();
    assert_eq!(outcome.transition, Transition::ReferenceOk);
  }

  #[test]
  fn test_unknown_related_page_ref_aborts() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, Released, None);
    let mut h = Harness::new(b.build());
    h.session.put(RELATED_PAGE_REF_ELEMENTS, json!(["missing"]));

    let err = find_related_objects(&mut h.env(ObjectRef::Node(page))).unwrap_err();
    assert!(err.is_abort());
  }

  #[test]
  fn test_recursive_children_are_remembered() {
    let mut b = GraphBuilder::new();
    let root = b.node(NodeKind::SiteRoot, Released, None);
    let folder = b.node(NodeKind::SiteFolder, Changed, Some(root));
    let page = b.node(NodeKind::Page, Released, None);
    let pr = b.page_ref(NeverReleased, Some(folder), page);
    let mut h = Harness::new(b.build());
    h.config.release.recursive = true;

    find_related_objects(&mut h.env(ObjectRef::Node(folder))).unwrap();
    assert_eq!(h.context().recursive_ids(), [pr].into_iter().collect());
  }

  #[test]
  fn test_plan_orders_page_before_its_reference() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, NeverReleased, None);
    let pr = b.page_ref(Changed, None, page);
    let mut h = Harness::new(b.build());

    let plan = plan_release(&mut h.env(ObjectRef::Node(pr))).unwrap();
    let nodes: Vec<NodeId> = plan
      .operations
      .iter()
      .filter_map(|op| match op {
        Operation::ReleaseNode { node, .. } => Some(*node),
        _ => None,
      })
      .collect();
    let at = |id| nodes.iter().position(|n| *n == id).unwrap();
    assert!(at(page) < at(pr));
    assert_eq!(h.graph.get_node(page).unwrap().status, NeverReleased);
  }

  #[test]
  fn test_release_steps_finish_and_release() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, NeverReleased, None);
    let pr = b.page_ref(Changed, None, page);
    let mut h = Harness::new(b.build());

    let test = test_release(&mut h.env(ObjectRef::Node(pr))).unwrap();
    assert_eq!(test.transition, Transition::TestFinished);
    assert_eq!(h.graph.get_node(page).unwrap().status, NeverReleased);

    let real = release(&mut h.env(ObjectRef::Node(pr))).unwrap();
    assert_eq!(real.transition, Transition::Finish);
    assert_eq!(h.graph.get_node(page).unwrap().status, Released);
    assert_eq!(h.graph.get_node(pr).unwrap().status, Released);
  }

  #[test]
  fn test_locked_node_fails_release_with_dialog() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, NeverReleased, None);
    let pr = b.page_ref(Changed, None, page);
    let mut g = b.build();
    g.state.locked_elsewhere.insert(page);
    let mut h = Harness::new(g);

    let outcome = release(&mut h.env(ObjectRef::Node(pr))).unwrap();
    assert_eq!(outcome.transition, Transition::ReleaseFailed);
    let report = outcome.report.unwrap();
    assert_eq!(report.conflicts.locked.len(), 1);
    assert_eq!(h.dialog.shown[0].0, "Locked objects");
  }

  #[test]
  fn test_failure_switches() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, Changed, None);
    let mut h = Harness::new(b.build());
    h.config.workflow.fail_check = true;
    h.config.workflow.fail_apply = true;

    assert_eq!(
      test_release(&mut h.env(ObjectRef::Node(page))).unwrap().transition,
      Transition::TestFailed
    );
    assert_eq!(
      release(&mut h.env(ObjectRef::Node(page))).unwrap().transition,
      Transition::ReleaseFailed
    );
    assert_eq!(h.graph.get_node(page).unwrap().status, Changed);
  }

  #[test]
  fn test_release_page_ref_list_replaces_start() {
    let mut b = GraphBuilder::new();
    let page_a = b.node(NodeKind::Page, NeverReleased, None);
    let page_b = b.node(NodeKind::Page, NeverReleased, None);
    let pr_a = b.page_ref(NeverReleased, None, page_a);
    let pr_b = b.page_ref(NeverReleased, None, page_b);
    let start = b.node(NodeKind::Page, Changed, None);
    let mut h = Harness::new(b.build());
    h.session.put(RELEASE_PAGE_REF_ELEMENTS, json!([format!("n{}", pr_a), format!("n{}", pr_b)]));

    let outcome = release(&mut h.env(ObjectRef::Node(start))).unwrap();
    assert_eq!(outcome.transition, Transition::Finish);
    for id in [page_a, page_b, pr_a, pr_b] {
      assert_eq!(h.graph.get_node(id).unwrap().status, Released, "{id} released");
    }
    assert_eq!(h.graph.get_node(start).unwrap().status, Changed);
  }

  #[test]
  fn test_record_start_releases_references_then_record() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, NeverReleased, None);
    b.record(StructuredRecord {
      id: RecordId(1),
      display_name: "Product".to_string(),
      table: Some("products".to_string()),
      read_only: false,
      released: false,
      validation_errors: Vec::new(),
    });
    b.raw_edge(ReferenceEdge {
      source: ObjectRef::Record(RecordId(1)),
      target: ObjectRef::Node(page),
      kind: EdgeKind::Structural,
      broken: false,
    });
    let mut h = Harness::new(b.build());

    let related = find_related_objects(&mut h.env(ObjectRef::Record(RecordId(1)))).unwrap();
    assert_eq!(related.transition, Transition::ReleaseConflict);

    let outcome = release(&mut h.env(ObjectRef::Record(RecordId(1)))).unwrap();
    assert_eq!(outcome.transition, Transition::Finish);
    assert_eq!(h.graph.get_node(page).unwrap().status, Released);
    assert!(h.graph.get_record(RecordId(1)).unwrap().released);
  }

  #[test]
  fn test_show_not_released_objects_renders_session() {
    let mut b = GraphBuilder::new();
    let page = b.node(NodeKind::Page, Changed, None);
    let mut h = Harness::new(b.build());
    h.session.put(crate::core::context::NOT_RELEASED_ELEMENTS, json!({"home (n9, 9)": "page"}));
    h.session.put(crate::core::context::BROKEN_REFERENCES, json!(true));

    let outcome = show_not_released_objects(&mut h.env(ObjectRef::Node(page))).unwrap();
    assert_eq!(outcome.transition, Transition::CheckNotReleasedObjects);
    assert_eq!(
      h.dialog.shown[0].1,
      "Objects that were never released:\n\nhome (n9, 9)\n\nBroken references were found"
    );
  }
}
