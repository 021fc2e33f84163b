//! Workflow step entry points
//!
//! Each step reads the session into a `WorkflowContext`, does its work against
//! the store, writes the context back, and names the transition to fire.
//! `Err` is reserved for hard aborts; conflicts come back as a transition.
//!
//! ## Release
//! - `release::find_related_objects` → `reference_ok | release_conflict`
//! - `release::test_release` → `test_finished | test_failed`
//! - `release::release` → `finish | release_failed`
//! - `release::show_not_released_objects` → `check_not_released_objects`
//!
//! ## Delete
//! - `delete::check_prerequisites` → `folder_ok | abort_deletion | check_conflict`
//! - `delete::find_related_objects` → `reference_ok | reference_conflict`
//! - `delete::test_delete` → `test_finished | test_failed`
//! - `delete::delete` → `finish | delete_failed`
//! - `delete::branch_if_folder` → `folder | element`
//! - `delete::show_warning` → `reference_ok_2`

pub mod delete;
pub mod dialog;
pub mod release;
pub mod report;
pub mod transition;

pub use dialog::{ConsoleDialog, DialogChannel, RecordingDialog};
pub use transition::Transition;

use crate::checks::CheckRunner;
use crate::core::config::RailConfig;
use crate::core::context::{SessionStore, WorkflowContext};
use crate::core::error::{AbortError, RailResult};
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::{NodeId, ObjectRef};
use crate::release::executor::{ApplyObserver, ExecutionReport};
use serde::Serialize;

/// Everything a step needs from its caller
pub struct StepEnv<'a, A: ContentGraphAccessor + ?Sized> {
  pub accessor: &'a mut A,
  pub session: &'a mut dyn SessionStore,
  pub dialog: &'a mut dyn DialogChannel,
  pub observer: &'a mut dyn ApplyObserver,
  pub config: &'a RailConfig,
  pub runner: &'a CheckRunner,
  /// Object the workflow runs on
  pub start: ObjectRef,
  /// Project the workflow runs in
  pub project: Option<String>,
}

impl<A: ContentGraphAccessor + ?Sized> StepEnv<'_, A> {
  /// Tree node the workflow runs on; record starts abort
  pub fn start_node(&self, operation: &'static str) -> RailResult<NodeId> {
    match self.start {
      ObjectRef::Node(id) => Ok(id),
      ObjectRef::Record(record) => Err(AbortError::RecordStart { operation, record }.into()),
    }
  }

  fn suppress_dialogs(&self, ctx: &WorkflowContext) -> bool {
    self.config.workflow.suppress_dialogs || ctx.suppress_dialog
  }

  fn show(&mut self, ctx: &WorkflowContext, dialogs: &[(String, String)]) {
    let suppress = self.suppress_dialogs(ctx);
    report::show_all(self.dialog, dialogs, suppress);
  }
}

/// What a step decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
  pub transition: Transition,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report: Option<ExecutionReport>,
}

impl StepOutcome {
  pub fn to(transition: Transition) -> Self {
    Self {
      transition,
      report: None,
    }
  }

  pub fn with_report(transition: Transition, report: ExecutionReport) -> Self {
    Self {
      transition,
      report: Some(report),
    }
  }
}

#[cfg(test)]
pub(crate) mod harness {
  use super::*;
  use crate::checks::create_default_runner;
  use crate::core::context::MemorySession;
  use crate::graph::content_graph::ContentGraph;
  use crate::release::executor::Silent;

  /// Owns everything a `StepEnv` borrows
  pub struct Harness {
    pub graph: ContentGraph,
    pub session: MemorySession,
    pub dialog: RecordingDialog,
    pub config: RailConfig,
    pub runner: CheckRunner,
    pub observer: Silent,
  }

  impl Harness {
    pub fn new(graph: ContentGraph) -> Self {
      Self {
        graph,
        session: MemorySession::new(),
        dialog: RecordingDialog::answering(true),
        config: RailConfig::default(),
        runner: create_default_runner(),
        observer: Silent,
      }
    }

    pub fn env(&mut self, start: ObjectRef) -> StepEnv<'_, ContentGraph> {
      StepEnv {
        accessor: &mut self.graph,
        session: &mut self.session,
        dialog: &mut self.dialog,
        observer: &mut self.observer,
        config: &self.config,
        runner: &self.runner,
        start,
        project: None,
      }
    }

    pub fn context(&self) -> WorkflowContext {
      WorkflowContext::load(&self.session).unwrap()
    }
  }
}
