//! CLI commands for content-rail
//!
//! ## Setup & Inspection
//! - **init**: Write a default rail.toml
//! - **status**: Release state and workflow grouping of one node
//!
//! ## Workflows
//! - **release**: Plan or run the release workflow on a node or record
//! - **delete**: Plan or run the delete workflow on a node
//! - **step**: Run a single named workflow step against a session file
//!
//! Every workflow command works on a snapshot file and keeps step results in
//! an optional session file, so steps can also be driven one at a time.

pub mod delete;
pub mod init;
pub mod release;
pub mod status;
pub mod step;

pub use delete::{run_delete_apply, run_delete_plan};
pub use init::run_init;
pub use release::{run_release_apply, run_release_plan};
pub use status::run_status;
pub use step::run_step;

use crate::checks::{CheckRunner, create_default_runner};
use crate::core::config::RailConfig;
use crate::core::context::MemorySession;
use crate::core::error::{RailError, RailResult};
use crate::graph::content_graph::ContentGraph;
use crate::graph::model::{NodeId, ObjectRef, RecordId};
use crate::graph::snapshot;
use crate::release::executor::ApplyObserver;
use crate::workflow::{DialogChannel, StepEnv, StepOutcome};
use std::path::PathBuf;
use tracing::{debug, info};

/// Output format of reports and plans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    self == OutputFormat::Json
  }
}

/// What a workflow command runs on
#[derive(Debug, Clone)]
pub struct Target {
  pub snapshot: PathBuf,
  pub node: Option<u64>,
  pub record: Option<u64>,
  pub session: Option<PathBuf>,
}

impl Target {
  fn start(&self) -> RailResult<ObjectRef> {
    match (self.node, self.record) {
      (Some(node), None) => Ok(ObjectRef::Node(NodeId(node))),
      (None, Some(record)) => Ok(ObjectRef::Record(RecordId(record))),
      _ => Err(RailError::with_help("Exactly one of --node or --record is required", "e.g. --node 42")),
    }
  }
}

/// Snapshot, session and config one command invocation works on
pub struct Workbench {
  target: Target,
  pub graph: ContentGraph,
  pub project: Option<String>,
  pub session: MemorySession,
  pub config: RailConfig,
  pub runner: CheckRunner,
  pub start: ObjectRef,
}

impl Workbench {
  pub fn open(target: Target, config: RailConfig) -> RailResult<Self> {
    let start = target.start()?;
    let (graph, project) = snapshot::load(&target.snapshot)?;
    match start {
      ObjectRef::Node(id) => {
        graph.require_node(id)?;
      }
      ObjectRef::Record(id) => {
        if graph.records().all(|r| r.id != id) {
          return Err(RailError::message(format!("Record {} not found in snapshot", id)));
        }
      }
    }

    let session = match &target.session {
      Some(path) => MemorySession::load(path)?,
      None => MemorySession::new(),
    };
    debug!(start = ?start, "opened workbench");

    Ok(Self {
      target,
      graph,
      project,
      session,
      config,
      runner: create_default_runner(),
      start,
    })
  }

  /// Step environment borrowing everything from this workbench
  pub fn env<'a>(
    &'a mut self,
    dialog: &'a mut dyn DialogChannel,
    observer: &'a mut dyn ApplyObserver,
  ) -> StepEnv<'a, ContentGraph> {
    StepEnv {
      accessor: &mut self.graph,
      session: &mut self.session,
      dialog,
      observer,
      config: &self.config,
      runner: &self.runner,
      start: self.start,
      project: self.project.clone(),
    }
  }

  /// Persist the session file and, when asked, the changed snapshot
  pub fn finish(&self, write_snapshot: bool) -> RailResult<()> {
    if let Some(path) = &self.target.session {
      self.session.save(path)?;
    }
    if write_snapshot {
      snapshot::save(&self.graph, self.project.clone(), &self.target.snapshot)?;
      info!(path = %self.target.snapshot.display(), "snapshot written");
    }
    Ok(())
  }
}

/// Turn a step that ended in a failure transition into a conflict error
pub(crate) fn conflict(outcome: &StepOutcome, summary: impl Into<String>) -> RailError {
  RailError::Conflict {
    transition: outcome.transition.to_string(),
    summary: summary.into(),
  }
}
