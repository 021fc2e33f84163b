//! Status command: release state of one node as an editor would see it

use crate::commands::OutputFormat;
use crate::core::error::RailResult;
use crate::graph::accessor::ContentGraphAccessor;
use crate::graph::model::NodeId;
use crate::graph::snapshot;
use crate::release::status::{ReleaseState, release_state, workflow_groups};
use serde::Serialize;
use std::path::Path;

/// Status information for a single node
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
  pub label: String,
  pub kind: String,
  /// Stored status across the requested languages
  pub status: String,
  pub state: ReleaseState,
  /// Nodes a workflow started here is grouped under
  pub groups: Vec<String>,
}

/// Run the status command
pub fn run_status(snapshot_path: &Path, node: u64, language: Option<String>, format: OutputFormat) -> RailResult<()> {
  let (graph, _) = snapshot::load(snapshot_path)?;
  let node = graph.get_node(NodeId(node))?;
  let languages: Vec<String> = language.iter().cloned().collect();

  let status = NodeStatus {
    label: node.label(),
    kind: node.kind.to_string(),
    status: node.status_for(&languages).to_string(),
    state: release_state(&graph, &node, language.as_deref())?,
    groups: workflow_groups(&graph, &node)?.iter().map(|n| n.label()).collect(),
  };

  if format.is_json() {
    println!("{}", serde_json::to_string_pretty(&status)?);
    return Ok(());
  }

  let icon = match status.state {
    ReleaseState::Released => "✅",
    ReleaseState::Changed => "✏️ ",
    ReleaseState::InWorkflow => "⏳",
  };
  println!("{} {} [{}]", icon, status.label, status.kind);
  println!("   status: {}", status.status);
  println!("   state:  {}", status.state);
  if status.groups.is_empty() {
    println!("   no workflow group");
  } else {
    println!("   workflow groups: {}", status.groups.join(", "));
  }
  Ok(())
}
