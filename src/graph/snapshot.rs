//! JSON snapshots of a content repository
//!
//! A snapshot is the on-disk form of `ContentGraph`: nodes (with parent links),
//! structured records, reference edges, and the store's lock/permission state.

use crate::core::error::{GraphError, RailResult, ResultExt};
use crate::graph::content_graph::ContentGraph;
use crate::graph::model::{ContentNode, NodeId, ReferenceEdge, StructuredRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  pub nodes: Vec<ContentNode>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub records: Vec<StructuredRecord>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub references: Vec<ReferenceEdge>,
  /// Nodes held by another session
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub locked_elsewhere: Vec<NodeId>,
  /// Nodes the acting user may not release or delete
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub denied: Vec<NodeId>,
  /// Nodes whose store calls fail with a transport error
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub failing: Vec<NodeId>,
}

impl Snapshot {
  /// Build the in-memory graph, rejecting dangling parent links
  pub fn into_graph(self, source: &Path) -> RailResult<ContentGraph> {
    let ids: HashSet<NodeId> = self.nodes.iter().map(|n| n.id).collect();
    for node in &self.nodes {
      if let Some(parent) = node.parent
        && !ids.contains(&parent)
      {
        return Err(
          GraphError::InvalidSnapshot {
            path: source.to_path_buf(),
            reason: format!("node {} has unknown parent {}", node.id, parent),
          }
          .into(),
        );
      }
    }

    let mut graph = ContentGraph::new();
    for mut node in self.nodes {
      if node.project.is_none() {
        node.project = self.project.clone();
      }
      node.children.retain(|c| ids.contains(c));
      graph.add_node(node).with_context(|| format!("Invalid snapshot {}", source.display()))?;
    }
    graph.relink_children();

    for record in self.records {
      graph.add_record(record);
    }
    for edge in self.references {
      graph.add_reference(edge);
    }
    graph.state.locked_elsewhere.extend(self.locked_elsewhere);
    graph.state.denied.extend(self.denied);
    graph.state.failing.extend(self.failing);
    Ok(graph)
  }

  pub fn from_graph(graph: &ContentGraph, project: Option<String>) -> Self {
    Self {
      project,
      nodes: graph.nodes().cloned().collect(),
      records: graph.records().cloned().collect(),
      references: graph.references(),
      locked_elsewhere: graph.state.locked_elsewhere.iter().copied().collect(),
      denied: graph.state.denied.iter().copied().collect(),
      failing: graph.state.failing.iter().copied().collect(),
    }
  }
}

/// Load a snapshot file into a graph
pub fn load(path: &Path) -> RailResult<(ContentGraph, Option<String>)> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read snapshot {}", path.display()))?;
  let snapshot: Snapshot =
    serde_json::from_str(&content).with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
  let project = snapshot.project.clone();
  let graph = snapshot.into_graph(path)?;
  info!(path = %path.display(), nodes = graph.node_count(), "loaded snapshot");
  Ok((graph, project))
}

/// Write a graph back to disk
pub fn save(graph: &ContentGraph, project: Option<String>, path: &Path) -> RailResult<()> {
  let snapshot = Snapshot::from_graph(graph, project);
  let json = serde_json::to_string_pretty(&snapshot)?;
  fs::write(path, json).with_context(|| format!("Failed to write snapshot {}", path.display()))?;
  Ok(())
}
