//! In-memory content store built on petgraph
//!
//! ## Graph Structure
//!
//! - **Nodes**: `ContentNode` weights in a `StableDiGraph` (indices survive deletes)
//! - **Edges**: reference edges between two live content nodes
//! - **Loose edges**: edges touching a structured record, or pointing at a node
//!   that no longer exists (these are always `broken`)
//! - **Tree**: parent/children ids on the nodes themselves
//! - **Store state**: foreign locks, permission denials and injected transport
//!   failures, so executors can be exercised against partial-failure batches

use crate::core::error::{AccessError, GraphError, RailResult};
use crate::graph::accessor::{BatchResult, ContentGraphAccessor, DeleteParams, ReleaseParams};
use crate::graph::model::{
  ContentNode, NodeId, NodeKind, ObjectRef, RecordId, ReferenceEdge, ReleaseStatus, StructuredRecord,
};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Lock / permission / failure state of the simulated store
#[derive(Debug, Clone, Default)]
pub struct StoreState {
  pub locked_elsewhere: BTreeSet<NodeId>,
  pub denied: BTreeSet<NodeId>,
  pub failing: BTreeSet<NodeId>,
  /// Locks held by the current session
  pub session_locks: BTreeSet<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
  Open,
  Locked,
  Denied,
}

/// Content repository held in memory.
#[derive(Debug)]
pub struct ContentGraph {
  graph: StableDiGraph<ContentNode, ReferenceEdge>,
  id_to_node: HashMap<NodeId, NodeIndex>,
  /// Insertion order of node ids, kept for stable snapshot output
  order: Vec<NodeId>,
  records: BTreeMap<RecordId, StructuredRecord>,
  loose_edges: Vec<ReferenceEdge>,
  pub state: StoreState,
}

impl Default for ContentGraph {
  fn default() -> Self {
    Self::new()
  }
}

impl ContentGraph {
  pub fn new() -> Self {
    Self {
      graph: StableDiGraph::new(),
      id_to_node: HashMap::new(),
      order: Vec::new(),
      records: BTreeMap::new(),
      loose_edges: Vec::new(),
      state: StoreState::default(),
    }
  }

  /// Insert a node. A known parent gets the node appended to its child list.
  pub fn add_node(&mut self, node: ContentNode) -> RailResult<()> {
    if self.id_to_node.contains_key(&node.id) {
      return Err(crate::core::error::RailError::message(format!("Duplicate node id {}", node.id)));
    }
    let id = node.id;
    let parent = node.parent;
    let idx = self.graph.add_node(node);
    self.id_to_node.insert(id, idx);
    self.order.push(id);

    if let Some(parent_id) = parent
      && let Some(&parent_idx) = self.id_to_node.get(&parent_id)
    {
      let children = &mut self.graph[parent_idx].children;
      if !children.contains(&id) {
        children.push(id);
      }
    }
    Ok(())
  }

  /// Append every node to its parent's child list if it is not there yet.
  /// Needed when nodes were inserted before their parents.
  pub fn relink_children(&mut self) {
    let links: Vec<(NodeId, NodeId)> = self.nodes().filter_map(|n| n.parent.map(|p| (p, n.id))).collect();
    for (parent, child) in links {
      if let Some(&idx) = self.id_to_node.get(&parent) {
        let children = &mut self.graph[idx].children;
        if !children.contains(&child) {
          children.push(child);
        }
      }
    }
  }

  pub fn add_record(&mut self, record: StructuredRecord) {
    self.records.insert(record.id, record);
  }

  /// Add a reference edge. Targets that do not resolve become broken loose edges.
  pub fn add_reference(&mut self, mut edge: ReferenceEdge) {
    match (edge.source, edge.target) {
      (ObjectRef::Node(source), ObjectRef::Node(target)) => {
        match (self.id_to_node.get(&source), self.id_to_node.get(&target)) {
          (Some(&from), Some(&to)) => {
            self.graph.add_edge(from, to, edge);
          }
          _ => {
            edge.broken = true;
            self.loose_edges.push(edge);
          }
        }
      }
      (_, ObjectRef::Record(record)) => {
        if !self.records.contains_key(&record) {
          edge.broken = true;
        }
        self.loose_edges.push(edge);
      }
      (ObjectRef::Record(_), ObjectRef::Node(target)) => {
        if !self.id_to_node.contains_key(&target) {
          edge.broken = true;
        }
        self.loose_edges.push(edge);
      }
    }
  }

  pub fn node_count(&self) -> usize {
    self.id_to_node.len()
  }

  /// Look up a node, naming the snapshot size when it is missing
  pub fn require_node(&self, id: NodeId) -> RailResult<&ContentNode> {
    self
      .id_to_node
      .get(&id)
      .map(|&idx| &self.graph[idx])
      .ok_or_else(|| {
        GraphError::NodeNotFound {
          id,
          available: self.node_count(),
        }
        .into()
      })
  }

  /// Find a node by uid
  pub fn find_by_uid(&self, uid: &str) -> Option<&ContentNode> {
    self.nodes().find(|n| n.uid.as_deref() == Some(uid))
  }

  /// Nodes in insertion order
  pub fn nodes(&self) -> impl Iterator<Item = &ContentNode> {
    self.order.iter().filter_map(|id| self.id_to_node.get(id).map(|&idx| &self.graph[idx]))
  }

  pub fn records(&self) -> impl Iterator<Item = &StructuredRecord> {
    self.records.values()
  }

  /// Every reference edge, graph edges first in insertion order
  pub fn references(&self) -> Vec<ReferenceEdge> {
    let mut edges: Vec<_> = self.graph.edge_indices().collect();
    edges.sort();
    let mut out: Vec<ReferenceEdge> = edges.into_iter().filter_map(|e| self.graph.edge_weight(e).copied()).collect();
    out.extend(self.loose_edges.iter().copied());
    out
  }

  fn index(&self, id: NodeId) -> Result<NodeIndex, AccessError> {
    self.id_to_node.get(&id).copied().ok_or(AccessError::NotFound(id))
  }

  fn node_mut(&mut self, id: NodeId) -> Result<&mut ContentNode, AccessError> {
    let idx = self.index(id)?;
    Ok(&mut self.graph[idx])
  }

  fn directed_edges(&self, id: NodeId, direction: Direction) -> Result<Vec<ReferenceEdge>, AccessError> {
    let idx = self.index(id)?;
    let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
    edges.sort_by_key(|e| e.id());
    let mut out: Vec<ReferenceEdge> = edges.into_iter().map(|e| *e.weight()).collect();

    let this = ObjectRef::Node(id);
    out.extend(self.loose_edges.iter().filter(|e| match direction {
      Direction::Outgoing => e.source == this,
      Direction::Incoming => e.target == this,
    }));
    Ok(out)
  }

  fn gate(&self, id: NodeId) -> Result<Gate, AccessError> {
    self.index(id)?;
    if self.state.failing.contains(&id) {
      return Err(AccessError::Transport(format!("store rejected call for node {}", id)));
    }
    if self.state.locked_elsewhere.contains(&id) {
      return Ok(Gate::Locked);
    }
    if self.state.denied.contains(&id) {
      return Ok(Gate::Denied);
    }
    Ok(Gate::Open)
  }

  fn mark_released(&mut self, id: NodeId, recursive: bool) -> Result<(), AccessError> {
    let node = self.node_mut(id)?;
    node.status = ReleaseStatus::Released;
    for status in node.languages.values_mut() {
      *status = ReleaseStatus::Released;
    }
    if recursive {
      for child in self.children(id, &[], true)? {
        self.mark_released(child.id, false)?;
      }
    }
    Ok(())
  }

  /// Remove a node and its subtree. References into the removed nodes stay
  /// behind as broken loose edges.
  fn remove_subtree(&mut self, id: NodeId) -> Result<(), AccessError> {
    let mut doomed: Vec<NodeId> = self.children(id, &[], true)?.into_iter().map(|n| n.id).collect();
    doomed.push(id);

    if let Some(parent) = self.get_node(id)?.parent
      && let Ok(parent_node) = self.node_mut(parent)
    {
      parent_node.children.retain(|c| *c != id);
    }

    for victim in doomed {
      for mut edge in self.directed_edges(victim, Direction::Incoming)? {
        if let ObjectRef::Node(src) = edge.source
          && self.id_to_node.contains_key(&src)
          && src != victim
        {
          edge.broken = true;
          self.loose_edges.push(edge);
        }
      }
      for edge in self.loose_edges.iter_mut().filter(|e| e.target == ObjectRef::Node(victim)) {
        edge.broken = true;
      }
      self.loose_edges.retain(|e| e.source != ObjectRef::Node(victim));
      if let Some(idx) = self.id_to_node.remove(&victim) {
        self.graph.remove_node(idx);
      }
      self.order.retain(|n| *n != victim);
      debug!(node = %victim, "removed node");
    }
    Ok(())
  }

  fn release_node(&mut self, id: NodeId, params: &ReleaseParams) -> Result<Gate, AccessError> {
    let gate = self.gate(id)?;
    if gate == Gate::Open && !params.dry_run {
      self.mark_released(id, params.recursive)?;
    }
    Ok(gate)
  }

  fn release_record(&mut self, id: RecordId, params: &ReleaseParams) -> Result<Gate, AccessError> {
    let record = self.records.get_mut(&id).ok_or(AccessError::RecordNotFound(id))?;
    if !params.dry_run {
      record.released = true;
    }
    Ok(Gate::Open)
  }
}

/// Sort one object's outcome into the batch result
fn record_outcome(result: &mut BatchResult, object: ObjectRef, outcome: Result<Gate, AccessError>) {
  match outcome {
    Ok(Gate::Open) => result.applied.push(object),
    Ok(Gate::Locked) => result.lock_failed.push(object),
    Ok(Gate::Denied) => result.denied.push(object),
    Err(e) => {
      warn!(object = %object, error = %e, "store call failed");
      result.failed.push(object);
    }
  }
}

impl ContentGraphAccessor for ContentGraph {
  fn get_node(&self, id: NodeId) -> Result<ContentNode, AccessError> {
    Ok(self.graph[self.index(id)?].clone())
  }

  fn get_record(&self, id: RecordId) -> Result<StructuredRecord, AccessError> {
    self.records.get(&id).cloned().ok_or(AccessError::RecordNotFound(id))
  }

  fn node_by_uid(&self, uid: &str) -> Result<Option<ContentNode>, AccessError> {
    Ok(self.find_by_uid(uid).cloned())
  }

  fn children(&self, node: NodeId, filter: &[NodeKind], recursive: bool) -> Result<Vec<ContentNode>, AccessError> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = self.graph[self.index(node)?].children.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
      let child = &self.graph[self.index(id)?];
      if filter.is_empty() || filter.contains(&child.kind) {
        out.push(child.clone());
      }
      if recursive {
        stack.extend(child.children.iter().rev().copied());
      }
    }
    Ok(out)
  }

  fn outgoing_references(&self, node: NodeId) -> Result<Vec<ReferenceEdge>, AccessError> {
    self.directed_edges(node, Direction::Outgoing)
  }

  fn incoming_references(&self, node: NodeId) -> Result<Vec<ReferenceEdge>, AccessError> {
    self.directed_edges(node, Direction::Incoming)
  }

  fn record_references(&self, record: RecordId) -> Result<Vec<ReferenceEdge>, AccessError> {
    if !self.records.contains_key(&record) {
      return Err(AccessError::RecordNotFound(record));
    }
    let this = ObjectRef::Record(record);
    Ok(self.loose_edges.iter().filter(|e| e.source == this).copied().collect())
  }

  fn release_status(&self, node: NodeId, languages: &[String]) -> Result<ReleaseStatus, AccessError> {
    Ok(self.graph[self.index(node)?].status_for(languages))
  }

  fn is_locked_elsewhere(&self, node: NodeId) -> Result<bool, AccessError> {
    self.index(node)?;
    Ok(self.state.locked_elsewhere.contains(&node))
  }

  fn apply_release(&mut self, objects: &[ObjectRef], params: &ReleaseParams) -> Result<BatchResult, AccessError> {
    let mut result = BatchResult::default();
    for object in objects {
      let outcome = match *object {
        ObjectRef::Node(id) => self.release_node(id, params),
        ObjectRef::Record(id) => self.release_record(id, params),
      };
      record_outcome(&mut result, *object, outcome);
    }
    Ok(result)
  }

  fn apply_delete(&mut self, nodes: &[NodeId], params: &DeleteParams) -> Result<BatchResult, AccessError> {
    let mut result = BatchResult::default();
    for &id in nodes {
      let outcome = self.gate(id).and_then(|gate| {
        if gate == Gate::Open && !params.dry_run {
          self.remove_subtree(id)?;
        }
        Ok(gate)
      });
      record_outcome(&mut result, ObjectRef::Node(id), outcome);
    }
    Ok(result)
  }

  fn lock(&mut self, node: NodeId) -> Result<(), AccessError> {
    self.index(node)?;
    if self.state.locked_elsewhere.contains(&node) {
      return Err(AccessError::Locked(node));
    }
    self.state.session_locks.insert(node);
    Ok(())
  }

  fn unlock(&mut self, node: NodeId) -> Result<(), AccessError> {
    self.index(node)?;
    self.state.session_locks.remove(&node);
    Ok(())
  }
}
