//! Small graph builder shared by unit tests

use crate::graph::content_graph::ContentGraph;
use crate::graph::model::{ContentNode, EdgeKind, NodeId, NodeKind, ReferenceEdge, ReleaseStatus, StructuredRecord};

pub struct GraphBuilder {
  nodes: Vec<ContentNode>,
  records: Vec<StructuredRecord>,
  edges: Vec<ReferenceEdge>,
  next: u64,
}

impl GraphBuilder {
  pub fn new() -> Self {
    Self {
      nodes: Vec::new(),
      records: Vec::new(),
      edges: Vec::new(),
      next: 1,
    }
  }

  pub fn node(&mut self, kind: NodeKind, status: ReleaseStatus, parent: Option<NodeId>) -> NodeId {
    let mut node = ContentNode::new(self.next, kind, status);
    node.display_name = format!("{}-{}", kind, self.next);
    node.uid = Some(format!("n{}", self.next));
    node.parent = parent;
    self.next += 1;
    let id = node.id;
    self.nodes.push(node);
    id
  }

  /// Page-reference pointing at `page`, with the matching reference edge
  pub fn page_ref(&mut self, status: ReleaseStatus, parent: Option<NodeId>, page: NodeId) -> NodeId {
    let id = self.node(NodeKind::PageReference, status, parent);
    self.edit(id, |n| n.page = Some(page));
    self.reference(id, page, EdgeKind::Structural);
    id
  }

  pub fn edit(&mut self, id: NodeId, f: impl FnOnce(&mut ContentNode)) {
    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
      f(node);
    }
  }

  pub fn reference(&mut self, source: NodeId, target: NodeId, kind: EdgeKind) {
    self.edges.push(ReferenceEdge::between(source, target, kind));
  }

  pub fn raw_edge(&mut self, edge: ReferenceEdge) {
    self.edges.push(edge);
  }

  pub fn record(&mut self, record: StructuredRecord) {
    self.records.push(record);
  }

  pub fn build(self) -> ContentGraph {
    let mut graph = ContentGraph::new();
    for node in self.nodes {
      graph.add_node(node).unwrap();
    }
    graph.relink_children();
    for record in self.records {
      graph.add_record(record);
    }
    for edge in self.edges {
      graph.add_reference(edge);
    }
    graph
  }
}
