//! Content repository data model
//!
//! Nodes live in an arena keyed by `NodeId`. Parent/child links and reference
//! edges are stored as ids, never as object pointers, so cyclic reference graphs
//! need no special ownership handling. Closure sets are sets of `ObjectRef`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable numeric id of a content node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Stable numeric id of a structured record (distinct id space from nodes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Identity of anything that can be a reference target or a closure member
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRef {
  Node(NodeId),
  Record(RecordId),
}

impl ObjectRef {
  pub fn as_node(&self) -> Option<NodeId> {
    match self {
      ObjectRef::Node(id) => Some(*id),
      ObjectRef::Record(_) => None,
    }
  }
}

impl fmt::Display for ObjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ObjectRef::Node(id) => write!(f, "node {}", id),
      ObjectRef::Record(id) => write!(f, "record {}", id),
    }
  }
}

/// Closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
  Page,
  /// Content area of a page; may nest
  Section,
  PageReference,
  PageFolder,
  /// Folder in the site store holding page-references
  SiteFolder,
  DocumentGroup,
  Media,
  MediaFolder,
  GlobalContentPage,
  GlobalContentFolder,
  StructuredRecord,
  StructuredRecordFolder,
  TemplateElement,
  Query,
  ProjectProperties,
  SiteRoot,
}

/// Which store a node lives in. Drives closure ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreType {
  PageStore,
  SiteStore,
  MediaStore,
  GlobalStore,
  RecordStore,
  TemplateStore,
}

impl NodeKind {
  pub const ALL: [NodeKind; 16] = [
    NodeKind::Page,
    NodeKind::Section,
    NodeKind::PageReference,
    NodeKind::PageFolder,
    NodeKind::SiteFolder,
    NodeKind::DocumentGroup,
    NodeKind::Media,
    NodeKind::MediaFolder,
    NodeKind::GlobalContentPage,
    NodeKind::GlobalContentFolder,
    NodeKind::StructuredRecord,
    NodeKind::StructuredRecordFolder,
    NodeKind::TemplateElement,
    NodeKind::Query,
    NodeKind::ProjectProperties,
    NodeKind::SiteRoot,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::Page => "page",
      NodeKind::Section => "section",
      NodeKind::PageReference => "page-reference",
      NodeKind::PageFolder => "page-folder",
      NodeKind::SiteFolder => "site-folder",
      NodeKind::DocumentGroup => "document-group",
      NodeKind::Media => "media",
      NodeKind::MediaFolder => "media-folder",
      NodeKind::GlobalContentPage => "global-content-page",
      NodeKind::GlobalContentFolder => "global-content-folder",
      NodeKind::StructuredRecord => "structured-record",
      NodeKind::StructuredRecordFolder => "structured-record-folder",
      NodeKind::TemplateElement => "template-element",
      NodeKind::Query => "query",
      NodeKind::ProjectProperties => "project-properties",
      NodeKind::SiteRoot => "site-root",
    }
  }

  pub fn store(&self) -> StoreType {
    match self {
      NodeKind::Page | NodeKind::Section | NodeKind::PageFolder => StoreType::PageStore,
      NodeKind::PageReference | NodeKind::SiteFolder | NodeKind::DocumentGroup | NodeKind::SiteRoot => {
        StoreType::SiteStore
      }
      NodeKind::Media | NodeKind::MediaFolder => StoreType::MediaStore,
      NodeKind::GlobalContentPage | NodeKind::GlobalContentFolder | NodeKind::ProjectProperties => {
        StoreType::GlobalStore
      }
      NodeKind::StructuredRecord | NodeKind::StructuredRecordFolder | NodeKind::Query => StoreType::RecordStore,
      NodeKind::TemplateElement => StoreType::TemplateStore,
    }
  }

  pub fn is_folder(&self) -> bool {
    matches!(
      self,
      NodeKind::PageFolder
        | NodeKind::SiteFolder
        | NodeKind::MediaFolder
        | NodeKind::GlobalContentFolder
        | NodeKind::StructuredRecordFolder
        | NodeKind::SiteRoot
    )
  }

  pub fn is_media(&self) -> bool {
    matches!(self, NodeKind::Media | NodeKind::MediaFolder)
  }

  /// Kinds that can only be handled through the record/schema channel
  pub fn is_record_channel(&self) -> bool {
    matches!(self, NodeKind::StructuredRecord | NodeKind::StructuredRecordFolder)
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-node release status, ordered from least to most released
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
  NeverReleased,
  Changed,
  Released,
}

impl fmt::Display for ReleaseStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseStatus::NeverReleased => write!(f, "never-released"),
      ReleaseStatus::Changed => write!(f, "changed"),
      ReleaseStatus::Released => write!(f, "released"),
    }
  }
}

fn default_true() -> bool {
  true
}

/// A node in the repository tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
  pub id: NodeId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uid: Option<String>,
  #[serde(default)]
  pub display_name: String,
  pub kind: NodeKind,
  pub status: ReleaseStatus,
  /// Per-language status overrides; languages not listed use `status`
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub languages: BTreeMap<String, ReleaseStatus>,
  /// A workflow task is pending on this node
  #[serde(default)]
  pub has_task: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent: Option<NodeId>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<NodeId>,
  /// For page-references: the page they point at
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page: Option<NodeId>,
  /// For sections: content comes from a structured record
  #[serde(default)]
  pub record_backed: bool,
  #[serde(default = "default_true")]
  pub release_supported: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  /// Form validation failures reported by the store
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub validation_errors: Vec<String>,
}

impl ContentNode {
  pub fn new(id: u64, kind: NodeKind, status: ReleaseStatus) -> Self {
    Self {
      id: NodeId(id),
      uid: None,
      display_name: String::new(),
      kind,
      status,
      languages: BTreeMap::new(),
      has_task: false,
      parent: None,
      children: Vec::new(),
      page: None,
      record_backed: false,
      release_supported: true,
      project: None,
      validation_errors: Vec::new(),
    }
  }

  /// Status restricted to a language subset; the least released language wins.
  pub fn status_for(&self, languages: &[String]) -> ReleaseStatus {
    if languages.is_empty() {
      return self.status;
    }
    languages
      .iter()
      .map(|lang| self.languages.get(lang).copied().unwrap_or(self.status))
      .min()
      .unwrap_or(self.status)
  }

  /// "displayName (uid, id)" as shown in conflict dialogs
  pub fn label(&self) -> String {
    let name = if self.display_name.is_empty() {
      self.uid.as_deref().unwrap_or(self.kind.as_str())
    } else {
      &self.display_name
    };
    format!("{} ({}, {})", name, self.uid.as_deref().unwrap_or("-"), self.id)
  }

  /// uid when set, display name otherwise
  pub fn uid_or_name(&self) -> String {
    self.uid.clone().unwrap_or_else(|| self.display_name.clone())
  }

  pub fn is_root(&self) -> bool {
    self.parent.is_none()
  }
}

/// Reference edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
  #[default]
  Structural,
  Media,
  Template,
}

/// Directed reference `source -> target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceEdge {
  pub source: ObjectRef,
  pub target: ObjectRef,
  #[serde(default)]
  pub kind: EdgeKind,
  /// Target is missing or unreachable
  #[serde(default)]
  pub broken: bool,
}

impl ReferenceEdge {
  pub fn between(source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
    Self {
      source: ObjectRef::Node(source),
      target: ObjectRef::Node(target),
      kind,
      broken: false,
    }
  }
}

/// An entity in a structured-record table, released through its schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
  pub id: RecordId,
  #[serde(default)]
  pub display_name: String,
  /// Owning table; `None` is an inconsistent store state
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub table: Option<String>,
  /// Schema is read-only, so its records never need releasing
  #[serde(default)]
  pub read_only: bool,
  #[serde(default)]
  pub released: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub validation_errors: Vec<String>,
}

impl StructuredRecord {
  pub fn label(&self) -> String {
    format!(
      "{} ({}, {})",
      self.display_name,
      self.table.as_deref().unwrap_or("-"),
      self.id
    )
  }
}

/// Caller-supplied flags for one closure computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
  pub include_media: bool,
  pub recursive: bool,
  /// Empty means all languages
  #[serde(default)]
  pub languages: Vec<String>,
}
