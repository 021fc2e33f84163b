//! Workflow context - load once per step, pass everywhere
//!
//! # Design
//!
//! Results travel between workflow steps through a key-value session owned by
//! the caller. `WorkflowContext` is the typed view of that session: it is loaded
//! once at the start of a step, threaded through every call by reference, and
//! written back at the end.
//!
//! # Architecture
//!
//! ```text
//! step entry point:
//!   WorkflowContext::load(&session) -> WorkflowContext
//!   |
//!   v
//! release / delete logic:
//!   fn step(ctx: &mut WorkflowContext, ...)
//!   |
//!   v
//!   ctx.store(&mut session)
//! ```

use crate::core::error::{RailResult, ResultExt};
use crate::delete::executor::LockedObject;
use crate::graph::model::NodeId;
use crate::release::verdict::ReferenceCheck;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const NOT_RELEASED_ELEMENTS: &str = "wfNotReleasedElements";
pub const BROKEN_REFERENCES: &str = "wfBrokenReferences";
pub const OBJECTS_IN_WORKFLOW: &str = "wfObjectsInWorkflow";
pub const RECURSIVE_CHILDREN: &str = "wfRecursiveChildren";
pub const RELEASE_PAGE_REF_ELEMENTS: &str = "wfReleasePageRefElements";
pub const RELATED_PAGE_REF_ELEMENTS: &str = "wfRelatedPageRefElements";
pub const LOCKED_OBJECTS: &str = "wfLockedObjects";
pub const REFERENCED_OBJECTS: &str = "wfReferencedObjects";
pub const SUPPRESS_DIALOG: &str = "wfSuppressDialog";

/// Per-workflow key-value store owned by the caller
pub trait SessionStore {
  fn get(&self, key: &str) -> Option<Value>;
  fn put(&mut self, key: &str, value: Value);
  fn remove(&mut self, key: &str) -> Option<Value>;
}

/// Session held in memory, optionally backed by a JSON file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySession {
  values: BTreeMap<String, Value>,
}

impl MemorySession {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a session file; a missing file is an empty session
  pub fn load(path: &Path) -> RailResult<Self> {
    if !path.exists() {
      return Ok(Self::new());
    }
    let content =
      fs::read_to_string(path).with_context(|| format!("Failed to read session from {}", path.display()))?;
    let values: BTreeMap<String, Value> =
      serde_json::from_str(&content).with_context(|| format!("Failed to parse session {}", path.display()))?;
    Ok(Self { values })
  }

  pub fn save(&self, path: &Path) -> RailResult<()> {
    let content = serde_json::to_string_pretty(&self.values)?;
    fs::write(path, content).with_context(|| format!("Failed to write session to {}", path.display()))?;
    Ok(())
  }

  pub fn keys(&self) -> impl Iterator<Item = &String> {
    self.values.keys()
  }
}

impl SessionStore for MemorySession {
  fn get(&self, key: &str) -> Option<Value> {
    self.values.get(key).cloned()
  }

  fn put(&mut self, key: &str, value: Value) {
    self.values.insert(key.to_string(), value);
  }

  fn remove(&mut self, key: &str) -> Option<Value> {
    self.values.remove(key)
  }
}

/// Typed view of the workflow session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowContext {
  /// label -> kind of never-released objects
  pub not_released: BTreeMap<String, String>,
  pub broken_references: bool,
  /// label -> kind of objects with a pending task
  pub in_workflow: BTreeMap<String, String>,
  /// label -> id of descendants covered by an explicit recursive release
  pub recursive_children: BTreeMap<String, NodeId>,
  /// uids of page-references to release instead of the start node
  pub release_page_refs: Vec<String>,
  /// uids of page-references the verdict check treats as requested
  pub related_page_refs: Vec<String>,
  pub locked_objects: Vec<LockedObject>,
  pub referenced_objects: Vec<String>,
  pub suppress_dialog: bool,
}

impl WorkflowContext {
  /// Read every known key from `session`
  pub fn load(session: &dyn SessionStore) -> RailResult<Self> {
    Ok(Self {
      not_released: read(session, NOT_RELEASED_ELEMENTS)?,
      broken_references: flag(session, BROKEN_REFERENCES),
      in_workflow: read(session, OBJECTS_IN_WORKFLOW)?,
      recursive_children: read(session, RECURSIVE_CHILDREN)?,
      release_page_refs: read(session, RELEASE_PAGE_REF_ELEMENTS)?,
      related_page_refs: read(session, RELATED_PAGE_REF_ELEMENTS)?,
      locked_objects: read(session, LOCKED_OBJECTS)?,
      referenced_objects: read(session, REFERENCED_OBJECTS)?,
      suppress_dialog: flag(session, SUPPRESS_DIALOG),
    })
  }

  /// Write every field back; empty collections remove their key
  pub fn store(&self, session: &mut dyn SessionStore) -> RailResult<()> {
    write(session, NOT_RELEASED_ELEMENTS, &self.not_released, self.not_released.is_empty())?;
    session.put(BROKEN_REFERENCES, Value::Bool(self.broken_references));
    write(session, OBJECTS_IN_WORKFLOW, &self.in_workflow, self.in_workflow.is_empty())?;
    write(
      session,
      RECURSIVE_CHILDREN,
      &self.recursive_children,
      self.recursive_children.is_empty(),
    )?;
    write(
      session,
      RELEASE_PAGE_REF_ELEMENTS,
      &self.release_page_refs,
      self.release_page_refs.is_empty(),
    )?;
    write(
      session,
      RELATED_PAGE_REF_ELEMENTS,
      &self.related_page_refs,
      self.related_page_refs.is_empty(),
    )?;
    write(session, LOCKED_OBJECTS, &self.locked_objects, self.locked_objects.is_empty())?;
    write(
      session,
      REFERENCED_OBJECTS,
      &self.referenced_objects,
      self.referenced_objects.is_empty(),
    )?;
    if self.suppress_dialog {
      session.put(SUPPRESS_DIALOG, Value::Bool(true));
    }
    debug!(
      not_released = self.not_released.len(),
      broken = self.broken_references,
      "workflow context stored"
    );
    Ok(())
  }

  /// Fold a reference check into the context.
  ///
  /// The maps accumulate across steps. The broken flag accumulates only in
  /// recursive mode; otherwise the latest check wins.
  pub fn record_reference_check(&mut self, check: &ReferenceCheck, recursive: bool) {
    self.not_released.extend(check.not_released.clone());
    self.in_workflow.extend(check.in_workflow.clone());
    let broken = !check.verdict.no_broken_references;
    self.broken_references = if recursive {
      self.broken_references || broken
    } else {
      broken
    };
  }

  pub fn recursive_ids(&self) -> HashSet<NodeId> {
    self.recursive_children.values().copied().collect()
  }
}

fn read<T: DeserializeOwned + Default>(session: &dyn SessionStore, key: &str) -> RailResult<T> {
  match session.get(key) {
    None | Some(Value::Null) => Ok(T::default()),
    Some(value) => serde_json::from_value(value).with_context(|| format!("Session key {} has an unexpected shape", key)),
  }
}

/// Booleans arrive either as JSON booleans or as the strings "true"/"false"
fn flag(session: &dyn SessionStore, key: &str) -> bool {
  match session.get(key) {
    Some(Value::Bool(b)) => b,
    Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
    _ => false,
  }
}

fn write<T: Serialize>(session: &mut dyn SessionStore, key: &str, value: &T, empty: bool) -> RailResult<()> {
  if empty {
    session.remove(key);
  } else {
    session.put(key, serde_json::to_value(value)?);
  }
  Ok(())
}
