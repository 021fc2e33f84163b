//! Error types for content-rail with contextual messages and exit codes
//!
//! Two families of failure live here:
//!
//! - `RailError` is returned through `Result` and ends the current workflow step.
//!   Illegal node kinds and inconsistent store state surface as `RailError::Abort`.
//! - Recoverable conflicts (locks, permissions, broken references, validation)
//!   are never errors. They accumulate in `release::verdict::ConflictRecord` and
//!   come back inside an `Ok`.
//!
//! `AccessError` is what the content store reports per call. Executors catch it at
//! the node boundary and turn it into a failed node instead of propagating it.

use crate::graph::model::{NodeId, NodeKind, RecordId};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for content-rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (I/O, store transport)
  System = 2,
  /// Conflicts or validation failures reported by a check
  Validation = 3,
  /// Workflow step aborted (illegal node kind, inconsistent store)
  Aborted = 4,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for content-rail
#[derive(Debug)]
pub enum RailError {
  /// Configuration errors
  Config(ConfigError),

  /// Snapshot / graph lookup errors
  Graph(GraphError),

  /// Hard abort of the current workflow step
  Abort(AbortError),

  /// A step finished but reported conflicts the caller asked to treat as fatal
  Conflict { transition: String, summary: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RailError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RailError::Message { message, context, help } => RailError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// True when this error is a hard abort of the workflow step
  pub fn is_abort(&self) -> bool {
    matches!(self, RailError::Abort(_))
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RailError::Config(_) => ExitCode::User,
      RailError::Graph(GraphError::Access(_)) => ExitCode::System,
      RailError::Graph(_) => ExitCode::User,
      RailError::Abort(_) => ExitCode::Aborted,
      RailError::Conflict { .. } => ExitCode::Validation,
      RailError::Io(_) => ExitCode::System,
      RailError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RailError::Config(e) => e.help_message(),
      RailError::Graph(e) => e.help_message(),
      RailError::Abort(e) => e.help_message(),
      RailError::Conflict { .. } => {
        Some("Resolve the listed objects, or re-run with `--force` to apply anyway.".to_string())
      }
      RailError::Message { help, .. } => help.clone(),
      RailError::Io(_) => None,
    }
  }
}

impl fmt::Display for RailError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RailError::Config(e) => write!(f, "{}", e),
      RailError::Graph(e) => write!(f, "{}", e),
      RailError::Abort(e) => write!(f, "Workflow aborted: {}", e),
      RailError::Conflict { transition, summary } => write!(f, "Step ended with '{}'\n{}", transition, summary),
      RailError::Io(e) => write!(f, "I/O error: {}", e),
      RailError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RailError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RailError::Io(e) => Some(e),
      RailError::Graph(e) => Some(e),
      RailError::Abort(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RailError {
  fn from(err: io::Error) -> Self {
    RailError::Io(err)
  }
}

impl From<String> for RailError {
  fn from(msg: String) -> Self {
    RailError::message(msg)
  }
}

impl From<&str> for RailError {
  fn from(msg: &str) -> Self {
    RailError::message(msg)
  }
}

impl From<ConfigError> for RailError {
  fn from(err: ConfigError) -> Self {
    RailError::Config(err)
  }
}

impl From<GraphError> for RailError {
  fn from(err: GraphError) -> Self {
    RailError::Graph(err)
  }
}

impl From<AbortError> for RailError {
  fn from(err: AbortError) -> Self {
    RailError::Abort(err)
  }
}

impl From<AccessError> for RailError {
  fn from(err: AccessError) -> Self {
    RailError::Graph(GraphError::Access(err))
  }
}

impl From<toml_edit::de::Error> for RailError {
  fn from(err: toml_edit::de::Error) -> Self {
    RailError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for RailError {
  fn from(err: toml_edit::ser::Error) -> Self {
    RailError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for RailError {
  fn from(err: serde_json::Error) -> Self {
    RailError::message(format!("JSON error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
  /// rail.toml not found
  #[error("No content-rail configuration found under {}", root.display())]
  NotFound { root: PathBuf },

  /// A field holds a value outside its allowed set
  #[error("Invalid value for `{field}`: {reason}")]
  InvalidValue { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Run `content-rail init` to create a configuration file.".to_string()),
      ConfigError::InvalidValue { field, .. } => Some(format!("Fix `{}` in rail.toml or remove it to use the default.", field)),
    }
  }
}

/// Errors locating things in the content graph
#[derive(Debug, Error)]
pub enum GraphError {
  /// The requested node is not part of the snapshot
  #[error("Node {id} not found ({available} nodes in snapshot)")]
  NodeNotFound { id: NodeId, available: usize },

  /// Snapshot file is structurally invalid
  #[error("Invalid snapshot {}: {reason}", path.display())]
  InvalidSnapshot { path: PathBuf, reason: String },

  /// The store failed where no per-node boundary exists to absorb it
  #[error(transparent)]
  Access(AccessError),
}

impl GraphError {
  fn help_message(&self) -> Option<String> {
    match self {
      GraphError::NodeNotFound { .. } => Some("Run `content-rail status <SNAPSHOT> --node <ID>` to inspect a node.".to_string()),
      GraphError::InvalidSnapshot { .. } => Some("Snapshots are JSON files with `nodes`, `records` and `references`.".to_string()),
      GraphError::Access(_) => None,
    }
  }
}

/// Unrecoverable failures that end the workflow step immediately
#[derive(Debug, Error)]
pub enum AbortError {
  /// The operation is not defined for this node kind
  #[error("{operation} is not possible for {kind} node {id}")]
  IllegalKind {
    operation: &'static str,
    kind: NodeKind,
    id: NodeId,
  },

  /// A structured record without an owning table
  #[error("structured record {0} has no owning table")]
  OrphanRecord(RecordId),

  /// The step only runs on tree nodes
  #[error("{operation} cannot run on structured record {record}")]
  RecordStart { operation: &'static str, record: RecordId },

  /// The store reported something the step cannot recover from
  #[error("inconsistent store state: {0}")]
  Inconsistent(String),
}

impl AbortError {
  fn help_message(&self) -> Option<String> {
    match self {
      AbortError::IllegalKind { .. } => {
        Some("Structured records and their folders are released through their schema, not the tree.".to_string())
      }
      _ => None,
    }
  }
}

/// Failure reported by the content store for a single call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
  #[error("node {0} not found")]
  NotFound(NodeId),

  #[error("record {0} not found")]
  RecordNotFound(RecordId),

  #[error("node {0} is locked by another session")]
  Locked(NodeId),

  #[error("permission denied for node {0}")]
  Denied(NodeId),

  #[error("store transport failure: {0}")]
  Transport(String),
}

/// Result type alias for content-rail
pub type RailResult<T> = Result<T, RailError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RailResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RailError>,
{
  fn context(self, ctx: impl Into<String>) -> RailResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RailError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

impl From<anyhow::Error> for RailError {
  fn from(err: anyhow::Error) -> Self {
    RailError::message(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes_by_category() {
    let abort = RailError::from(AbortError::IllegalKind {
      operation: "release",
      kind: NodeKind::StructuredRecordFolder,
      id: NodeId(7),
    });
    assert_eq!(abort.exit_code(), ExitCode::Aborted);
    assert!(abort.is_abort());

    let access = RailError::from(AccessError::Transport("timeout".to_string()));
    assert_eq!(access.exit_code(), ExitCode::System);

    let conflict = RailError::Conflict {
      transition: "release_conflict".to_string(),
      summary: String::new(),
    };
    assert_eq!(conflict.exit_code().as_i32(), 3);
  }

  #[test]
  fn test_context_chains_on_messages() {
    let err = RailError::message("boom").context("while loading").context("outer");
    let text = err.to_string();
    assert!(text.starts_with("boom"));
    assert!(text.contains("outer\nwhile loading"));
  }

  #[test]
  fn test_abort_display_names_kind() {
    let err = RailError::from(AbortError::IllegalKind {
      operation: "release",
      kind: NodeKind::StructuredRecord,
      id: NodeId(3),
    });
    assert_eq!(err.to_string(), "Workflow aborted: release is not possible for structured-record node 3");
  }
}
