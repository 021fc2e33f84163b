//! Check trait abstraction for node validation
//!
//! Every release validates the nodes it is about to apply. Each rule implements
//! the `Check` trait so new business rules can be added without touching the
//! executors.

use crate::core::error::RailResult;
use crate::graph::model::{ContentNode, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for check results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
  /// Informational message (not an issue)
  Info,
  /// Warning (reported, does not block the release)
  Warning,
  /// Error (blocks the release)
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Info => write!(f, "INFO"),
      Severity::Warning => write!(f, "WARN"),
      Severity::Error => write!(f, "ERROR"),
    }
  }
}

/// Result of running a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
  /// Name of the check that ran
  pub check_name: String,
  /// Whether the check passed
  pub passed: bool,
  /// Severity level (if failed)
  pub severity: Severity,
  /// Human-readable message
  pub message: String,
  /// Optional suggested fix
  pub suggestion: Option<String>,
  /// Additional metadata (for JSON output)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<serde_json::Value>,
}

impl CheckResult {
  /// Create a passing check result
  pub fn pass(check_name: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      check_name: check_name.into(),
      passed: true,
      severity: Severity::Info,
      message: message.into(),
      suggestion: None,
      details: None,
    }
  }

  /// Create a failing check result with error severity
  pub fn error(
    check_name: impl Into<String>,
    message: impl Into<String>,
    suggestion: Option<impl Into<String>>,
  ) -> Self {
    Self {
      check_name: check_name.into(),
      passed: false,
      severity: Severity::Error,
      message: message.into(),
      suggestion: suggestion.map(|s| s.into()),
      details: None,
    }
  }

  /// Create a failing check result with warning severity
  pub fn warning(
    check_name: impl Into<String>,
    message: impl Into<String>,
    suggestion: Option<impl Into<String>>,
  ) -> Self {
    Self {
      check_name: check_name.into(),
      passed: false,
      severity: Severity::Warning,
      message: message.into(),
      suggestion: suggestion.map(|s| s.into()),
      details: None,
    }
  }

  /// Add details to the check result
  pub fn with_details(mut self, details: serde_json::Value) -> Self {
    self.details = Some(details);
    self
  }

  /// Failed with error severity
  pub fn is_blocking(&self) -> bool {
    !self.passed && self.severity == Severity::Error
  }
}

/// Context passed to checks
#[derive(Debug, Clone)]
pub struct CheckContext {
  /// Node being validated
  pub node: ContentNode,
  /// Label failures are filed under (the owning page for sections)
  pub subject: String,
  /// Resolved page of a page-reference, if any
  pub page: Option<ContentNode>,
  /// Languages of the release (empty = all)
  pub languages: Vec<String>,
}

/// Validation rule
///
/// # Example
///
/// ```rust,ignore
/// struct TitleCheck;
///
/// impl Check for TitleCheck {
///   fn name(&self) -> &str {
///     "title"
///   }
///
///   fn description(&self) -> &str {
///     "Pages need a title"
///   }
///
///   fn run(&self, ctx: &CheckContext) -> RailResult<CheckResult> {
///     if ctx.node.display_name.is_empty() {
///       Ok(CheckResult::error(self.name(), "title missing", Some("Set a title")))
///     } else {
///       Ok(CheckResult::pass(self.name(), "ok"))
///     }
///   }
/// }
/// ```
pub trait Check: Send + Sync {
  /// Unique name for this check (kebab-case)
  fn name(&self) -> &str;

  /// Human-readable description of what this check validates
  fn description(&self) -> &str;

  /// Run the check and return a result
  fn run(&self, ctx: &CheckContext) -> RailResult<CheckResult>;

  /// Whether this check applies to nodes of `kind`
  /// Default: every kind
  fn applies_to(&self, _kind: NodeKind) -> bool {
    true
  }
}
