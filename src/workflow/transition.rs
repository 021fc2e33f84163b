//! Named transitions a workflow step can fire

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outgoing transition of a workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
  ReferenceOk,
  ReleaseConflict,
  TestFinished,
  TestFailed,
  Finish,
  ReleaseFailed,
  CheckNotReleasedObjects,
  FolderOk,
  AbortDeletion,
  CheckConflict,
  ReferenceConflict,
  DeleteFailed,
  Folder,
  Element,
  #[serde(rename = "reference_ok_2")]
  ReferenceOk2,
}

impl Transition {
  pub fn as_str(&self) -> &'static str {
    match self {
      Transition::ReferenceOk => "reference_ok",
      Transition::ReleaseConflict => "release_conflict",
      Transition::TestFinished => "test_finished",
      Transition::TestFailed => "test_failed",
      Transition::Finish => "finish",
      Transition::ReleaseFailed => "release_failed",
      Transition::CheckNotReleasedObjects => "check_not_released_objects",
      Transition::FolderOk => "folder_ok",
      Transition::AbortDeletion => "abort_deletion",
      Transition::CheckConflict => "check_conflict",
      Transition::ReferenceConflict => "reference_conflict",
      Transition::DeleteFailed => "delete_failed",
      Transition::Folder => "folder",
      Transition::Element => "element",
      Transition::ReferenceOk2 => "reference_ok_2",
    }
  }

  /// Transitions that end in the happy path of their step
  pub fn is_success(&self) -> bool {
    matches!(
      self,
      Transition::ReferenceOk
        | Transition::TestFinished
        | Transition::Finish
        | Transition::FolderOk
        | Transition::CheckNotReleasedObjects
        | Transition::Folder
        | Transition::Element
        | Transition::ReferenceOk2
    )
  }
}

impl fmt::Display for Transition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_serialized_names_match_display() {
    for transition in [Transition::ReleaseConflict, Transition::ReferenceOk2, Transition::CheckNotReleasedObjects] {
      let json = serde_json::to_string(&transition).unwrap();
      assert_eq!(json, format!("\"{}\"", transition));
    }
  }

  #[test]
  fn test_conflicts_are_not_success() {
    assert!(!Transition::ReleaseConflict.is_success());
    assert!(!Transition::DeleteFailed.is_success());
    assert!(!Transition::AbortDeletion.is_success());
    assert!(Transition::Finish.is_success());
  }
}
