//! Tests for driving single workflow steps through a session file

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_steps_share_the_session_file() -> Result<()> {
  let repo = TestRepo::new(unreleased_reference())?;
  let snapshot = repo.snapshot_path();
  let session = repo.session_path();

  let output = run_content_rail(
    &repo.path,
    &["step", "release-find-related", &snapshot, "--node", "2", "--session", &session],
  )?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "release_conflict");
  let stored = repo.session()?;
  assert!(stored["wfNotReleasedElements"].to_string().contains("Legal (legal, 1)"));

  let output = run_content_rail(
    &repo.path,
    &[
      "step",
      "release-show-not-released",
      &snapshot,
      "--node",
      "2",
      "--session",
      &session,
      "--format",
      "json",
    ],
  )?;
  let outcome = stdout_json(&output)?;
  assert_eq!(outcome["transition"], "check_not_released_objects");
  assert!(outcome["dialogs"][0][1].as_str().unwrap().contains("Legal (legal, 1)"));
  Ok(())
}

#[test]
fn test_branch_step() -> Result<()> {
  let repo = TestRepo::new(folder_with_two_groups())?;

  let folder = run_content_rail(&repo.path, &["step", "delete-branch", &repo.snapshot_path(), "--node", "2"])?;
  let group = run_content_rail(&repo.path, &["step", "delete-branch", &repo.snapshot_path(), "--node", "3"])?;

  assert_eq!(String::from_utf8_lossy(&folder.stdout).trim(), "folder");
  assert_eq!(String::from_utf8_lossy(&group.stdout).trim(), "element");
  Ok(())
}

#[test]
fn test_record_start_aborts_delete_step() -> Result<()> {
  let mut snapshot = folder_with_two_groups();
  snapshot["records"] = serde_json::json!([{ "id": 7, "display_name": "Product", "table": "products" }]);
  let repo = TestRepo::new(snapshot)?;

  let output = run_content_rail_raw(
    &repo.path,
    &["step", "delete-find-related", &repo.snapshot_path(), "--record", "7"],
  )?;

  assert_eq!(output.status.code(), Some(4));
  Ok(())
}
