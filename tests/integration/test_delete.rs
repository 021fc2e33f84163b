//! Tests for the `delete` commands

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_headless_delete_releases_parent() -> Result<()> {
  let repo = TestRepo::new(folder_with_two_groups())?;

  run_content_rail(&repo.path, &["delete", "apply", &repo.snapshot_path(), "--node", "3"])?;

  assert_eq!(repo.status_of(3)?, None);
  assert_eq!(repo.status_of(4)?.as_deref(), Some("released"));
  assert_eq!(repo.status_of(2)?.as_deref(), Some("released"));
  Ok(())
}

#[test]
fn test_folder_with_children_needs_confirmation() -> Result<()> {
  let repo = TestRepo::new(folder_with_two_groups())?;

  // stdin is closed, so the question is answered with no
  let output = run_content_rail(&repo.path, &["delete", "apply", &repo.snapshot_path(), "--node", "2"])?;
  assert!(String::from_utf8_lossy(&output.stdout).contains("Deletion aborted"));
  assert_eq!(repo.status_of(2)?.as_deref(), Some("changed"));

  run_content_rail(
    &repo.path,
    &["delete", "apply", &repo.snapshot_path(), "--node", "2", "--yes"],
  )?;
  assert_eq!(repo.status_of(2)?, None);
  assert_eq!(repo.status_of(3)?, None);
  assert_eq!(repo.status_of(1)?.as_deref(), Some("released"));
  Ok(())
}

#[test]
fn test_referenced_target_needs_force() -> Result<()> {
  let repo = TestRepo::new(unreleased_reference())?;

  let output = run_content_rail_raw(&repo.path, &["delete", "apply", &repo.snapshot_path(), "--node", "1"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("reference_conflict"), "stderr: {}", stderr);
  assert!(stderr.contains("Home (home, 2)"), "stderr: {}", stderr);
  assert_eq!(repo.status_of(1)?.as_deref(), Some("never-released"));

  run_content_rail(
    &repo.path,
    &["delete", "apply", &repo.snapshot_path(), "--node", "1", "--force"],
  )?;
  assert_eq!(repo.status_of(1)?, None);
  Ok(())
}

#[test]
fn test_delete_plan_json() -> Result<()> {
  let repo = TestRepo::new(folder_with_two_groups())?;

  let output = run_content_rail(
    &repo.path,
    &["delete", "plan", &repo.snapshot_path(), "--node", "3", "--format", "json"],
  )?;
  let plan = stdout_json(&output)?;

  assert_eq!(plan["references"], "reference_ok");
  assert_eq!(plan["plan"]["metadata"]["is_destructive"], true);
  assert_eq!(plan["plan"]["operations"][0]["type"], "delete_node");
  assert_eq!(repo.status_of(3)?.as_deref(), Some("released"));
  Ok(())
}

#[test]
fn test_locked_parent_fails_test_delete() -> Result<()> {
  let mut snapshot = folder_with_two_groups();
  snapshot["locked_elsewhere"] = serde_json::json!([2]);
  let repo = TestRepo::new(snapshot)?;

  let output = run_content_rail_raw(&repo.path, &["delete", "apply", &repo.snapshot_path(), "--node", "3"])?;

  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("news (site-folder)"), "stderr: {}", stderr);
  assert_eq!(repo.status_of(3)?.as_deref(), Some("released"));
  Ok(())
}
