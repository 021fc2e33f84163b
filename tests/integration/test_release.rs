//! Tests for the `release` commands

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_release_apply_publishes_page_reference_and_page() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;

  run_content_rail(&repo.path, &["release", "apply", &repo.snapshot_path(), "--node", "2"])?;

  assert_eq!(repo.status_of(1)?.as_deref(), Some("released"));
  assert_eq!(repo.status_of(2)?.as_deref(), Some("released"));
  Ok(())
}

#[test]
fn test_release_apply_json_lists_steps() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;

  let output = run_content_rail(
    &repo.path,
    &["release", "apply", &repo.snapshot_path(), "--node", "2", "--format", "json"],
  )?;
  let report = stdout_json(&output)?;
  let transitions: Vec<&str> = report["steps"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["transition"].as_str().unwrap())
    .collect();
  assert_eq!(transitions, vec!["reference_ok", "test_finished", "finish"]);
  Ok(())
}

#[test]
fn test_release_apply_no_write_leaves_snapshot() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;

  run_content_rail(
    &repo.path,
    &["release", "apply", &repo.snapshot_path(), "--node", "2", "--no-write"],
  )?;

  assert_eq!(repo.status_of(1)?.as_deref(), Some("never-released"));
  Ok(())
}

#[test]
fn test_unreleased_reference_stops_release() -> Result<()> {
  let repo = TestRepo::new(unreleased_reference())?;

  let output = run_content_rail_raw(&repo.path, &["release", "apply", &repo.snapshot_path(), "--node", "2"])?;

  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("release_conflict"), "stderr: {}", stderr);
  assert!(stderr.contains("Legal (legal, 1)"), "stderr: {}", stderr);
  assert_eq!(repo.status_of(2)?.as_deref(), Some("changed"));
  Ok(())
}

#[test]
fn test_release_plan_json() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;

  let output = run_content_rail(
    &repo.path,
    &["release", "plan", &repo.snapshot_path(), "--node", "2", "--format", "json"],
  )?;
  let plan = stdout_json(&output)?;

  assert_eq!(plan["references"], "reference_ok");
  assert_eq!(plan["plan"]["metadata"]["operation_type"], "release");
  assert!(!plan["plan"]["operations"].as_array().unwrap().is_empty());
  assert_eq!(repo.status_of(2)?.as_deref(), Some("changed"));
  Ok(())
}

#[test]
fn test_unknown_node_is_rejected() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;

  let output = run_content_rail_raw(&repo.path, &["release", "plan", &repo.snapshot_path(), "--node", "99"])?;

  assert!(!output.status.success());
  Ok(())
}

#[test]
fn test_fail_check_switch_in_config() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;
  std::fs::write(repo.path.join("rail.toml"), "[workflow]\nfail_check = true\n")?;

  let output = run_content_rail_raw(&repo.path, &["release", "apply", &repo.snapshot_path(), "--node", "2"])?;

  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("test_failed"));
  assert_eq!(repo.status_of(1)?.as_deref(), Some("never-released"));
  Ok(())
}
