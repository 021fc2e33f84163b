//! Tests for the `status` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_status_json() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;

  let output = run_content_rail(
    &repo.path,
    &["status", &repo.snapshot_path(), "--node", "2", "--format", "json"],
  )?;
  let status = stdout_json(&output)?;

  assert_eq!(status["kind"], "page-reference");
  assert_eq!(status["state"], "changed");
  assert_eq!(status["groups"][0], "Home (home-ref, 2)");
  Ok(())
}

#[test]
fn test_status_text_for_folder() -> Result<()> {
  let repo = TestRepo::new(folder_with_two_groups())?;

  let output = run_content_rail(&repo.path, &["status", &repo.snapshot_path(), "--node", "2"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("state:  changed"));
  assert!(stdout.contains("no workflow group"));
  Ok(())
}
