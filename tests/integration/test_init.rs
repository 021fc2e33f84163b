//! Tests for the `init` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_init_creates_config() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;

  run_content_rail(&repo.path, &["init"])?;

  assert!(repo.file_exists("rail.toml"));
  let config = repo.read_file("rail.toml")?;
  assert!(config.contains("[release]"));
  assert!(config.contains("[delete]"));
  Ok(())
}

#[test]
fn test_init_refuses_to_overwrite() -> Result<()> {
  let repo = TestRepo::new(page_with_reference())?;
  std::fs::write(repo.path.join("rail.toml"), "[release]\ninclude_media = true\n")?;

  let output = run_content_rail_raw(&repo.path, &["init"])?;
  assert!(!output.status.success());
  assert!(repo.read_file("rail.toml")?.contains("include_media = true"));

  run_content_rail(&repo.path, &["init", "--force"])?;
  assert!(repo.read_file("rail.toml")?.contains("include_media = false"));
  Ok(())
}
