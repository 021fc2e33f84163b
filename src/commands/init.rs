//! Init command: write a default rail.toml

use crate::core::config::RailConfig;
use crate::core::error::{RailError, RailResult};
use std::path::Path;

/// Run the init command
pub fn run_init(dir: &Path, force: bool) -> RailResult<()> {
  if RailConfig::exists(dir) && !force {
    return Err(RailError::with_help(
      format!("Configuration already exists in {}", dir.display()),
      "Pass --force to overwrite it",
    ));
  }

  RailConfig::default().save(dir)?;
  println!("✅ Wrote {}", dir.join("rail.toml").display());
  Ok(())
}
