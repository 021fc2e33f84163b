//! Test helpers for integration tests

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch directory holding one repository snapshot
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Create a repo whose snapshot is `snapshot`
  pub fn new(snapshot: Value) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    std::fs::write(path.join("repo.json"), serde_json::to_string_pretty(&snapshot)?)?;
    Ok(Self { _root: root, path })
  }

  pub fn snapshot_path(&self) -> String {
    self.path.join("repo.json").display().to_string()
  }

  pub fn session_path(&self) -> String {
    self.path.join("session.json").display().to_string()
  }

  /// Current snapshot on disk
  pub fn snapshot(&self) -> Result<Value> {
    let content = std::fs::read_to_string(self.path.join("repo.json"))?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Session written by the last step
  pub fn session(&self) -> Result<Value> {
    let content = std::fs::read_to_string(self.path.join("session.json")).context("Session file missing")?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Status of node `id`, `None` once it is deleted
  pub fn status_of(&self, id: u64) -> Result<Option<String>> {
    let snapshot = self.snapshot()?;
    let nodes = snapshot["nodes"].as_array().context("snapshot without nodes")?;
    Ok(
      nodes
        .iter()
        .find(|n| n["id"].as_u64() == Some(id))
        .and_then(|n| n["status"].as_str())
        .map(str::to_string),
    )
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// Page (1) and a changed page-reference (2) pointing at it
pub fn page_with_reference() -> Value {
  serde_json::json!({
    "nodes": [
      { "id": 1, "uid": "home", "display_name": "Home", "kind": "page", "status": "never-released" },
      { "id": 2, "uid": "home-ref", "display_name": "Home", "kind": "page-reference", "status": "changed", "page": 1 }
    ],
    "references": [
      { "source": { "node": 2 }, "target": { "node": 1 } }
    ]
  })
}

/// Changed page (2) referencing a page that was never released (1)
pub fn unreleased_reference() -> Value {
  serde_json::json!({
    "nodes": [
      { "id": 1, "uid": "legal", "display_name": "Legal", "kind": "page", "status": "never-released" },
      { "id": 2, "uid": "home", "display_name": "Home", "kind": "page", "status": "changed" }
    ],
    "references": [
      { "source": { "node": 2 }, "target": { "node": 1 } }
    ]
  })
}

/// Site root (1), changed folder (2) with two document groups (3, 4)
pub fn folder_with_two_groups() -> Value {
  serde_json::json!({
    "nodes": [
      { "id": 1, "uid": "site", "kind": "site-root", "status": "released" },
      { "id": 2, "uid": "news", "kind": "site-folder", "status": "changed", "parent": 1 },
      { "id": 3, "uid": "archive", "kind": "document-group", "status": "released", "parent": 2 },
      { "id": 4, "uid": "latest", "kind": "document-group", "status": "released", "parent": 2 }
    ]
  })
}

/// Run the content-rail binary, failing on a non-zero exit
pub fn run_content_rail(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_content_rail_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "content-rail command failed: content-rail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run the content-rail binary and hand back whatever it produced
pub fn run_content_rail_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_content-rail");
  Command::new(bin)
    .current_dir(cwd)
    .env("CONTENT_RAIL_LOG", "warn")
    .args(args)
    .output()
    .context("Failed to run content-rail")
}

pub fn stdout_json(output: &Output) -> Result<Value> {
  serde_json::from_slice(&output.stdout).context("stdout is not JSON")
}
