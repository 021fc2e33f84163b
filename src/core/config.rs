use crate::core::error::{ConfigError, RailError, RailResult, ResultExt};
use crate::graph::model::Flags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration for content-rail
/// Searched in order: rail.toml, .rail.toml, .config/rail.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailConfig {
  #[serde(default)]
  pub release: ReleaseConfig,
  #[serde(default)]
  pub delete: DeleteConfig,
  #[serde(default)]
  pub workflow: WorkflowConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// Defaults for release closures
///
/// # Example
///
/// ```toml
/// [release]
/// include_media = true
/// recursive = false
/// languages = ["de", "en"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Release referenced media along with the start node
  #[serde(default)]
  pub include_media: bool,

  /// Release folders with everything below them
  #[serde(default)]
  pub recursive: bool,

  /// Languages whose state decides "released" (empty = all)
  #[serde(default)]
  pub languages: Vec<String>,
}

impl ReleaseConfig {
  pub fn flags(&self) -> Flags {
    Flags {
      include_media: self.include_media,
      recursive: self.recursive,
      languages: self.languages.clone(),
    }
  }
}

/// Where a delete workflow runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteEnvironment {
  /// Editor-driven: prune emptied folders upwards
  Interactive,
  /// Programmatic: delete only the target and release its parent
  #[default]
  Headless,
}

impl fmt::Display for DeleteEnvironment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeleteEnvironment::Interactive => write!(f, "interactive"),
      DeleteEnvironment::Headless => write!(f, "headless"),
    }
  }
}

impl FromStr for DeleteEnvironment {
  type Err = RailError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "interactive" => Ok(DeleteEnvironment::Interactive),
      "headless" => Ok(DeleteEnvironment::Headless),
      _ => Err(RailError::Config(ConfigError::InvalidValue {
        field: "delete.environment".to_string(),
        reason: format!("'{}' is not 'interactive' or 'headless'", s),
      })),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfig {
  #[serde(default)]
  pub environment: DeleteEnvironment,
}

/// Switches used by automated workflow runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
  /// Never show dialogs (conflicts are still logged and stored in the session)
  #[serde(default)]
  pub suppress_dialogs: bool,

  /// Force the check-only step to fail
  #[serde(default)]
  pub fail_check: bool,

  /// Force the apply step to fail
  #[serde(default)]
  pub fail_apply: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
  /// Default filter directive (overridden by `CONTENT_RAIL_LOG`)
  #[serde(default = "default_log_level")]
  pub level: String,

  /// Emit JSON lines instead of human-readable output
  #[serde(default)]
  pub json: bool,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      json: false,
    }
  }
}

impl RailConfig {
  /// Find config file in search order: rail.toml, .rail.toml, .config/rail.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("rail.toml"),
      path.join(".rail.toml"),
      path.join(".config").join("rail.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from rail.toml (searches multiple locations)
  pub fn load(path: &Path) -> RailResult<Self> {
    let config_path = Self::find_config_path(path)
      .ok_or_else(|| RailError::Config(ConfigError::NotFound { root: path.to_path_buf() }))?;
    Self::load_file(&config_path)
  }

  /// Load config from an explicit file
  pub fn load_file(config_path: &Path) -> RailResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: RailConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate()?;
    Ok(config)
  }

  /// Config from `path` if one exists there, defaults otherwise
  pub fn load_or_default(path: &Path) -> RailResult<Self> {
    match Self::find_config_path(path) {
      Some(config_path) => Self::load_file(&config_path),
      None => Ok(Self::default()),
    }
  }

  /// Save config to rail.toml (default location)
  pub fn save(&self, path: &Path) -> RailResult<()> {
    let config_path = path.join("rail.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(())
  }

  /// Check if config exists at the given path
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }

  /// Workflows run inside the interactive editor
  pub fn is_interactive(&self) -> bool {
    self.delete.environment == DeleteEnvironment::Interactive
  }

  pub fn validate(&self) -> RailResult<()> {
    if let Some(position) = self.release.languages.iter().position(|l| l.trim().is_empty()) {
      return Err(RailError::Config(ConfigError::InvalidValue {
        field: "release.languages".to_string(),
        reason: format!("entry {} is empty", position),
      }));
    }

    match self.logging.level.to_lowercase().as_str() {
      "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
      other => {
        return Err(RailError::Config(ConfigError::InvalidValue {
          field: "logging.level".to_string(),
          reason: format!("'{}' is not a log level", other),
        }));
      }
    }

    Ok(())
  }
}
