mod checks;
mod commands;
mod core;
mod delete;
mod graph;
mod logging;
mod release;
mod ui;
mod workflow;

use clap::{Args, Parser, Subcommand};
use commands::OutputFormat;
use commands::step::StepName;
use core::config::{DeleteEnvironment, RailConfig};
use core::error::{RailError, RailResult, print_error};
use std::path::PathBuf;

/// Release and delete closures for a content repository
#[derive(Parser)]
#[command(name = "content-rail")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct RailCli {
  /// Path to rail.toml (default: searched in the current directory)
  #[arg(long, global = true)]
  config: Option<PathBuf>,
  /// Log level or filter directive (overrides [logging].level)
  #[arg(long, global = true)]
  log_level: Option<String>,
  /// Log JSON lines instead of human-readable output
  #[arg(long, global = true)]
  json_logs: bool,
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Setup & Inspection
  // ============================================================================
  /// Write a default rail.toml into the current directory
  Init {
    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
  },

  /// Show the release state of a node
  Status {
    /// Snapshot file (JSON)
    snapshot: PathBuf,
    /// Id of the node to inspect
    #[arg(long)]
    node: u64,
    /// Language to report on (default: all languages)
    #[arg(long)]
    lang: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  // ============================================================================
  // Workflows
  // ============================================================================
  /// Release a node or record together with everything it depends on
  #[command(subcommand)]
  Release(ReleaseCommands),

  /// Delete a node and release what it leaves behind
  #[command(subcommand)]
  Delete(DeleteCommands),

  /// Run a single workflow step against a session file
  Step {
    /// Step to run
    #[arg(value_enum)]
    step: StepName,
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    release: ReleaseFlags,
    #[command(flatten)]
    delete: DeleteFlags,
    /// Answer yes to every question
    #[arg(short, long)]
    yes: bool,
    /// Leave the snapshot file untouched
    #[arg(long)]
    no_write: bool,
  },
}

#[derive(Subcommand)]
enum ReleaseCommands {
  /// Check references and show what a release would publish
  Plan {
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    release: ReleaseFlags,
  },

  /// Run the release workflow and write the result back to the snapshot
  Apply {
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    release: ReleaseFlags,
    /// Release even when references were never released
    #[arg(long)]
    force: bool,
    /// Leave the snapshot file untouched
    #[arg(long)]
    no_write: bool,
  },
}

#[derive(Subcommand)]
enum DeleteCommands {
  /// Show what a delete would remove and release
  Plan {
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    delete: DeleteFlags,
  },

  /// Run the delete workflow and write the result back to the snapshot
  Apply {
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    delete: DeleteFlags,
    /// Delete even when other objects still reference the target
    #[arg(long)]
    force: bool,
    /// Answer yes to every question
    #[arg(short, long)]
    yes: bool,
    /// Leave the snapshot file untouched
    #[arg(long)]
    no_write: bool,
  },
}

/// Snapshot and start object shared by workflow commands
#[derive(Args)]
struct TargetArgs {
  /// Snapshot file (JSON)
  snapshot: PathBuf,
  /// Id of the node the workflow starts on
  #[arg(long, conflicts_with = "record", required_unless_present = "record")]
  node: Option<u64>,
  /// Id of the structured record the workflow starts on
  #[arg(long)]
  record: Option<u64>,
  /// Session file carrying results between steps
  #[arg(long)]
  session: Option<PathBuf>,
  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,
}

impl From<TargetArgs> for commands::Target {
  fn from(args: TargetArgs) -> Self {
    commands::Target {
      snapshot: args.snapshot,
      node: args.node,
      record: args.record,
      session: args.session,
    }
  }
}

/// Overrides for the [release] table
#[derive(Args)]
struct ReleaseFlags {
  /// Release referenced media as well
  #[arg(long)]
  media: bool,
  /// Release the whole subtree below the start node
  #[arg(long)]
  recursive: bool,
  /// Languages to release (repeatable; default: all)
  #[arg(long = "lang")]
  languages: Vec<String>,
}

/// Overrides for the [delete] table
#[derive(Args)]
struct DeleteFlags {
  /// Run with the interactive editor rules instead of headless ones
  #[arg(long)]
  interactive: bool,
}

impl ReleaseFlags {
  fn apply(self, config: &mut RailConfig) {
    config.release.include_media |= self.media;
    config.release.recursive |= self.recursive;
    if !self.languages.is_empty() {
      config.release.languages = self.languages;
    }
  }
}

impl DeleteFlags {
  fn apply(self, config: &mut RailConfig) {
    if self.interactive {
      config.delete.environment = DeleteEnvironment::Interactive;
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = RailCli::parse();

  let current_dir = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // init runs before any rail.toml exists, so a broken one must not stop it
  let config = match load_config(cli.config.as_deref(), &current_dir) {
    Ok(config) => config,
    Err(e) if matches!(cli.command, Commands::Init { .. }) => {
      eprintln!("Warning: Ignoring unreadable configuration: {}", e);
      RailConfig::default()
    }
    Err(e) => handle_error(e),
  };

  let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
  logging::init(&level, cli.json_logs || config.logging.json);

  let result = match cli.command {
    // Setup & Inspection
    Commands::Init { force } => commands::run_init(&current_dir, force),
    Commands::Status {
      snapshot,
      node,
      lang,
      format,
    } => commands::run_status(&snapshot, node, lang, format),

    // Workflows
    Commands::Release(release_cmd) => match release_cmd {
      ReleaseCommands::Plan { target, release } => {
        let mut config = config;
        release.apply(&mut config);
        let format = target.format;
        commands::run_release_plan(target.into(), config, format)
      }
      ReleaseCommands::Apply {
        target,
        release,
        force,
        no_write,
      } => {
        let mut config = config;
        release.apply(&mut config);
        let options = commands::release::ApplyOptions {
          force,
          no_write,
          format: target.format,
        };
        commands::run_release_apply(target.into(), config, options)
      }
    },
    Commands::Delete(delete_cmd) => match delete_cmd {
      DeleteCommands::Plan { target, delete } => {
        let mut config = config;
        delete.apply(&mut config);
        let format = target.format;
        commands::run_delete_plan(target.into(), config, format)
      }
      DeleteCommands::Apply {
        target,
        delete,
        force,
        yes,
        no_write,
      } => {
        let mut config = config;
        delete.apply(&mut config);
        let options = commands::delete::ApplyOptions {
          force,
          yes,
          no_write,
          format: target.format,
        };
        commands::run_delete_apply(target.into(), config, options)
      }
    },
    Commands::Step {
      step,
      target,
      release,
      delete,
      yes,
      no_write,
    } => {
      let mut config = config;
      release.apply(&mut config);
      delete.apply(&mut config);
      let options = commands::step::StepOptions {
        yes,
        no_write,
        format: target.format,
      };
      commands::run_step(target.into(), config, step, options)
    }
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

/// Config from `--config`, else rail.toml in `dir`, else defaults
fn load_config(explicit: Option<&std::path::Path>, dir: &std::path::Path) -> RailResult<RailConfig> {
  match explicit {
    Some(path) => RailConfig::load_file(path),
    None => RailConfig::load_or_default(dir),
  }
}

fn handle_error(err: RailError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
