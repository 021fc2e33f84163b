//! User-facing dialogs raised by workflow steps
//!
//! Steps never print directly. They go through a `DialogChannel` so the CLI can
//! talk to a terminal and tests can record what would have been shown.

use std::io::{self, BufRead, Write};
use tracing::warn;

pub trait DialogChannel {
  /// Show a message the user only acknowledges
  fn inform(&mut self, title: &str, message: &str);

  /// Ask a yes/no question
  fn ask_yes_no(&mut self, title: &str, question: &str) -> bool;
}

/// Dialogs on stderr, questions answered on stdin
pub struct ConsoleDialog {
  assume_yes: bool,
}

impl ConsoleDialog {
  pub fn new(assume_yes: bool) -> Self {
    Self { assume_yes }
  }
}

impl DialogChannel for ConsoleDialog {
  fn inform(&mut self, title: &str, message: &str) {
    eprintln!("\n⚠️  {}\n", title);
    for line in message.lines() {
      eprintln!("   {}", line);
    }
    eprintln!();
  }

  fn ask_yes_no(&mut self, title: &str, question: &str) -> bool {
    if self.assume_yes {
      return true;
    }
    eprint!("\n❓ {}: {} [y/N]: ", title, question);
    if io::stderr().flush().is_err() {
      return false;
    }

    let mut input = String::new();
    match io::stdin().lock().read_line(&mut input) {
      Ok(_) => matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
      Err(e) => {
        warn!(error = %e, "could not read answer, treating as no");
        false
      }
    }
  }
}

/// Remembers every dialog and answers questions with a fixed reply
#[derive(Debug, Default)]
pub struct RecordingDialog {
  pub answer: bool,
  pub shown: Vec<(String, String)>,
  pub asked: Vec<(String, String)>,
}

impl RecordingDialog {
  pub fn answering(answer: bool) -> Self {
    Self {
      answer,
      ..Default::default()
    }
  }
}

impl DialogChannel for RecordingDialog {
  fn inform(&mut self, title: &str, message: &str) {
    self.shown.push((title.to_string(), message.to_string()));
  }

  fn ask_yes_no(&mut self, title: &str, question: &str) -> bool {
    self.asked.push((title.to_string(), question.to_string()));
    self.answer
  }
}
