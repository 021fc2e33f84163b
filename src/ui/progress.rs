//! Progress indicators for release and delete batches
//!
//! Uses `linya` for allocation-free progress bars on stderr

use crate::graph::model::ObjectRef;
use crate::release::executor::ApplyObserver;
use linya::{Bar, Progress};

/// Progress bar fed by an executor run
pub struct ApplyProgress {
  label: String,
  progress: Progress,
  bar: Option<Bar>,
}

impl ApplyProgress {
  /// Create a progress bar; it is drawn once the batch size is known
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      progress: Progress::new(),
      bar: None,
    }
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    if let Some(bar) = &self.bar {
      self.progress.inc_and_draw(bar, 1);
    }
  }
}

impl ApplyObserver for ApplyProgress {
  fn started(&mut self, total: usize) {
    if total > 0 {
      self.bar = Some(self.progress.bar(total, self.label.clone()));
    }
  }

  fn applied(&mut self, _object: &ObjectRef) {
    self.inc();
  }
}
