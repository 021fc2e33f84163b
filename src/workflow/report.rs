//! Dialog text for conflicts and never-released objects

use crate::core::context::WorkflowContext;
use crate::delete::executor::LockedObject;
use crate::release::verdict::{Conflict, ConflictRecord};
use crate::workflow::dialog::DialogChannel;
use std::collections::{BTreeMap, BTreeSet};

pub const CONFLICTS_TITLE: &str = "Conflicts";

/// "label:\n\nentry\nentry\n" or nothing for an empty list
fn section<'a>(label: &str, entries: impl IntoIterator<Item = &'a str>) -> String {
  let mut out = String::new();
  for entry in entries {
    if out.is_empty() {
      out.push_str(label);
      out.push_str(":\n\n");
    }
    out.push_str(entry);
    out.push('\n');
  }
  out
}

fn names(set: &BTreeSet<Conflict>) -> impl Iterator<Item = &str> {
  set.iter().map(|c| c.display_name.as_str())
}

/// Never-released objects followed by the broken-references note
pub fn not_released_message(not_released: &BTreeMap<String, String>, broken_references: bool) -> String {
  let mut message = section("Objects that were never released", not_released.keys().map(String::as_str));
  if broken_references {
    if !message.is_empty() {
      message.push('\n');
    }
    message.push_str("Broken references were found");
  }
  message
}

/// One dialog per non-empty conflict category
pub fn conflict_dialogs(record: &ConflictRecord) -> Vec<(String, String)> {
  let mut dialogs = Vec::new();
  let mut push = |title: &str, body: String| {
    if !body.is_empty() {
      dialogs.push((title.to_string(), body));
    }
  };

  push("Locked objects", section("Objects locked by another session", names(&record.locked)));
  push("Missing permissions", section("Objects you may not release", names(&record.denied)));
  push("Broken references", section("Objects holding broken references", names(&record.broken)));
  push("Objects in workflow", section("Objects with a pending task", names(&record.in_workflow)));
  push("Store errors", section("Objects the store rejected", names(&record.failed)));

  let mut validation = String::new();
  for (subject, messages) in &record.validation.failures {
    for message in messages {
      validation.push_str(&format!("{}: {}\n", subject, message));
    }
  }
  push("Validation failed", validation);
  dialogs
}

/// Dialogs for what a reference check stored in the context
pub fn reference_dialogs(ctx: &WorkflowContext) -> Vec<(String, String)> {
  let mut dialogs = Vec::new();
  let not_released = not_released_message(&ctx.not_released, ctx.broken_references);
  if !not_released.is_empty() {
    dialogs.push((CONFLICTS_TITLE.to_string(), not_released));
  }
  let in_workflow = section("Objects with a pending task", ctx.in_workflow.keys().map(String::as_str));
  if !in_workflow.is_empty() {
    dialogs.push(("Objects in workflow".to_string(), in_workflow));
  }
  dialogs
}

/// "uid (kind)" per locked object
pub fn locked_message(locked: &[LockedObject]) -> String {
  let lines: Vec<String> = locked.iter().map(|o| format!("{} ({})", o.name, o.kind)).collect();
  section("Objects locked by another session", lines.iter().map(String::as_str))
}

/// Show every dialog unless suppressed
pub fn show_all(dialog: &mut dyn DialogChannel, dialogs: &[(String, String)], suppress: bool) {
  if suppress {
    return;
  }
  for (title, body) in dialogs {
    dialog.inform(title, body);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_released_message_layout() {
    let mut map = BTreeMap::new();
    map.insert("b (b, 2)".to_string(), "page".to_string());
    map.insert("a (a, 1)".to_string(), "media".to_string());

    assert_eq!(
      not_released_message(&map, true),
      "Objects that were never released:\n\na (a, 1)\nb (b, 2)\n\nBroken references were found"
    );
    assert_eq!(not_released_message(&BTreeMap::new(), true), "Broken references were found");
    assert!(not_released_message(&BTreeMap::new(), false).is_empty());
  }

  #[test]
  fn test_one_dialog_per_category() {
    let mut record = ConflictRecord::default();
    record.locked.insert(Conflict::new("news (n1, 1)", "site-folder"));
    record.denied.insert(Conflict::new("home (n2, 2)", "page"));
    record.validation.add("home (n2, 2)", "headline is required");

    let dialogs = conflict_dialogs(&record);
    let titles: Vec<&str> = dialogs.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(titles, vec!["Locked objects", "Missing permissions", "Validation failed"]);
    assert!(dialogs[2].1.contains("home (n2, 2): headline is required"));
  }

  #[test]
  fn test_locked_message() {
    let locked = vec![LockedObject {
      kind: "page".to_string(),
      name: "home".to_string(),
    }];
    assert_eq!(locked_message(&locked), "Objects locked by another session:\n\nhome (page)\n");
  }
}
