//! Validation rules run before a node is released

pub mod display_name;
pub mod form_errors;
pub mod page_reference;
pub mod runner;
pub mod trait_def;

pub use runner::{CheckRunner, create_default_runner};
pub use trait_def::{Check, CheckContext, CheckResult, Severity};
