//! Delete planning and execution
//!
//! - **prerequisites**: related-object check, folder confirmation, illegal targets
//! - **closure**: what is deleted and which parents are released afterwards
//! - **executor**: lock dry run, delete batch, follow-up releases

pub mod closure;
pub mod executor;
pub mod prerequisites;

pub use closure::{DeleteSets, build_delete_closure};
pub use executor::{DeleteCheck, LockedObject, execute_delete, test_delete};
pub use prerequisites::{Branch, Prerequisites, branch_if_folder, check_prerequisites, related_objects};
