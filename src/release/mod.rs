//! Release closure computation and execution
//!
//! # Pipeline
//!
//! 1. **Eligibility** (`eligibility`): per-kind rules decide what a release may pick up
//! 2. **Closure** (`closure`): walk references from the start nodes and collect
//!    everything that has to go out together, ordered page store first
//! 3. **Verdict** (`verdict`): check the collected references and fold the
//!    findings into the release gate
//! 4. **Executor** (`executor`): apply the closure node by node, best effort,
//!    and report every failure at the end
//!
//! `status` answers the editor-facing "what state is this node in" question.
//!
//! # Ordering
//!
//! The executor applies in closure order. Pages go before the site structure that
//! references them; site structure goes before media:
//!
//! ```text
//! page store  <  site store  <  everything else  <  unresolved / records
//! ```

pub mod closure;
pub mod eligibility;
pub mod executor;
pub mod status;
pub mod verdict;

pub use closure::{ClosureOptions, ReleaseClosure, build_release_closure};
pub use eligibility::ReleaseScope;
pub use executor::{ExecuteOptions, ExecutionReport, execute_record_release, execute_release};
pub use verdict::{ConflictRecord, ReleaseVerdict, check_references};
