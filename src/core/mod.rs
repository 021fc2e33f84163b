//! Core building blocks shared by every content-rail operation
//!
//! - **config**: rail.toml parsing and validation
//! - **context**: session store and the typed workflow context
//! - **error**: error types with contextual help messages and exit codes
//! - **plan**: reviewable, content-hashed operation plans

pub mod config;
pub mod context;
pub mod error;
pub mod plan;
