//! Pathname (glob) expansion engine used by the sync filesystem adapter.

pub mod glob_expander;
pub mod glob_helpers;

pub use glob_expander::{GlobExpander, GlobOptions};
