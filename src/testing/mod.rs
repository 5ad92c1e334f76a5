//! Test schema execution.
//!
//! # Structure
//!
//! - `callback`: sandboxed Rhai engine for executable params
//! - `evaluator`: depth-first, fail-fast walk over a schema tree
//! - `outcome`: evaluation result types

pub mod callback;
pub mod evaluator;
pub mod outcome;

pub use evaluator::{Evaluator, values_equal};
pub use outcome::{Outcome, RunStatus};
