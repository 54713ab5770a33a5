//! Execution engine for sigform annotation recipes.
//!
//! The engine takes a validated form and a signal, places every
//! declared point step by step, evaluates parameter calculators in
//! dependency order, checks hard conditions, and produces an
//! [`report::ExecutionReport`].

pub mod cancel;
mod engine;
mod evaluator;
pub mod report;

pub use cancel::CancelToken;
pub use engine::{RunOptions, run_form};
pub use report::{ExecutionReport, Failure, Outcome};
