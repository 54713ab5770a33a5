//! Execution outcome types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sigform_core::form::ObjectId;
use sigform_core::validation::Violation;

/// Why an execution stopped. Step ordinals are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The form failed validation; nothing was executed.
    #[error("form is not runnable ({} violations)", violations.len())]
    Validation { violations: Vec<Violation> },

    /// A step's bounds collapsed before any track ran.
    #[error("step {ordinal} ({point}): search interval [{left}, {right}] is empty")]
    EmptyInterval {
        ordinal: usize,
        point: String,
        left: f64,
        right: f64,
    },

    /// No track of the step produced a candidate inside the bounds.
    #[error("step {ordinal} ({point}): no candidate points")]
    NoCandidate { ordinal: usize, point: String },

    /// The per-step wall-clock deadline elapsed.
    #[error("step {ordinal} exceeded its deadline")]
    Timeout { ordinal: usize },

    /// The caller cancelled the execution.
    #[error("cancelled after step {last_completed}")]
    Cancelled { last_completed: usize },

    /// A primitive object could not be constructed.
    #[error("object {object} ({class}): {message}")]
    Instantiate {
        object: ObjectId,
        class: String,
        message: String,
    },

    /// A parameter calculator failed; evaluation stopped.
    #[error("calculator {object} ({class}): {message}")]
    Calculator {
        object: ObjectId,
        class: String,
        message: String,
    },

    /// An invariant the validator should have ruled out was violated.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// OK, or the first failure with the partial placements gathered before
/// it for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failed {
        failure: Failure,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        partial_points: BTreeMap<String, f64>,
    },
}

/// Aggregated output of one execution.
///
/// `placed_points` holds every declared point exactly when the outcome
/// is [`Outcome::Ok`]; on failure the partial placements live inside
/// the outcome instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub placed_points: BTreeMap<String, f64>,
    pub parameters: BTreeMap<String, f64>,
    /// Hard-condition verdicts keyed by object label.
    pub verdicts: BTreeMap<String, bool>,
    /// Error messages of conditions whose verdict is a recorded failure.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub condition_errors: BTreeMap<String, String>,
    pub outcome: Outcome,
}

impl ExecutionReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok)
    }

    /// The failure, if the execution did not finish cleanly.
    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Ok => None,
            Outcome::Failed { failure, .. } => Some(failure),
        }
    }

    pub(crate) fn failed(failure: Failure, partial_points: BTreeMap<String, f64>) -> Self {
        Self {
            placed_points: BTreeMap::new(),
            parameters: BTreeMap::new(),
            verdicts: BTreeMap::new(),
            condition_errors: BTreeMap::new(),
            outcome: Outcome::Failed {
                failure,
                partial_points,
            },
        }
    }
}
