//! The sequential step engine.
//!
//! For each step, in form order: resolve the [L, R] bounds from anchors
//! or paddings, cut the signal fragment, run the step's tracks in
//! parallel to gather candidate times, and commit the median candidate
//! as the placed time of the target point. After all points are placed,
//! the evaluator computes parameters and condition verdicts.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, warn};

use sigform_core::form::{Form, PointId, Step, Track};
use sigform_core::registry::Registry;
use sigform_core::signal::Signal;
use sigform_core::validation;

use crate::cancel::CancelToken;
use crate::evaluator;
use crate::report::{ExecutionReport, Failure, Outcome};

/// Options for one execution.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cancel: CancelToken,
    /// Wall-clock budget per step. `None` means no deadline.
    pub step_deadline: Option<Duration>,
}

/// Runs a form on a signal and produces an execution report.
///
/// Validation always runs first; an invalid form never executes.
pub fn run_form(
    registry: &Registry,
    form: &Form,
    signal: &Signal,
    options: &RunOptions,
) -> ExecutionReport {
    if let Err(violations) = validation::validate(form) {
        return ExecutionReport::failed(Failure::Validation { violations }, BTreeMap::new());
    }

    let mut placed: BTreeMap<PointId, f64> = BTreeMap::new();

    for (index, step) in form.steps.iter().enumerate() {
        let ordinal = index + 1;

        if options.cancel.is_cancelled() {
            return ExecutionReport::failed(
                Failure::Cancelled {
                    last_completed: ordinal - 1,
                },
                named_points(form, &placed),
            );
        }

        match place_step(registry, form, signal, step, ordinal, &placed, options) {
            Ok(time) => {
                debug!(ordinal, point = %point_name(form, step.target), time, "point placed");
                placed.insert(step.target, time);
            }
            Err(failure) => {
                return ExecutionReport::failed(failure, named_points(form, &placed));
            }
        }
    }

    let placed_points = named_points(form, &placed);
    match evaluator::evaluate(registry, form, &placed) {
        Ok(output) => ExecutionReport {
            placed_points,
            parameters: output.parameters,
            verdicts: output.verdicts,
            condition_errors: output.condition_errors,
            outcome: Outcome::Ok,
        },
        Err(failure) => ExecutionReport::failed(failure, placed_points),
    }
}

/// Executes one step and returns the placed time of its target.
fn place_step(
    registry: &Registry,
    form: &Form,
    signal: &Signal,
    step: &Step,
    ordinal: usize,
    placed: &BTreeMap<PointId, f64>,
    options: &RunOptions,
) -> Result<f64, Failure> {
    let deadline = options.step_deadline.map(|budget| Instant::now() + budget);

    // Resolve bounds. Anchors are guaranteed placed by validation.
    let left = match resolve_anchor(step.target, step.left.anchor, placed)? {
        Some(time) => time,
        None => signal.start_time() + step.left.padding.unwrap_or(0.0),
    };
    let right = match resolve_anchor(step.target, step.right.anchor, placed)? {
        Some(time) => time,
        None => signal.end_time() - step.right.padding.unwrap_or(0.0),
    };
    if left >= right {
        return Err(Failure::EmptyInterval {
            ordinal,
            point: point_name(form, step.target),
            left,
            right,
        });
    }

    let fragment = signal.fragment(left, right).map_err(|e| Failure::Internal {
        message: format!("step {ordinal}: {e}"),
    })?;

    // Tracks are independent; run them in parallel and join before
    // aggregating. A failed track only degrades the step.
    let outcomes: Vec<Result<Vec<f64>, String>> = step
        .tracks
        .par_iter()
        .map(|track| {
            if options.cancel.is_cancelled() {
                return Ok(Vec::new());
            }
            run_track(registry, track, &fragment)
        })
        .collect();

    if options.cancel.is_cancelled() {
        return Err(Failure::Cancelled {
            last_completed: ordinal - 1,
        });
    }
    if let Some(deadline) = deadline {
        if Instant::now() > deadline {
            return Err(Failure::Timeout { ordinal });
        }
    }

    let mut candidates: Vec<f64> = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(times) => candidates.extend(times),
            Err(message) => {
                warn!(ordinal, track = index + 1, error = %message, "track failed, degrading step");
            }
        }
    }
    candidates.retain(|&t| t >= left && t <= right);
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();

    if candidates.is_empty() {
        return Err(Failure::NoCandidate {
            ordinal,
            point: point_name(form, step.target),
        });
    }
    Ok(median(&candidates))
}

/// Runs one track: the modifier pipeline, then every selector over the
/// pipeline output. Candidate sets of the selectors are unioned.
fn run_track(registry: &Registry, track: &Track, fragment: &Signal) -> Result<Vec<f64>, String> {
    let mut current = fragment.clone();
    for object in &track.modifiers {
        let modifier = registry
            .modifier(object)
            .map_err(|e| format!("{}: {e}", object.label()))?;
        let output = modifier
            .apply(&current)
            .map_err(|e| format!("{}: {e}", object.label()))?;
        if output.len() != current.len() || output.frequency() != current.frequency() {
            return Err(format!(
                "{}: modifier changed signal shape ({} -> {} samples)",
                object.label(),
                current.len(),
                output.len()
            ));
        }
        current = output;
    }

    let mut candidates = Vec::new();
    for object in &track.selectors {
        let selector = registry
            .selector(object)
            .map_err(|e| format!("{}: {e}", object.label()))?;
        let times = selector
            .select(&current)
            .map_err(|e| format!("{}: {e}", object.label()))?;
        candidates.extend(times);
    }
    Ok(candidates)
}

/// Placed time of the anchor, if the bound is an anchor.
fn resolve_anchor(
    target: PointId,
    anchor: Option<PointId>,
    placed: &BTreeMap<PointId, f64>,
) -> Result<Option<f64>, Failure> {
    match anchor {
        None => Ok(None),
        Some(point) => match placed.get(&point) {
            Some(&time) => Ok(Some(time)),
            None => Err(Failure::Internal {
                message: format!("anchor {point} of step targeting {target} is not placed"),
            }),
        },
    }
}

/// Median of a sorted candidate list; mean of the two central values
/// for even counts.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn point_name(form: &Form, id: PointId) -> String {
    form.point(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn named_points(form: &Form, placed: &BTreeMap<PointId, f64>) -> BTreeMap<String, f64> {
    placed
        .iter()
        .map(|(&id, &time)| (point_name(form, id), time))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[0.4]), 0.4);
        assert_eq!(median(&[0.1, 0.2, 0.9]), 0.2);
        assert_eq!(median(&[0.1, 0.3, 0.5, 0.9]), 0.4);
    }
}
