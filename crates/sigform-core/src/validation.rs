//! Form validation rules.
//!
//! [`validate`] is a pure, total function from a form to a validation
//! outcome. It enumerates every violation instead of stopping at the
//! first, so editors can show a complete report. Execution always runs
//! this pass first and refuses invalid forms.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::form::{Form, ObjectId, ParamId, PointId};

/// Which positional constraint of a step is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// A reason the form is not runnable. Step ordinals are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Violation {
    #[error("form has {steps} steps for {points} points")]
    StepCountMismatch { steps: usize, points: usize },

    #[error("point {point} is targeted by more than one step")]
    DuplicateTarget { point: PointId },

    #[error("point {point} is not targeted by any step")]
    UntargetedPoint { point: PointId },

    #[error("step {ordinal}: {side} constraint must set exactly one of anchor/padding")]
    InvalidStepConstraint { ordinal: usize, side: Side },

    #[error("step {ordinal}: anchor point {anchor} is not placed by an earlier step")]
    AnchorNotEarlier { ordinal: usize, anchor: PointId },

    #[error("step {ordinal} has no tracks")]
    EmptyTracks { ordinal: usize },

    #[error("step {ordinal}, track {track}: no selectors")]
    EmptyTrack { ordinal: usize, track: usize },

    #[error("object {object}: slot {slot:?} is not bound to a declared point/parameter")]
    UnboundSlot { object: ObjectId, slot: String },

    #[error("calculator dependency cycle involving objects {objects:?}")]
    CyclicCalculatorDependency { objects: Vec<ObjectId> },

    #[error("parameter {parameter} is written by more than one output binding")]
    DuplicateOutputBinding { parameter: ParamId },

    #[error("form declares no parameters")]
    NoParameters,
}

/// Validates a form. Returns every violation found.
pub fn validate(form: &Form) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    let point_ids: BTreeSet<PointId> = form.points.iter().map(|p| p.id).collect();
    let param_ids: BTreeSet<ParamId> = form.parameters.iter().map(|p| p.id).collect();

    if form.parameters.is_empty() {
        violations.push(Violation::NoParameters);
    }

    // Step/point correspondence.
    if form.steps.len() != form.points.len() {
        violations.push(Violation::StepCountMismatch {
            steps: form.steps.len(),
            points: form.points.len(),
        });
    }
    let mut target_counts: BTreeMap<PointId, usize> = BTreeMap::new();
    for step in &form.steps {
        *target_counts.entry(step.target).or_default() += 1;
    }
    for (&point, &count) in &target_counts {
        if count > 1 {
            violations.push(Violation::DuplicateTarget { point });
        }
    }
    for point in &form.points {
        if !target_counts.contains_key(&point.id) {
            violations.push(Violation::UntargetedPoint { point: point.id });
        }
    }

    // Per-step structure.
    let mut placed_so_far: BTreeSet<PointId> = BTreeSet::new();
    for (index, step) in form.steps.iter().enumerate() {
        let ordinal = index + 1;

        for (side, bound) in [(Side::Left, &step.left), (Side::Right, &step.right)] {
            if !bound.is_well_formed() {
                violations.push(Violation::InvalidStepConstraint { ordinal, side });
            }
            if let Some(anchor) = bound.anchor {
                if !placed_so_far.contains(&anchor) {
                    violations.push(Violation::AnchorNotEarlier { ordinal, anchor });
                }
            }
        }

        if step.tracks.is_empty() {
            violations.push(Violation::EmptyTracks { ordinal });
        }
        for (t, track) in step.tracks.iter().enumerate() {
            if track.selectors.is_empty() {
                violations.push(Violation::EmptyTrack {
                    ordinal,
                    track: t + 1,
                });
            }
        }

        placed_so_far.insert(step.target);
    }

    // Slot bindings must resolve to declared points/parameters.
    for object in form.objects() {
        for (slot, param) in &object.input_params {
            if !param_ids.contains(param) {
                violations.push(Violation::UnboundSlot {
                    object: object.id,
                    slot: slot.clone(),
                });
            }
        }
        for (slot, point) in &object.input_points {
            if !point_ids.contains(point) {
                violations.push(Violation::UnboundSlot {
                    object: object.id,
                    slot: slot.clone(),
                });
            }
        }
        for (slot, param) in &object.output_params {
            if !param_ids.contains(param) {
                violations.push(Violation::UnboundSlot {
                    object: object.id,
                    slot: slot.clone(),
                });
            }
        }
    }

    // Output bindings must be distinct across all calculators.
    let mut writers: BTreeMap<ParamId, usize> = BTreeMap::new();
    for calculator in &form.calculators {
        for param in calculator.output_params.values() {
            *writers.entry(*param).or_default() += 1;
        }
    }
    for (&parameter, &count) in &writers {
        if count > 1 {
            violations.push(Violation::DuplicateOutputBinding { parameter });
        }
    }

    // The calculator dependency graph must be acyclic.
    if let Some(objects) = find_cycle(form) {
        violations.push(Violation::CyclicCalculatorDependency { objects });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Kahn's algorithm over the calculator graph. Returns the objects left
/// on a cycle, or `None` when the graph is acyclic.
fn find_cycle(form: &Form) -> Option<Vec<ObjectId>> {
    // writer -> readers, via shared parameters.
    let mut writes: BTreeMap<ParamId, ObjectId> = BTreeMap::new();
    for calculator in &form.calculators {
        for param in calculator.output_params.values() {
            // Duplicate writers are reported separately; first one wins here.
            writes.entry(*param).or_insert(calculator.id);
        }
    }

    let mut in_degree: BTreeMap<ObjectId, usize> = BTreeMap::new();
    let mut edges: BTreeMap<ObjectId, BTreeSet<ObjectId>> = BTreeMap::new();
    for calculator in &form.calculators {
        in_degree.entry(calculator.id).or_default();
        for param in calculator.input_params.values() {
            if let Some(&writer) = writes.get(param) {
                if writer != calculator.id
                    && edges.entry(writer).or_default().insert(calculator.id)
                {
                    *in_degree.entry(calculator.id).or_default() += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<ObjectId> = in_degree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut remaining = in_degree.len();
    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        remaining -= 1;
        if let Some(readers) = edges.get(&next) {
            for reader in readers.clone() {
                if let Some(degree) = in_degree.get_mut(&reader) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(reader);
                    }
                }
            }
        }
    }

    if remaining == 0 {
        None
    } else {
        Some(
            in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(id, _)| id)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Bound, Step, Track};
    use pretty_assertions::assert_eq;

    fn selector_track(form: &mut Form, class: &str) -> Track {
        Track {
            modifiers: vec![],
            selectors: vec![form.new_object(class)],
        }
    }

    /// One point, one parameter, one padded step with a GlobalMax track.
    fn minimal_form() -> Form {
        let mut form = Form::new("minimal");
        let point = form.add_point("P", "");
        form.add_parameter("x", "", Some(1.0));
        let track = selector_track(&mut form, "GlobalMax");
        form.push_step(Step {
            target: point,
            left: Bound::padding(0.0),
            right: Bound::padding(0.0),
            tracks: vec![track],
        });
        form
    }

    #[test]
    fn minimal_form_is_runnable() {
        assert_eq!(validate(&minimal_form()), Ok(()));
    }

    #[test]
    fn validation_is_pure() {
        let form = minimal_form();
        assert_eq!(validate(&form), validate(&form.clone()));
    }

    #[test]
    fn missing_step_reported_twice() {
        let mut form = minimal_form();
        let extra = form.add_point("Q", "");
        let result = validate(&form).unwrap_err();
        assert!(result.contains(&Violation::StepCountMismatch { steps: 1, points: 2 }));
        assert!(result.contains(&Violation::UntargetedPoint { point: extra }));
    }

    #[test]
    fn duplicate_target_reported() {
        let mut form = minimal_form();
        form.add_point("Q", "");
        let target = form.steps[0].target;
        let step = form.steps[0].clone();
        form.push_step(step);
        let result = validate(&form).unwrap_err();
        assert!(result.contains(&Violation::DuplicateTarget { point: target }));
    }

    #[test]
    fn both_anchor_and_padding_rejected() {
        let mut form = minimal_form();
        form.steps[0].left = Bound {
            anchor: Some(form.steps[0].target),
            padding: Some(0.0),
        };
        let result = validate(&form).unwrap_err();
        assert!(result.contains(&Violation::InvalidStepConstraint {
            ordinal: 1,
            side: Side::Left
        }));
    }

    #[test]
    fn neither_anchor_nor_padding_rejected() {
        let mut form = minimal_form();
        form.steps[0].right = Bound::default();
        let result = validate(&form).unwrap_err();
        assert!(result.contains(&Violation::InvalidStepConstraint {
            ordinal: 1,
            side: Side::Right
        }));
    }

    #[test]
    fn anchor_must_be_placed_earlier() {
        let mut form = minimal_form();
        let later = form.add_point("Q", "");
        // Step 1 anchors on the point placed by step 2.
        form.steps[0].left = Bound::anchor(later);
        let track = selector_track(&mut form, "GlobalMin");
        form.push_step(Step {
            target: later,
            left: Bound::padding(0.0),
            right: Bound::padding(0.0),
            tracks: vec![track],
        });
        let result = validate(&form).unwrap_err();
        assert_eq!(
            result,
            vec![Violation::AnchorNotEarlier {
                ordinal: 1,
                anchor: later
            }]
        );
    }

    #[test]
    fn empty_tracks_and_empty_track() {
        let mut form = minimal_form();
        form.steps[0].tracks.clear();
        assert!(validate(&form)
            .unwrap_err()
            .contains(&Violation::EmptyTracks { ordinal: 1 }));

        form.steps[0].tracks.push(Track::default());
        assert!(validate(&form).unwrap_err().contains(&Violation::EmptyTrack {
            ordinal: 1,
            track: 1
        }));
    }

    #[test]
    fn unbound_slots_reported() {
        let mut form = minimal_form();
        let object = form
            .new_object("Interval")
            .with_input_point("from", PointId(99))
            .with_input_point("to", form.steps[0].target)
            .with_output_param("interval", ParamId(99));
        let id = object.id;
        form.add_calculator(object);
        let result = validate(&form).unwrap_err();
        assert!(result.contains(&Violation::UnboundSlot {
            object: id,
            slot: "from".into()
        }));
        assert!(result.contains(&Violation::UnboundSlot {
            object: id,
            slot: "interval".into()
        }));
    }

    #[test]
    fn calculator_cycle_detected() {
        let mut form = minimal_form();
        let x = form.parameters[0].id;
        let y = form.add_parameter("y", "", None);
        // A writes x reading y; B writes y reading x.
        let a = form
            .new_object("Scale")
            .with_input_param("value", y)
            .with_output_param("scaled", x);
        let b = form
            .new_object("Scale")
            .with_input_param("value", x)
            .with_output_param("scaled", y);
        let (a_id, b_id) = (a.id, b.id);
        form.add_calculator(a);
        form.add_calculator(b);
        let result = validate(&form).unwrap_err();
        assert_eq!(
            result,
            vec![Violation::CyclicCalculatorDependency {
                objects: vec![a_id, b_id]
            }]
        );
    }

    #[test]
    fn duplicate_output_binding_detected() {
        let mut form = minimal_form();
        let x = form.parameters[0].id;
        let point = form.steps[0].target;
        for _ in 0..2 {
            let calc = form
                .new_object("Interval")
                .with_input_point("from", point)
                .with_input_point("to", point)
                .with_output_param("interval", x);
            form.add_calculator(calc);
        }
        let result = validate(&form).unwrap_err();
        assert_eq!(
            result,
            vec![Violation::DuplicateOutputBinding { parameter: x }]
        );
    }

    #[test]
    fn no_parameters_rejected() {
        let mut form = minimal_form();
        form.parameters.clear();
        assert_eq!(validate(&form), Err(vec![Violation::NoParameters]));
    }

    #[test]
    fn violations_from_distinct_rules_accumulate() {
        let mut form = minimal_form();
        form.parameters.clear();
        form.steps[0].left = Bound::default();
        form.steps[0].tracks.clear();
        let result = validate(&form).unwrap_err();
        assert_eq!(result.len(), 3);
    }
}
