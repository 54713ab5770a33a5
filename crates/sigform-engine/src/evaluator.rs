//! Parameter and condition evaluation.
//!
//! Calculators run in topological order of their dependency graph
//! (writer before reader), with ties broken by ascending object id so
//! re-runs are reproducible. The first calculator failure aborts
//! evaluation. Conditions run afterwards, independently; a failing
//! condition is recorded and never halts the others.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use sigform_core::form::{Form, ObjectId, ParamId, PointId, PrimitiveObject};
use sigform_core::registry::{Registry, ValueMap};

use crate::report::Failure;

pub(crate) struct EvalOutput {
    pub parameters: BTreeMap<String, f64>,
    pub verdicts: BTreeMap<String, bool>,
    pub condition_errors: BTreeMap<String, String>,
}

pub(crate) fn evaluate(
    registry: &Registry,
    form: &Form,
    placed: &BTreeMap<PointId, f64>,
) -> Result<EvalOutput, Failure> {
    let mut values: BTreeMap<ParamId, f64> = BTreeMap::new();

    for calculator in topological_order(form)? {
        run_calculator(registry, form, calculator, placed, &mut values)?;
    }

    let mut verdicts = BTreeMap::new();
    let mut condition_errors = BTreeMap::new();
    for condition in &form.conditions {
        let label = condition.label();
        match run_condition(registry, condition, &values) {
            Ok(verdict) => {
                verdicts.insert(label, verdict);
            }
            Err(message) => {
                warn!(object = %label, error = %message, "condition failed, recording failing verdict");
                verdicts.insert(label.clone(), false);
                condition_errors.insert(label, message);
            }
        }
    }

    let parameters = values
        .iter()
        .filter_map(|(&id, &value)| form.parameter(id).map(|p| (p.name.clone(), value)))
        .collect();

    Ok(EvalOutput {
        parameters,
        verdicts,
        condition_errors,
    })
}

fn run_calculator(
    registry: &Registry,
    form: &Form,
    object: &PrimitiveObject,
    placed: &BTreeMap<PointId, f64>,
    values: &mut BTreeMap<ParamId, f64>,
) -> Result<(), Failure> {
    let fail = |message: String| Failure::Calculator {
        object: object.id,
        class: object.class.clone(),
        message,
    };

    let calculator = registry.calculator(object).map_err(|e| Failure::Instantiate {
        object: object.id,
        class: object.class.clone(),
        message: e.to_string(),
    })?;

    let mut params = ValueMap::new();
    for (slot, param) in &object.input_params {
        let value = values
            .get(param)
            .copied()
            .ok_or_else(|| fail(format!("input slot {slot:?}: parameter {param} has no value")))?;
        params.insert(slot.clone(), value);
    }
    let mut points = ValueMap::new();
    for (slot, point) in &object.input_points {
        let time = placed
            .get(point)
            .copied()
            .ok_or_else(|| fail(format!("input slot {slot:?}: point {point} is not placed")))?;
        points.insert(slot.clone(), time);
    }

    let outputs = calculator
        .compute(&params, &points)
        .map_err(|e| fail(e.to_string()))?;

    for (slot, param) in &object.output_params {
        let value = *outputs
            .get(slot)
            .ok_or_else(|| fail(format!("output slot {slot:?} was not produced")))?;
        if !value.is_finite() {
            return Err(fail(format!("output slot {slot:?} is not finite ({value})")));
        }
        values.insert(*param, value);
    }
    for slot in outputs.keys() {
        if !object.output_params.contains_key(slot) {
            warn!(object = %object.label(), slot = %slot, "unbound output ignored");
        }
    }
    Ok(())
}

fn run_condition(
    registry: &Registry,
    object: &PrimitiveObject,
    values: &BTreeMap<ParamId, f64>,
) -> Result<bool, String> {
    let condition = registry
        .condition(object)
        .map_err(|e| e.to_string())?;
    let mut params = ValueMap::new();
    for (slot, param) in &object.input_params {
        let value = values
            .get(param)
            .copied()
            .ok_or_else(|| format!("input slot {slot:?}: parameter {param} has no value"))?;
        params.insert(slot.clone(), value);
    }
    condition.check(&params).map_err(|e| e.to_string())
}

/// Kahn's algorithm with an ordered ready set: among calculators whose
/// dependencies are satisfied, the smallest object id runs first.
fn topological_order(form: &Form) -> Result<Vec<&PrimitiveObject>, Failure> {
    let by_id: BTreeMap<ObjectId, &PrimitiveObject> =
        form.calculators.iter().map(|c| (c.id, c)).collect();

    let mut writes: BTreeMap<ParamId, ObjectId> = BTreeMap::new();
    for calculator in &form.calculators {
        for param in calculator.output_params.values() {
            writes.entry(*param).or_insert(calculator.id);
        }
    }

    let mut in_degree: BTreeMap<ObjectId, usize> = BTreeMap::new();
    let mut readers: BTreeMap<ObjectId, BTreeSet<ObjectId>> = BTreeMap::new();
    for calculator in &form.calculators {
        in_degree.entry(calculator.id).or_default();
        for param in calculator.input_params.values() {
            if let Some(&writer) = writes.get(param) {
                if writer != calculator.id
                    && readers.entry(writer).or_default().insert(calculator.id)
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
    let mut order = Vec::with_capacity(form.calculators.len());
    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        if let Some(&calculator) = by_id.get(&next) {
            order.push(calculator);
        }
        if let Some(dependents) = readers.get(&next) {
            for dependent in dependents.clone() {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }
    }

    if order.len() != form.calculators.len() {
        // The validator rejects cyclic forms before execution.
        return Err(Failure::Internal {
            message: "calculator dependency graph is cyclic".to_owned(),
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigform_core::form::Form;

    /// Chain: Scale(a -> b), Scale(b -> c). Order must follow the data,
    /// not insertion order.
    #[test]
    fn topological_order_follows_dependencies() {
        let mut form = Form::new("chain");
        let a = form.add_parameter("a", "", None);
        let b = form.add_parameter("b", "", None);
        let c = form.add_parameter("c", "", None);

        let second = form
            .new_object("Scale")
            .with_input_param("value", b)
            .with_output_param("scaled", c);
        let first = form
            .new_object("Scale")
            .with_input_param("value", a)
            .with_output_param("scaled", b);
        // Insert the dependent calculator first on purpose.
        form.add_calculator(second.clone());
        form.add_calculator(first.clone());

        let order: Vec<ObjectId> = topological_order(&form)
            .unwrap()
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(order, vec![first.id, second.id]);
    }

    /// Independent calculators run in ascending object id order.
    #[test]
    fn ties_break_by_object_id() {
        let mut form = Form::new("ties");
        let a = form.add_parameter("a", "", None);
        let b = form.add_parameter("b", "", None);
        let one = form.new_object("Scale").with_output_param("scaled", a);
        let two = form.new_object("Scale").with_output_param("scaled", b);
        form.add_calculator(two.clone());
        form.add_calculator(one.clone());

        let order: Vec<ObjectId> = topological_order(&form)
            .unwrap()
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(order, vec![one.id, two.id]);
    }
}
