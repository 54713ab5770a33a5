//! Builtin primitive catalog.
//!
//! A small set of modifiers, selectors, calculators, and conditions
//! that ships with the workbench. User plug-ins register alongside
//! these through the same [`Registry::register`] protocol.

use crate::coerce::{ArgSpec, ArgType, ArgValue};
use crate::registry::{
    ArgMap, ClassDescriptor, Constructor, HardCondition, ParamCalculator, PointSelector,
    PrimitiveError, Registry, RegistryError, SignalModifier, ValueMap,
};
use crate::signal::Signal;

fn real_arg(args: &ArgMap, name: &str) -> Result<f64, PrimitiveError> {
    args.get(name)
        .and_then(ArgValue::as_real)
        .ok_or_else(|| PrimitiveError::failed(format!("argument {name:?} is not a real")))
}

fn int_arg(args: &ArgMap, name: &str) -> Result<i64, PrimitiveError> {
    args.get(name)
        .and_then(ArgValue::as_int)
        .ok_or_else(|| PrimitiveError::failed(format!("argument {name:?} is not an int")))
}

fn input(params: &ValueMap, slot: &str) -> Result<f64, PrimitiveError> {
    params
        .get(slot)
        .copied()
        .ok_or_else(|| PrimitiveError::MissingInput(slot.to_owned()))
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Gain {
    factor: f64,
}

impl SignalModifier for Gain {
    fn apply(&self, signal: &Signal) -> Result<Signal, PrimitiveError> {
        let samples = signal.samples().iter().map(|s| s * self.factor).collect();
        signal
            .with_samples(samples)
            .map_err(|e| PrimitiveError::failed(e.to_string()))
    }
}

#[derive(Debug)]
struct Invert;

impl SignalModifier for Invert {
    fn apply(&self, signal: &Signal) -> Result<Signal, PrimitiveError> {
        let samples = signal.samples().iter().map(|s| -s).collect();
        signal
            .with_samples(samples)
            .map_err(|e| PrimitiveError::failed(e.to_string()))
    }
}

/// Centered moving average. Windows are clipped at the edges so the
/// output keeps the input length.
#[derive(Debug)]
struct MovingAverage {
    window: usize,
}

impl SignalModifier for MovingAverage {
    fn apply(&self, signal: &Signal) -> Result<Signal, PrimitiveError> {
        let input = signal.samples();
        let half = self.window / 2;
        let mut samples = Vec::with_capacity(input.len());
        for i in 0..input.len() {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(input.len());
            let sum: f64 = input[lo..hi].iter().sum();
            samples.push(sum / (hi - lo) as f64);
        }
        signal
            .with_samples(samples)
            .map_err(|e| PrimitiveError::failed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Extreme {
    Max,
    Min,
}

/// Single candidate at the global extreme of the fragment.
#[derive(Debug)]
struct GlobalExtreme(Extreme);

impl PointSelector for GlobalExtreme {
    fn select(&self, signal: &Signal) -> Result<Vec<f64>, PrimitiveError> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &sample) in signal.samples().iter().enumerate() {
            let better = match (&best, &self.0) {
                (None, _) => true,
                (Some((_, b)), Extreme::Max) => sample > *b,
                (Some((_, b)), Extreme::Min) => sample < *b,
            };
            if better {
                best = Some((i, sample));
            }
        }
        Ok(best.map(|(i, _)| signal.time_at(i)).into_iter().collect())
    }
}

/// Times where the signal rises through a level.
#[derive(Debug)]
struct RisingCrossings {
    level: f64,
}

impl PointSelector for RisingCrossings {
    fn select(&self, signal: &Signal) -> Result<Vec<f64>, PrimitiveError> {
        let samples = signal.samples();
        let mut times = Vec::new();
        for i in 1..samples.len() {
            if samples[i - 1] < self.level && samples[i] >= self.level {
                times.push(signal.time_at(i));
            }
        }
        Ok(times)
    }
}

// ---------------------------------------------------------------------------
// Calculators
// ---------------------------------------------------------------------------

/// Time between two placed points: `interval = to - from`.
struct Interval;

impl ParamCalculator for Interval {
    fn compute(&self, _params: &ValueMap, points: &ValueMap) -> Result<ValueMap, PrimitiveError> {
        let from = input(points, "from")?;
        let to = input(points, "to")?;
        Ok(ValueMap::from([("interval".to_owned(), to - from)]))
    }
}

/// Multiplies an input parameter by a constant factor.
struct Scale {
    factor: f64,
}

impl ParamCalculator for Scale {
    fn compute(&self, params: &ValueMap, _points: &ValueMap) -> Result<ValueMap, PrimitiveError> {
        let value = input(params, "value")?;
        Ok(ValueMap::from([("scaled".to_owned(), value * self.factor)]))
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

struct InRange {
    min: f64,
    max: f64,
}

impl HardCondition for InRange {
    fn check(&self, params: &ValueMap) -> Result<bool, PrimitiveError> {
        let value = input(params, "value")?;
        Ok(self.min <= value && value <= self.max)
    }
}

struct Positive;

impl HardCondition for Positive {
    fn check(&self, params: &ValueMap) -> Result<bool, PrimitiveError> {
        Ok(input(params, "value")? > 0.0)
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// The descriptors of the builtin catalog.
pub fn descriptors() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::new(
            "Gain",
            Constructor::Modifier(Box::new(|args| {
                Ok(Box::new(Gain {
                    factor: real_arg(args, "factor")?,
                }))
            })),
        )
        .with_comment("Multiplies every sample by a constant factor")
        .with_argument(ArgSpec::new("factor", ArgType::Real).with_default("1.0")),
        ClassDescriptor::new(
            "Invert",
            Constructor::Modifier(Box::new(|_| Ok(Box::new(Invert)))),
        )
        .with_comment("Negates the signal"),
        ClassDescriptor::new(
            "MovingAverage",
            Constructor::Modifier(Box::new(|args| {
                let window = int_arg(args, "window")?;
                if window < 1 {
                    return Err(PrimitiveError::failed("window must be at least 1"));
                }
                Ok(Box::new(MovingAverage {
                    window: window as usize,
                }))
            })),
        )
        .with_comment("Centered moving average, edges clipped")
        .with_argument(ArgSpec::new("window", ArgType::Int).with_default("5")),
        ClassDescriptor::new(
            "GlobalMax",
            Constructor::Selector(Box::new(|_| Ok(Box::new(GlobalExtreme(Extreme::Max))))),
        )
        .with_comment("Time of the largest sample"),
        ClassDescriptor::new(
            "GlobalMin",
            Constructor::Selector(Box::new(|_| Ok(Box::new(GlobalExtreme(Extreme::Min))))),
        )
        .with_comment("Time of the smallest sample"),
        ClassDescriptor::new(
            "RisingCrossings",
            Constructor::Selector(Box::new(|args| {
                Ok(Box::new(RisingCrossings {
                    level: real_arg(args, "level")?,
                }))
            })),
        )
        .with_comment("Times where the signal rises through a level")
        .with_argument(ArgSpec::new("level", ArgType::Real).with_default("0.0")),
        ClassDescriptor::new(
            "Interval",
            Constructor::Calculator(Box::new(|_| Ok(Box::new(Interval)))),
        )
        .with_comment("Time between two placed points")
        .with_input_point("from")
        .with_input_point("to")
        .with_output_param("interval"),
        ClassDescriptor::new(
            "Scale",
            Constructor::Calculator(Box::new(|args| {
                Ok(Box::new(Scale {
                    factor: real_arg(args, "factor")?,
                }))
            })),
        )
        .with_comment("Multiplies an input parameter by a constant")
        .with_argument(ArgSpec::new("factor", ArgType::Real).with_default("1.0"))
        .with_input_param("value")
        .with_output_param("scaled"),
        ClassDescriptor::new(
            "InRange",
            Constructor::Condition(Box::new(|args| {
                Ok(Box::new(InRange {
                    min: real_arg(args, "min")?,
                    max: real_arg(args, "max")?,
                }))
            })),
        )
        .with_comment("Passes when min <= value <= max")
        .with_argument(ArgSpec::new("min", ArgType::Real))
        .with_argument(ArgSpec::new("max", ArgType::Real))
        .with_input_param("value"),
        ClassDescriptor::new(
            "Positive",
            Constructor::Condition(Box::new(|_| Ok(Box::new(Positive)))),
        )
        .with_comment("Passes when value > 0")
        .with_input_param("value"),
    ]
}

/// Registers the builtin catalog into an existing registry.
pub fn install(registry: &mut Registry) -> Result<(), RegistryError> {
    for descriptor in descriptors() {
        registry.register(descriptor)?;
    }
    Ok(())
}

/// A fresh registry holding only the builtin catalog.
pub fn standard_registry() -> Registry {
    let mut registry = Registry::new();
    if let Err(err) = install(&mut registry) {
        // Builtin names are distinct literals; a conflict is a bug.
        panic!("builtin catalog failed to register: {err}");
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{ObjectId, PrimitiveObject};
    use pretty_assertions::assert_eq;

    fn object(class: &str) -> PrimitiveObject {
        PrimitiveObject::new(ObjectId(1), class)
    }

    fn sine(hz: u32) -> Signal {
        let n = hz as usize + 1;
        let samples = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / hz as f64).sin())
            .collect();
        Signal::from_samples(samples, hz).unwrap()
    }

    #[test]
    fn global_max_finds_sine_peak() {
        let registry = standard_registry();
        let selector = registry.selector(&object("GlobalMax")).unwrap();
        let times = selector.select(&sine(500)).unwrap();
        assert_eq!(times, vec![0.25]);
    }

    #[test]
    fn global_min_finds_sine_trough() {
        let registry = standard_registry();
        let selector = registry.selector(&object("GlobalMin")).unwrap();
        let times = selector.select(&sine(500)).unwrap();
        assert_eq!(times, vec![0.75]);
    }

    #[test]
    fn selectors_on_empty_fragment_emit_nothing() {
        let registry = standard_registry();
        let selector = registry.selector(&object("GlobalMax")).unwrap();
        let empty = sine(100).fragment(0.255, 0.256).unwrap();
        assert!(empty.is_empty());
        assert_eq!(selector.select(&empty).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn gain_preserves_length_and_axis() {
        let registry = standard_registry();
        let modifier = registry
            .modifier(&object("Gain").with_argument("factor", "2.0"))
            .unwrap();
        let signal = sine(100);
        let out = modifier.apply(&signal).unwrap();
        assert_eq!(out.len(), signal.len());
        assert_eq!(out.samples()[25], signal.samples()[25] * 2.0);
    }

    #[test]
    fn invert_turns_max_into_min() {
        let registry = standard_registry();
        let modifier = registry.modifier(&object("Invert")).unwrap();
        let selector = registry.selector(&object("GlobalMax")).unwrap();
        let inverted = modifier.apply(&sine(500)).unwrap();
        assert_eq!(selector.select(&inverted).unwrap(), vec![0.75]);
    }

    #[test]
    fn moving_average_rejects_bad_window() {
        let registry = standard_registry();
        let err = registry
            .modifier(&object("MovingAverage").with_argument("window", "0"))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::registry::InstantiateError::Construct(_)
        ));
    }

    #[test]
    fn rising_crossings() {
        let registry = standard_registry();
        let selector = registry
            .selector(&object("RisingCrossings").with_argument("level", "0.5"))
            .unwrap();
        let signal =
            Signal::from_samples(vec![0.0, 0.2, 0.6, 0.8, 0.3, 0.7], 10).unwrap();
        assert_eq!(selector.select(&signal).unwrap(), vec![0.2, 0.5]);
    }

    #[test]
    fn interval_and_scale() {
        let registry = standard_registry();
        let interval = registry.calculator(&object("Interval")).unwrap();
        let points = ValueMap::from([("from".to_owned(), 0.25), ("to".to_owned(), 0.75)]);
        let out = interval.compute(&ValueMap::new(), &points).unwrap();
        assert_eq!(out["interval"], 0.5);

        let scale = registry
            .calculator(&object("Scale").with_argument("factor", "1000.0"))
            .unwrap();
        let params = ValueMap::from([("value".to_owned(), 0.5)]);
        let out = scale.compute(&params, &ValueMap::new()).unwrap();
        assert_eq!(out["scaled"], 500.0);
    }

    #[test]
    fn conditions() {
        let registry = standard_registry();
        let in_range = registry
            .condition(
                &object("InRange")
                    .with_argument("min", "0.2")
                    .with_argument("max", "0.6"),
            )
            .unwrap();
        assert!(in_range
            .check(&ValueMap::from([("value".to_owned(), 0.5)]))
            .unwrap());
        assert!(!in_range
            .check(&ValueMap::from([("value".to_owned(), 0.7)]))
            .unwrap());

        let positive = registry.condition(&object("Positive")).unwrap();
        let err = positive.check(&ValueMap::new()).unwrap_err();
        assert_eq!(err, PrimitiveError::MissingInput("value".into()));
    }
}
