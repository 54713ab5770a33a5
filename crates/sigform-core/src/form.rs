//! The form model: points, parameters, steps, tracks, and primitive
//! objects.
//!
//! A form is a pure in-memory data graph. Mutations never enforce the
//! global invariants; [`crate::validation::validate`] is the explicit
//! pass that decides whether a form is runnable. References between
//! parts of a form (step anchors, slot bindings) are identifier-based,
//! never pointers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Stable identifier of a point within a form.
    PointId
);
id_type!(
    /// Stable identifier of a parameter within a form.
    ParamId
);
id_type!(
    /// Stable identifier of a primitive object within a form.
    ObjectId
);

// ---------------------------------------------------------------------------
// Leaves
// ---------------------------------------------------------------------------

/// A declared landmark. The time coordinate only exists at execution
/// time; it is never part of the form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

/// A declared scalar slot filled in by calculators at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: ParamId,
    pub name: String,
    #[serde(default)]
    pub comment: String,
    /// Weight for downstream exemplar scoring. Persisted and passed
    /// through untouched; the executor never reads it.
    #[serde(default)]
    pub weight: Option<f64>,
}

/// One positional constraint of a step: an anchor to an already-placed
/// point, or a padding in seconds from the signal start/end.
///
/// The model stores both options so that editors can build a bound in
/// any order; the validator requires exactly one to be set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bound {
    #[serde(default)]
    pub anchor: Option<PointId>,
    #[serde(default)]
    pub padding: Option<f64>,
}

impl Bound {
    pub fn anchor(point: PointId) -> Self {
        Self {
            anchor: Some(point),
            padding: None,
        }
    }

    pub fn padding(seconds: f64) -> Self {
        Self {
            anchor: None,
            padding: Some(seconds),
        }
    }

    /// Exactly one of anchor / padding is set.
    pub fn is_well_formed(&self) -> bool {
        self.anchor.is_some() != self.padding.is_some()
    }
}

/// A concrete instance of a primitive class bound to a form.
///
/// Argument values are kept textual; the coercer is the single funnel
/// where text meets scalar. Slot maps bind declared slot names of the
/// class to the form's parameters and points by identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveObject {
    pub id: ObjectId,
    /// Name of the primitive class in the registry.
    pub class: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    #[serde(default)]
    pub input_params: BTreeMap<String, ParamId>,
    #[serde(default)]
    pub input_points: BTreeMap<String, PointId>,
    #[serde(default)]
    pub output_params: BTreeMap<String, ParamId>,
}

impl PrimitiveObject {
    pub fn new(id: ObjectId, class: impl Into<String>) -> Self {
        Self {
            id,
            class: class.into(),
            arguments: BTreeMap::new(),
            input_params: BTreeMap::new(),
            input_points: BTreeMap::new(),
            output_params: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_input_param(mut self, slot: impl Into<String>, param: ParamId) -> Self {
        self.input_params.insert(slot.into(), param);
        self
    }

    pub fn with_input_point(mut self, slot: impl Into<String>, point: PointId) -> Self {
        self.input_points.insert(slot.into(), point);
        self
    }

    pub fn with_output_param(mut self, slot: impl Into<String>, param: ParamId) -> Self {
        self.output_params.insert(slot.into(), param);
        self
    }

    /// Display label used in reports and diagnostics.
    pub fn label(&self) -> String {
        format!("{}#{}", self.class, self.id)
    }
}

/// A candidate generator: a modifier pipeline feeding one or more
/// selectors. Valid iff it has at least one selector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub modifiers: Vec<PrimitiveObject>,
    #[serde(default)]
    pub selectors: Vec<PrimitiveObject>,
}

/// One point-placement operation. Steps run in the order they appear in
/// [`Form::steps`]; persistence records that order as `number_in_form`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub target: PointId,
    pub left: Bound,
    pub right: Bound,
    pub tracks: Vec<Track>,
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// A named annotation recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    /// Database identifier, set once the form has been persisted.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub picture_path: String,
    #[serde(default)]
    pub dataset_path: String,

    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Parameter calculators, in stored order.
    #[serde(default)]
    pub calculators: Vec<PrimitiveObject>,
    /// Hard conditions, in stored order.
    #[serde(default)]
    pub conditions: Vec<PrimitiveObject>,

    // Local id allocators. Persisted forms carry database ids instead.
    #[serde(default)]
    next_point_id: i64,
    #[serde(default)]
    next_param_id: i64,
    #[serde(default)]
    next_object_id: i64,
}

impl Form {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            comment: String::new(),
            picture_path: String::new(),
            dataset_path: String::new(),
            points: Vec::new(),
            parameters: Vec::new(),
            steps: Vec::new(),
            calculators: Vec::new(),
            conditions: Vec::new(),
            next_point_id: 1,
            next_param_id: 1,
            next_object_id: 1,
        }
    }

    // -- Mutation ------------------------------------------------------------

    /// Declares a point and returns its identifier.
    ///
    /// Identifiers are never reused, and allocation stays clear of ids
    /// already present (e.g. on forms loaded from storage or imported
    /// from JSON, where the allocator state is not part of the data).
    pub fn add_point(&mut self, name: impl Into<String>, comment: impl Into<String>) -> PointId {
        let floor = self.points.iter().map(|p| p.id.0 + 1).max().unwrap_or(1);
        let id = PointId(self.next_point_id.max(floor));
        self.next_point_id = id.0 + 1;
        self.points.push(Point {
            id,
            name: name.into(),
            comment: comment.into(),
        });
        id
    }

    /// Declares a parameter and returns its identifier.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        comment: impl Into<String>,
        weight: Option<f64>,
    ) -> ParamId {
        let floor = self.parameters.iter().map(|p| p.id.0 + 1).max().unwrap_or(1);
        let id = ParamId(self.next_param_id.max(floor));
        self.next_param_id = id.0 + 1;
        self.parameters.push(Parameter {
            id,
            name: name.into(),
            comment: comment.into(),
            weight,
        });
        id
    }

    /// Allocates a fresh object identifier for this form.
    pub fn next_object_id(&mut self) -> ObjectId {
        let floor = self
            .objects()
            .map(|o| o.id.0 + 1)
            .max()
            .unwrap_or(1);
        let id = ObjectId(self.next_object_id.max(floor));
        self.next_object_id = id.0 + 1;
        id
    }

    /// Shorthand: allocates an id and builds an object of `class`.
    pub fn new_object(&mut self, class: impl Into<String>) -> PrimitiveObject {
        PrimitiveObject::new(self.next_object_id(), class)
    }

    pub fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn add_calculator(&mut self, object: PrimitiveObject) {
        self.calculators.push(object);
    }

    pub fn add_condition(&mut self, object: PrimitiveObject) {
        self.conditions.push(object);
    }

    pub fn remove_point(&mut self, id: PointId) {
        self.points.retain(|p| p.id != id);
    }

    pub fn remove_parameter(&mut self, id: ParamId) {
        self.parameters.retain(|p| p.id != id);
    }

    pub fn remove_step(&mut self, index: usize) {
        if index < self.steps.len() {
            self.steps.remove(index);
        }
    }

    // -- Read access ---------------------------------------------------------

    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn parameter(&self, id: ParamId) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.id == id)
    }

    /// All primitive objects owned by the form, in a stable order:
    /// step tracks first (modifiers then selectors), then calculators,
    /// then conditions.
    pub fn objects(&self) -> impl Iterator<Item = &PrimitiveObject> {
        self.steps
            .iter()
            .flat_map(|s| s.tracks.iter())
            .flat_map(|t| t.modifiers.iter().chain(t.selectors.iter()))
            .chain(self.calculators.iter())
            .chain(self.conditions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ids_are_unique_and_stable() {
        let mut form = Form::new("qt");
        let p1 = form.add_point("Q", "");
        let p2 = form.add_point("T", "");
        assert_ne!(p1, p2);
        assert_eq!(form.point(p1).unwrap().name, "Q");

        form.remove_point(p1);
        let p3 = form.add_point("S", "");
        // Removed ids are never reused.
        assert_ne!(p3, p1);
    }

    #[test]
    fn bound_well_formedness() {
        assert!(Bound::anchor(PointId(1)).is_well_formed());
        assert!(Bound::padding(0.5).is_well_formed());
        assert!(!Bound::default().is_well_formed());
        let both = Bound {
            anchor: Some(PointId(1)),
            padding: Some(0.0),
        };
        assert!(!both.is_well_formed());
    }

    #[test]
    fn objects_iterates_in_stable_order() {
        let mut form = Form::new("f");
        let target = form.add_point("P", "");
        let sm = form.new_object("Gain");
        let ps = form.new_object("GlobalMax");
        let pc = form.new_object("Interval");
        let hc = form.new_object("Positive");

        form.push_step(Step {
            target,
            left: Bound::padding(0.0),
            right: Bound::padding(0.0),
            tracks: vec![Track {
                modifiers: vec![sm.clone()],
                selectors: vec![ps.clone()],
            }],
        });
        form.add_calculator(pc.clone());
        form.add_condition(hc.clone());

        let ids: Vec<ObjectId> = form.objects().map(|o| o.id).collect();
        assert_eq!(ids, vec![sm.id, ps.id, pc.id, hc.id]);
    }

    #[test]
    fn serde_round_trip() {
        let mut form = Form::new("rt");
        let p = form.add_point("P", "peak");
        form.add_parameter("x", "", Some(1.0));
        let ps = form.new_object("GlobalMax");
        form.push_step(Step {
            target: p,
            left: Bound::padding(0.0),
            right: Bound::padding(0.0),
            tracks: vec![Track {
                modifiers: vec![],
                selectors: vec![ps],
            }],
        });

        let json = serde_json::to_string(&form).unwrap();
        let back: Form = serde_json::from_str(&json).unwrap();
        assert_eq!(form, back);
    }
}
