//! Primitive class registry.
//!
//! The four primitive kinds (signal modifier, point selector, parameter
//! calculator, hard condition) are distinct descriptors sharing one
//! registration envelope. A [`ClassDescriptor`] declares the class name,
//! kind, constructor-argument schema, slot schemas, and a factory that
//! builds a live primitive from coerced arguments. Registration is
//! append-only; the registry is read-only once execution starts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coerce::{self, ArgSpec, ArgValue, ConvertError};
use crate::form::PrimitiveObject;
use crate::signal::Signal;

/// Coerced constructor arguments, keyed by argument name.
pub type ArgMap = BTreeMap<String, ArgValue>;

/// Parameter values keyed by slot name.
pub type ValueMap = BTreeMap<String, f64>;

/// Errors raised inside a primitive, or by its factory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PrimitiveError {
    #[error("{0}")]
    Failed(String),

    #[error("input slot {0:?} received no value")]
    MissingInput(String),

    #[error("modifier changed signal length ({expected} -> {actual})")]
    LengthChanged { expected: usize, actual: usize },
}

impl PrimitiveError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

// ---------------------------------------------------------------------------
// Primitive traits
// ---------------------------------------------------------------------------

/// Rewrites a signal into one of identical length and frequency.
pub trait SignalModifier: std::fmt::Debug + Send + Sync {
    fn apply(&self, signal: &Signal) -> Result<Signal, PrimitiveError>;
}

/// Emits candidate times within the signal's time domain.
pub trait PointSelector: std::fmt::Debug + Send + Sync {
    fn select(&self, signal: &Signal) -> Result<Vec<f64>, PrimitiveError>;
}

/// Computes output parameter values from input parameters and placed
/// point times. The returned map is keyed by output slot name.
pub trait ParamCalculator: Send + Sync {
    fn compute(&self, params: &ValueMap, points: &ValueMap) -> Result<ValueMap, PrimitiveError>;
}

/// Checks a hard condition over parameter values.
pub trait HardCondition: Send + Sync {
    fn check(&self, params: &ValueMap) -> Result<bool, PrimitiveError>;
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// The four primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Modifier,
    Selector,
    Calculator,
    Condition,
}

impl ClassKind {
    /// Stable name used in the relational schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modifier => "modifier",
            Self::Selector => "selector",
            Self::Calculator => "calculator",
            Self::Condition => "condition",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "modifier" => Some(Self::Modifier),
            "selector" => Some(Self::Selector),
            "calculator" => Some(Self::Calculator),
            "condition" => Some(Self::Condition),
            _ => None,
        }
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factory for one primitive kind. The variant fixes the class kind.
pub enum Constructor {
    Modifier(Box<dyn Fn(&ArgMap) -> Result<Box<dyn SignalModifier>, PrimitiveError> + Send + Sync>),
    Selector(Box<dyn Fn(&ArgMap) -> Result<Box<dyn PointSelector>, PrimitiveError> + Send + Sync>),
    Calculator(
        Box<dyn Fn(&ArgMap) -> Result<Box<dyn ParamCalculator>, PrimitiveError> + Send + Sync>,
    ),
    Condition(Box<dyn Fn(&ArgMap) -> Result<Box<dyn HardCondition>, PrimitiveError> + Send + Sync>),
}

impl Constructor {
    pub fn kind(&self) -> ClassKind {
        match self {
            Self::Modifier(_) => ClassKind::Modifier,
            Self::Selector(_) => ClassKind::Selector,
            Self::Calculator(_) => ClassKind::Calculator,
            Self::Condition(_) => ClassKind::Condition,
        }
    }
}

/// A registered primitive class.
pub struct ClassDescriptor {
    pub name: String,
    pub comment: String,
    pub arguments: Vec<ArgSpec>,
    /// Input-parameter slot names (calculators and conditions).
    pub input_params: Vec<String>,
    /// Input-point slot names (calculators only).
    pub input_points: Vec<String>,
    /// Output-parameter slot names (calculators only).
    pub output_params: Vec<String>,
    pub constructor: Constructor,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>, constructor: Constructor) -> Self {
        Self {
            name: name.into(),
            comment: String::new(),
            arguments: Vec::new(),
            input_params: Vec::new(),
            input_points: Vec::new(),
            output_params: Vec::new(),
            constructor,
        }
    }

    pub fn kind(&self) -> ClassKind {
        self.constructor.kind()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_argument(mut self, arg: ArgSpec) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn with_input_param(mut self, slot: impl Into<String>) -> Self {
        self.input_params.push(slot.into());
        self
    }

    pub fn with_input_point(mut self, slot: impl Into<String>) -> Self {
        self.input_points.push(slot.into());
        self
    }

    pub fn with_output_param(mut self, slot: impl Into<String>) -> Self {
        self.output_params.push(slot.into());
        self
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Errors from registration and lookup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("class {0:?} is already registered")]
    DuplicateClass(String),

    #[error("unknown class {0:?}")]
    UnknownClass(String),

    #[error("class {name:?} is a {actual}, expected a {expected}")]
    KindMismatch {
        name: String,
        expected: ClassKind,
        actual: ClassKind,
    },
}

/// Errors from turning a stored object into a live primitive.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstantiateError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("constructor failed: {0}")]
    Construct(#[from] PrimitiveError),
}

/// Append-only catalog of primitive classes, keyed by name.
#[derive(Default)]
pub struct Registry {
    classes: BTreeMap<String, ClassDescriptor>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class. Duplicate names are a conflict.
    pub fn register(&mut self, descriptor: ClassDescriptor) -> Result<(), RegistryError> {
        if self.classes.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateClass(descriptor.name));
        }
        self.classes.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ClassDescriptor, RegistryError> {
        self.classes
            .get(name)
            .ok_or_else(|| RegistryError::UnknownClass(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// All registered classes in name order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    fn get_kind(
        &self,
        name: &str,
        expected: ClassKind,
    ) -> Result<&ClassDescriptor, RegistryError> {
        let descriptor = self.get(name)?;
        if descriptor.kind() != expected {
            return Err(RegistryError::KindMismatch {
                name: name.to_owned(),
                expected,
                actual: descriptor.kind(),
            });
        }
        Ok(descriptor)
    }

    /// Builds a live signal modifier from a stored object.
    pub fn modifier(
        &self,
        object: &PrimitiveObject,
    ) -> Result<Box<dyn SignalModifier>, InstantiateError> {
        let descriptor = self.get_kind(&object.class, ClassKind::Modifier)?;
        let args = coerce::coerce_arguments(&descriptor.arguments, &object.arguments)?;
        match &descriptor.constructor {
            Constructor::Modifier(build) => Ok(build(&args)?),
            _ => unreachable!("kind checked above"),
        }
    }

    /// Builds a live point selector from a stored object.
    pub fn selector(
        &self,
        object: &PrimitiveObject,
    ) -> Result<Box<dyn PointSelector>, InstantiateError> {
        let descriptor = self.get_kind(&object.class, ClassKind::Selector)?;
        let args = coerce::coerce_arguments(&descriptor.arguments, &object.arguments)?;
        match &descriptor.constructor {
            Constructor::Selector(build) => Ok(build(&args)?),
            _ => unreachable!("kind checked above"),
        }
    }

    /// Builds a live parameter calculator from a stored object.
    pub fn calculator(
        &self,
        object: &PrimitiveObject,
    ) -> Result<Box<dyn ParamCalculator>, InstantiateError> {
        let descriptor = self.get_kind(&object.class, ClassKind::Calculator)?;
        let args = coerce::coerce_arguments(&descriptor.arguments, &object.arguments)?;
        match &descriptor.constructor {
            Constructor::Calculator(build) => Ok(build(&args)?),
            _ => unreachable!("kind checked above"),
        }
    }

    /// Builds a live hard condition from a stored object.
    pub fn condition(
        &self,
        object: &PrimitiveObject,
    ) -> Result<Box<dyn HardCondition>, InstantiateError> {
        let descriptor = self.get_kind(&object.class, ClassKind::Condition)?;
        let args = coerce::coerce_arguments(&descriptor.arguments, &object.arguments)?;
        match &descriptor.constructor {
            Constructor::Condition(build) => Ok(build(&args)?),
            _ => unreachable!("kind checked above"),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ObjectId;

    #[derive(Debug)]
    struct Noop;

    impl SignalModifier for Noop {
        fn apply(&self, signal: &Signal) -> Result<Signal, PrimitiveError> {
            Ok(signal.clone())
        }
    }

    fn noop_class(name: &str) -> ClassDescriptor {
        ClassDescriptor::new(
            name,
            Constructor::Modifier(Box::new(|_| Ok(Box::new(Noop)))),
        )
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let mut registry = Registry::new();
        registry.register(noop_class("Noop")).unwrap();
        assert_eq!(
            registry.register(noop_class("Noop")).unwrap_err(),
            RegistryError::DuplicateClass("Noop".into())
        );
    }

    #[test]
    fn unknown_class_lookup_fails() {
        let registry = Registry::new();
        assert_eq!(
            registry.get("Ghost").unwrap_err(),
            RegistryError::UnknownClass("Ghost".into())
        );
    }

    #[test]
    fn kind_mismatch_detected() {
        let mut registry = Registry::new();
        registry.register(noop_class("Noop")).unwrap();
        let object = PrimitiveObject::new(ObjectId(1), "Noop");
        let err = registry.selector(&object).unwrap_err();
        assert_eq!(
            err,
            InstantiateError::Registry(RegistryError::KindMismatch {
                name: "Noop".into(),
                expected: ClassKind::Selector,
                actual: ClassKind::Modifier,
            })
        );
    }
}
