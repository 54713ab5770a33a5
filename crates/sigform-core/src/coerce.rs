//! Argument coercion: the single funnel where stored text becomes
//! typed scalars.
//!
//! Primitive classes declare their constructor arguments with a scalar
//! type; objects store argument values as text. [`coerce_arguments`]
//! converts a textual value map into a typed one according to the
//! declared schema, filling missing names from defaults.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar types a constructor argument can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    Int,
    Real,
    Text,
    Bool,
}

impl ArgType {
    /// Stable name used in the relational schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Real => "real",
            Self::Text => "string",
            Self::Bool => "bool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "int" => Some(Self::Int),
            "real" => Some(Self::Real),
            "string" => Some(Self::Text),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one constructor argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub ty: ArgType,
    /// Textual default, used when no value is stored.
    pub default: Option<String>,
    #[serde(default)]
    pub comment: String,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            comment: String::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// A coerced scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl ArgValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Real value; ints widen.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical textual form. Coercing the canonical text of a value
    /// yields the value back.
    pub fn canonical(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Real(v) => {
                // Keep a decimal point so the text re-parses as a real.
                let s = v.to_string();
                if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
                    s
                } else {
                    format!("{s}.0")
                }
            }
            Self::Text(v) => v.clone(),
            Self::Bool(v) => v.to_string(),
        }
    }
}

/// Coercion failures, citing the offending argument.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("argument {name:?}: cannot convert {literal:?} to {ty}")]
    Invalid {
        name: String,
        ty: ArgType,
        literal: String,
    },

    #[error("argument {name:?} ({ty}) has no value and no default")]
    Missing { name: String, ty: ArgType },

    #[error("value given for undeclared argument {name:?}")]
    Undeclared { name: String },
}

/// Converts one literal according to the declared type.
pub fn coerce_value(name: &str, ty: ArgType, literal: &str) -> Result<ArgValue, ConvertError> {
    let invalid = || ConvertError::Invalid {
        name: name.to_owned(),
        ty,
        literal: literal.to_owned(),
    };
    match ty {
        ArgType::Int => literal.trim().parse::<i64>().map(ArgValue::Int).map_err(|_| invalid()),
        ArgType::Real => literal
            .trim()
            .parse::<f64>()
            .map(ArgValue::Real)
            .map_err(|_| invalid()),
        ArgType::Text => Ok(ArgValue::Text(literal.to_owned())),
        ArgType::Bool => match literal.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(ArgValue::Bool(true)),
            "false" | "0" => Ok(ArgValue::Bool(false)),
            _ => Err(invalid()),
        },
    }
}

/// Coerces a stored textual value map against an argument schema.
///
/// An empty stored literal counts as missing and falls back to the
/// declared default; a missing value without a default is an error.
pub fn coerce_arguments(
    schema: &[ArgSpec],
    values: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, ArgValue>, ConvertError> {
    for name in values.keys() {
        if !schema.iter().any(|a| &a.name == name) {
            return Err(ConvertError::Undeclared { name: name.clone() });
        }
    }

    let mut out = BTreeMap::new();
    for arg in schema {
        let stored = values.get(&arg.name).filter(|v| !v.is_empty());
        let literal = match stored.or(arg.default.as_ref()) {
            Some(lit) => lit,
            None => {
                return Err(ConvertError::Missing {
                    name: arg.name.clone(),
                    ty: arg.ty,
                });
            }
        };
        out.insert(arg.name.clone(), coerce_value(&arg.name, arg.ty, literal)?);
    }
    Ok(out)
}
