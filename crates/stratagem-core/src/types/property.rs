//! Property value definitions
//!
//! PropertyValue is the tagged union all world-state and parameter data is
//! made of. Reads never fail: a mismatched accessor returns the
//! caller-supplied default.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used for float and vector equality.
pub const FLOAT_TOLERANCE: f64 = 1e-6;

/// Strongly-typed symbolic name used as a property key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Name(pub String);

impl Name {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&Name> for Name {
    fn from(value: &Name) -> Self {
        value.clone()
    }
}

impl From<Name> for String {
    fn from(value: Name) -> Self {
        value.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Opaque handle to an engine-side object (agent, actor, item).
///
/// The engine never dereferences it; it only stores and compares.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct ObjectRef(pub u64);

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj:{}", self.0)
    }
}

/// Three-component vector for spatial properties.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Componentwise equality within [`FLOAT_TOLERANCE`].
    pub fn approx_eq(&self, other: &Self) -> bool {
        (self.x - other.x).abs() <= FLOAT_TOLERANCE
            && (self.y - other.y).abs() <= FLOAT_TOLERANCE
            && (self.z - other.z).abs() <= FLOAT_TOLERANCE
    }
}

impl PartialEq for Vector3 {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Tagged-union value for world-state and parameter data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Name(Name),
    ObjectRef(ObjectRef),
    Vector(Vector3),
    /// Placeholder for an unset or unusable value.
    #[default]
    Invalid,
}

impl PropertyValue {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Short tag name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Name(_) => "name",
            Self::ObjectRef(_) => "object_ref",
            Self::Vector(_) => "vector",
            Self::Invalid => "invalid",
        }
    }

    pub fn as_bool_or(&self, default: bool) -> bool {
        match self {
            Self::Bool(v) => *v,
            _ => default,
        }
    }

    pub fn as_int_or(&self, default: i64) -> i64 {
        match self {
            Self::Int(v) => *v,
            _ => default,
        }
    }

    /// Returns the float payload; `Int` values widen, everything else defaults.
    pub fn as_float_or(&self, default: f64) -> f64 {
        match self {
            Self::Float(v) => *v,
            Self::Int(v) => *v as f64,
            _ => default,
        }
    }

    pub fn as_str_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self {
            Self::Str(v) => v.as_str(),
            _ => default,
        }
    }

    pub fn as_name_or(&self, default: &Name) -> Name {
        match self {
            Self::Name(v) => v.clone(),
            _ => default.clone(),
        }
    }

    pub fn as_object_or(&self, default: ObjectRef) -> ObjectRef {
        match self {
            Self::ObjectRef(v) => *v,
            _ => default,
        }
    }

    pub fn as_vector_or(&self, default: Vector3) -> Vector3 {
        match self {
            Self::Vector(v) => *v,
            _ => default,
        }
    }
}

impl PartialEq for PropertyValue {
    /// Type-then-value equality; floats compare within [`FLOAT_TOLERANCE`].
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => (a - b).abs() <= FLOAT_TOLERANCE,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Name(a), Self::Name(b)) => a == b,
            (Self::ObjectRef(a), Self::ObjectRef(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) => a.approx_eq(b),
            (Self::Invalid, Self::Invalid) => true,
            _ => false,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Name> for PropertyValue {
    fn from(value: Name) -> Self {
        Self::Name(value)
    }
}

impl From<ObjectRef> for PropertyValue {
    fn from(value: ObjectRef) -> Self {
        Self::ObjectRef(value)
    }
}

impl From<Vector3> for PropertyValue {
    fn from(value: Vector3) -> Self {
        Self::Vector(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => v.fmt(f),
            Self::Int(v) => v.fmt(f),
            Self::Float(v) => v.fmt(f),
            Self::Str(v) => v.fmt(f),
            Self::Name(v) => v.fmt(f),
            Self::ObjectRef(v) => v.fmt(f),
            Self::Vector(v) => v.fmt(f),
            Self::Invalid => write!(f, "<invalid>"),
        }
    }
}

/// Insertion-ordered map of named property values.
///
/// Shared by WorldState internals, execution-context parameters, and the
/// plan's per-task parameter/result rows.
pub type PropertyMap = IndexMap<Name, PropertyValue>;
