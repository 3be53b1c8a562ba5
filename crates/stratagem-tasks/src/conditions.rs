//! Property-based conditions.

use serde::{Deserialize, Serialize};

use stratagem_core::task::Condition;
use stratagem_core::types::{Name, PropertyValue, WorldState};

/// Comparison operator for [`PropertyCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Compares a world-state property against a fixed value.
///
/// Equality uses the property system's tolerant comparison. Ordering works
/// for numeric values (Int and Float compare interchangeably) and strings;
/// ordering anything else, or a missing key, is false.
#[derive(Debug, Clone)]
pub struct PropertyCondition {
    pub key: Name,
    pub op: CompareOp,
    pub value: PropertyValue,
}

impl PropertyCondition {
    pub fn new(key: impl Into<Name>, op: CompareOp, value: impl Into<PropertyValue>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.into(),
        }
    }
}

fn ordering_of(left: &PropertyValue, right: &PropertyValue) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (PropertyValue::Int(_) | PropertyValue::Float(_), PropertyValue::Int(_) | PropertyValue::Float(_)) => {
            left.as_float_or(0.0).partial_cmp(&right.as_float_or(0.0))
        }
        (PropertyValue::Str(a), PropertyValue::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

impl Condition for PropertyCondition {
    fn is_met(&self, world_state: &WorldState) -> bool {
        let Some(actual) = world_state.get_property(&self.key) else {
            return false;
        };
        match self.op {
            CompareOp::Eq => *actual == self.value,
            CompareOp::Ne => *actual != self.value,
            CompareOp::Lt => ordering_of(actual, &self.value) == Some(std::cmp::Ordering::Less),
            CompareOp::Gt => ordering_of(actual, &self.value) == Some(std::cmp::Ordering::Greater),
            CompareOp::Le => matches!(
                ordering_of(actual, &self.value),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            ),
            CompareOp::Ge => matches!(
                ordering_of(actual, &self.value),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            ),
        }
    }

    fn describe(&self) -> String {
        format!("{} {} {}", self.key, self.op.symbol(), self.value)
    }
}

/// Met when the key exists, whatever its value.
#[derive(Debug, Clone)]
pub struct HasPropertyCondition {
    pub key: Name,
}

impl HasPropertyCondition {
    pub fn new(key: impl Into<Name>) -> Self {
        Self { key: key.into() }
    }
}

impl Condition for HasPropertyCondition {
    fn is_met(&self, world_state: &WorldState) -> bool {
        world_state.has_property(&self.key)
    }

    fn describe(&self) -> String {
        format!("has {}", self.key)
    }
}

/// Met when the key is absent.
#[derive(Debug, Clone)]
pub struct LacksPropertyCondition {
    pub key: Name,
}

impl LacksPropertyCondition {
    pub fn new(key: impl Into<Name>) -> Self {
        Self { key: key.into() }
    }
}

impl Condition for LacksPropertyCondition {
    fn is_met(&self, world_state: &WorldState) -> bool {
        !world_state.has_property(&self.key)
    }

    fn describe(&self) -> String {
        format!("lacks {}", self.key)
    }
}
