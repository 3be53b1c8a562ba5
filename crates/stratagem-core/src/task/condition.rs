//! Condition trait definition

use crate::types::WorldState;

/// Guard over a world state.
///
/// Conditions are pure reads: evaluating one never mutates the state.
/// Preconditions of a primitive task and the guards of a method are both
/// condition lists combined as a conjunction.
pub trait Condition: Send + Sync {
    /// Evaluate against a world state.
    fn is_met(&self, world_state: &WorldState) -> bool;

    /// Human-readable description, for traces and diagnostics.
    fn describe(&self) -> String;
}

/// Closure adapter so tests and call sites can build ad-hoc conditions.
pub struct FnCondition<F> {
    label: String,
    check: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&WorldState) -> bool + Send + Sync,
{
    pub fn new(label: impl Into<String>, check: F) -> Self {
        Self {
            label: label.into(),
            check,
        }
    }
}

impl<F> Condition for FnCondition<F>
where
    F: Fn(&WorldState) -> bool + Send + Sync,
{
    fn is_met(&self, world_state: &WorldState) -> bool {
        (self.check)(world_state)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
