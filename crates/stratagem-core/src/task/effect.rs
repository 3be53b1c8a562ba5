//! Effect trait definition

use crate::types::WorldState;

/// Declared world-state mutation of a primitive task.
///
/// The planner applies effects speculatively to cloned states during search;
/// the executor commits them to the live state exactly once, when the task
/// reports success.
pub trait Effect: Send + Sync {
    /// Apply the mutation to a world state.
    fn apply(&self, world_state: &mut WorldState);

    /// Human-readable description, for traces and diagnostics.
    fn describe(&self) -> String;
}

/// Closure adapter so tests and call sites can build ad-hoc effects.
pub struct FnEffect<F> {
    label: String,
    mutate: F,
}

impl<F> FnEffect<F>
where
    F: Fn(&mut WorldState) + Send + Sync,
{
    pub fn new(label: impl Into<String>, mutate: F) -> Self {
        Self {
            label: label.into(),
            mutate,
        }
    }
}

impl<F> Effect for FnEffect<F>
where
    F: Fn(&mut WorldState) + Send + Sync,
{
    fn apply(&self, world_state: &mut WorldState) {
        (self.mutate)(world_state)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
