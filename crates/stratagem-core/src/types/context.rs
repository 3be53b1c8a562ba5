//! ExecutionContext type definition

use serde::{Deserialize, Serialize};

use super::property::{Name, ObjectRef, PropertyMap, PropertyValue};
use super::world_state::WorldState;

/// Execution context for plan execution
///
/// Bundles:
/// - The owning agent (opaque handle; the engine never dereferences it)
/// - The live world state (the executor is its sole mutator while a plan runs)
/// - A shared parameter bag visible to every task in the plan
///
/// Supplied per `start_plan` call; `Clone` yields an independent copy for
/// speculative simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Handle to the agent this plan runs on behalf of.
    pub owner: ObjectRef,
    /// Live world state.
    pub world_state: WorldState,
    /// Shared parameters, visible to all tasks.
    pub parameters: PropertyMap,
}

impl ExecutionContext {
    /// Create a new context for an agent over a world state.
    pub fn new(owner: ObjectRef, world_state: WorldState) -> Self {
        Self {
            owner,
            world_state,
            parameters: PropertyMap::new(),
        }
    }

    /// Attach a shared parameter.
    pub fn with_parameter(
        mut self,
        key: impl Into<Name>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Get a shared parameter by key.
    pub fn parameter(&self, key: impl Into<Name>) -> Option<&PropertyValue> {
        self.parameters.get(&key.into())
    }

    /// Set a shared parameter.
    pub fn set_parameter(&mut self, key: impl Into<Name>, value: impl Into<PropertyValue>) {
        self.parameters.insert(key.into(), value.into());
    }
}
