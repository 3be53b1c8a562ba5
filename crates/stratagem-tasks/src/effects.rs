//! Property-based effects.

use stratagem_core::task::Effect;
use stratagem_core::types::{Name, PropertyValue, WorldState};

/// Writes a fixed value to a key, inserting or overwriting.
#[derive(Debug, Clone)]
pub struct SetPropertyEffect {
    pub key: Name,
    pub value: PropertyValue,
}

impl SetPropertyEffect {
    pub fn new(key: impl Into<Name>, value: impl Into<PropertyValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Effect for SetPropertyEffect {
    fn apply(&self, world_state: &mut WorldState) {
        world_state.set_property(&self.key, self.value.clone());
    }

    fn describe(&self) -> String {
        format!("{} := {}", self.key, self.value)
    }
}

/// Removes a key; a no-op when it is absent.
#[derive(Debug, Clone)]
pub struct RemovePropertyEffect {
    pub key: Name,
}

impl RemovePropertyEffect {
    pub fn new(key: impl Into<Name>) -> Self {
        Self { key: key.into() }
    }
}

impl Effect for RemovePropertyEffect {
    fn apply(&self, world_state: &mut WorldState) {
        world_state.remove_property(&self.key);
    }

    fn describe(&self) -> String {
        format!("remove {}", self.key)
    }
}

/// Flips a boolean key. An absent or non-boolean value counts as `false`, so
/// the first toggle always lands on `true`.
#[derive(Debug, Clone)]
pub struct TogglePropertyEffect {
    pub key: Name,
}

impl TogglePropertyEffect {
    pub fn new(key: impl Into<Name>) -> Self {
        Self { key: key.into() }
    }
}

impl Effect for TogglePropertyEffect {
    fn apply(&self, world_state: &mut WorldState) {
        let current = world_state
            .get_property(&self.key)
            .map(|v| v.as_bool_or(false))
            .unwrap_or(false);
        world_state.set_property(&self.key, !current);
    }

    fn describe(&self) -> String {
        format!("toggle {}", self.key)
    }
}
