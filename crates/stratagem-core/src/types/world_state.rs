//! WorldState - the planner's and executor's model of the environment
//!
//! A property bag keyed by symbolic names. Conditions read it, effects write
//! it; the planner searches over clones of it.

use serde::{Deserialize, Serialize};

use super::property::{Name, PropertyMap, PropertyValue};

/// Mutable world model as a named property bag.
///
/// `Clone` produces a fully independent deep copy; all values are owned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldState {
    properties: PropertyMap,
}

impl WorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of properties currently stored.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true when no properties are set.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Set a property, replacing any previous value under the same key.
    pub fn set_property(&mut self, key: impl Into<Name>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get a property by key.
    pub fn get_property(&self, key: impl Into<Name>) -> Option<&PropertyValue> {
        self.properties.get(&key.into())
    }

    /// Get a property, or [`PropertyValue::Invalid`] when absent.
    pub fn get_property_or_invalid(&self, key: impl Into<Name>) -> PropertyValue {
        self.get_property(key).cloned().unwrap_or_default()
    }

    /// Remove a property, returning the previous value if any.
    pub fn remove_property(&mut self, key: impl Into<Name>) -> Option<PropertyValue> {
        self.properties.shift_remove(&key.into())
    }

    /// Check whether a key is present.
    pub fn has_property(&self, key: impl Into<Name>) -> bool {
        self.properties.contains_key(&key.into())
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.properties.keys()
    }

    /// Iterate over key/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &PropertyValue)> {
        self.properties.iter()
    }

    /// Merge a delta into this state, overwriting colliding keys.
    ///
    /// Used by the planner when speculatively applying expected effects and by
    /// the executor when committing a succeeded task's effects.
    pub fn apply(&mut self, delta: &WorldState) {
        for (key, value) in delta.iter() {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    /// Compute the difference against another state.
    ///
    /// The result contains exactly the keys whose values differ or that exist
    /// on only one side. When both sides hold a (different) value, this side's
    /// value wins.
    pub fn diff(&self, other: &WorldState) -> WorldState {
        let mut out = WorldState::new();
        for (key, value) in self.iter() {
            match other.properties.get(key) {
                Some(theirs) if theirs == value => {}
                _ => {
                    out.properties.insert(key.clone(), value.clone());
                }
            }
        }
        for (key, value) in other.iter() {
            if !self.properties.contains_key(key) {
                out.properties.insert(key.clone(), value.clone());
            }
        }
        out
    }
}

impl PartialEq for WorldState {
    /// Key-set plus tolerant value equality; insertion order is irrelevant.
    fn eq(&self, other: &Self) -> bool {
        if self.properties.len() != other.properties.len() {
            return false;
        }
        self.iter()
            .all(|(key, value)| other.properties.get(key) == Some(value))
    }
}

impl FromIterator<(Name, PropertyValue)> for WorldState {
    fn from_iter<T: IntoIterator<Item = (Name, PropertyValue)>>(iter: T) -> Self {
        Self {
            properties: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::property::Vector3;

    fn sample_state() -> WorldState {
        let mut ws = WorldState::new();
        ws.set_property("has_key", true);
        ws.set_property("ammo", 12i64);
        ws.set_property("position", Vector3::new(1.0, 0.0, 3.0));
        ws
    }

    #[test]
    fn test_clone_is_deep_and_equal() {
        let original = sample_state();
        let mut clone = original.clone();
        assert_eq!(clone, original);

        clone.set_property("ammo", 0i64);
        clone.set_property("alerted", true);
        assert_eq!(
            original.get_property("ammo"),
            Some(&PropertyValue::Int(12))
        );
        assert!(!original.has_property("alerted"));
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut a = WorldState::new();
        a.set_property("x", 1i64);
        a.set_property("y", 2i64);

        let mut b = WorldState::new();
        b.set_property("y", 2i64);
        b.set_property("x", 1i64);

        assert_eq!(a, b);
    }

    #[test]
    fn test_diff_reports_changed_and_one_sided_keys() {
        let mut a = sample_state();
        a.set_property("only_a", "left");

        let mut b = sample_state();
        b.set_property("ammo", 3i64);
        b.set_property("only_b", "right");

        let delta = a.diff(&b);
        assert_eq!(delta.len(), 3);
        // Left value wins on conflict.
        assert_eq!(delta.get_property("ammo"), Some(&PropertyValue::Int(12)));
        assert!(delta.has_property("only_a"));
        assert!(delta.has_property("only_b"));
        assert!(!delta.has_property("has_key"));
    }

    #[test]
    fn test_diff_of_equal_states_is_empty() {
        let a = sample_state();
        let b = sample_state();
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_apply_overwrites_and_inserts() {
        let mut base = sample_state();
        let mut delta = WorldState::new();
        delta.set_property("ammo", 99i64);
        delta.set_property("alerted", true);

        base.apply(&delta);
        assert_eq!(base.get_property("ammo"), Some(&PropertyValue::Int(99)));
        assert_eq!(base.get_property("alerted"), Some(&PropertyValue::Bool(true)));
        assert!(base.has_property("has_key"));
    }

    #[test]
    fn test_remove_property_returns_previous_value() {
        let mut ws = sample_state();
        assert_eq!(ws.remove_property("ammo"), Some(PropertyValue::Int(12)));
        assert_eq!(ws.remove_property("ammo"), None);
        assert!(!ws.has_property("ammo"));
    }
}
