//! # Stratagem Tasks
//!
//! Generic, engine-independent collaborators for the Stratagem core:
//! property-based conditions and effects plus a handful of reusable primitive
//! tasks. Game-specific actions (movement, animation) live with the host;
//! everything here operates purely on world-state properties.

pub mod conditions;
pub mod effects;
pub mod tasks;

pub use conditions::{CompareOp, HasPropertyCondition, LacksPropertyCondition, PropertyCondition};
pub use effects::{RemovePropertyEffect, SetPropertyEffect, TogglePropertyEffect};
pub use tasks::{ApplyEffectsTask, DelayTask, FailTask, NoopTask};
