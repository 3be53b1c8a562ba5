//! Core type definitions for Stratagem
//!
//! This module contains the fundamental types used throughout the system:
//! - PropertyValue: tagged-union value for all world-state data
//! - WorldState: the property bag conditions read and effects write
//! - Plan: ordered, dependency-annotated sequence of primitive tasks
//! - ExecutionContext: agent + live world state + shared parameters

mod context;
mod plan;
mod property;
mod world_state;

pub use context::ExecutionContext;
pub use plan::{Plan, PlanExecutionSettings, PlanStatus, TaskRef};
pub use property::{Name, ObjectRef, PropertyMap, PropertyValue, Vector3, FLOAT_TOLERANCE};
pub use world_state::WorldState;
