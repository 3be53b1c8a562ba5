//! # Stratagem Core
//!
//! HTN planning and plan execution for autonomous agents.
//!
//! This crate contains:
//! - PropertyValue / WorldState / Plan / ExecutionContext definitions
//! - The Condition / Effect / PrimitiveTask / CompoundTask capability layer
//! - The depth-first decomposition planner
//! - The tick-driven plan executor and its lifecycle events
//! - Plan persistence (versioned binary and JSON records, plan assets)
//!
//! This crate does NOT care about:
//! - What an agent is or how it moves
//! - How the host schedules ticks (call `PlanExecutor::advance` yourself)
//! - Where configuration comes from

pub mod codec;
pub mod executor;
pub mod planner;
pub mod registry;
pub mod task;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::codec::{CodecError, PlanAsset, PlanRecord};
    pub use crate::executor::{
        CollectingObserver, ExecutionEvent, ExecutionMode, ExecutionObserver, ExecutorConfig,
        ExecutorError, ExecutorState, PlanExecutor,
    };
    pub use crate::planner::{
        PlanFailure, PlanValidation, Planner, PlannerConfig, PlannerResult, PlanningMetrics,
    };
    pub use crate::registry::TaskRegistry;
    pub use crate::task::{
        CompoundTask, Condition, Effect, FnCondition, FnEffect, Method, PrimitiveTask,
        TaskNode, TaskProfile, TaskStatus,
    };
    pub use crate::types::{
        ExecutionContext, Name, ObjectRef, Plan, PlanExecutionSettings, PlanStatus, PropertyMap,
        PropertyValue, TaskRef, Vector3, WorldState,
    };
}

// Re-export key types at crate root
pub use codec::{CodecError, PlanAsset, PlanRecord};
pub use executor::{
    ExecutionEvent, ExecutionMode, ExecutionObserver, ExecutorConfig, ExecutorState, PlanExecutor,
};
pub use planner::{PlanFailure, Planner, PlannerConfig, PlannerResult};
pub use registry::TaskRegistry;
pub use task::{CompoundTask, Condition, Effect, Method, PrimitiveTask, TaskNode, TaskStatus};
pub use types::{ExecutionContext, Plan, PlanStatus, PropertyValue, WorldState};
