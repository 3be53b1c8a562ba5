//! Task abstraction module
//!
//! This module defines the task capability contract the planner reasons about
//! and the executor drives:
//! - PrimitiveTask: directly executable action with a tick-based protocol
//! - CompoundTask: abstract task decomposed through prioritized Methods
//! - Condition / Effect: the satellite guard and mutation traits
//! - TaskNode: the polymorphic unit a worklist or method subtask list holds

mod condition;
mod effect;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionContext, PropertyMap, WorldState};

pub use condition::{Condition, FnCondition};
pub use effect::{Effect, FnEffect};

/// Terminal or in-progress status of a task's execution protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Still running; `tick` will be called again next step.
    InProgress,
    /// Finished successfully; declared effects will be committed.
    Succeeded,
    /// Finished unsuccessfully.
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Static description of a primitive task: identity, cost, guards, effects.
///
/// Concrete tasks own one of these and hand it out through
/// [`PrimitiveTask::profile`]; the planner and executor only ever read it.
pub struct TaskProfile {
    /// Task name (shown in plans, traces, and serialized references).
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Scalar cost added to a plan's total when the task is included.
    pub cost: f64,
    /// Ordered preconditions; all must hold for the task to be applicable.
    pub preconditions: Vec<Arc<dyn Condition>>,
    /// Ordered effects, committed on success.
    pub effects: Vec<Arc<dyn Effect>>,
}

impl TaskProfile {
    /// Create a new profile with unit cost and no guards or effects.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            cost: 1.0,
            preconditions: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Set the cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Append a precondition.
    pub fn with_precondition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.preconditions.push(condition);
        self
    }

    /// Append an effect.
    pub fn with_effect(mut self, effect: Arc<dyn Effect>) -> Self {
        self.effects.push(effect);
        self
    }
}

impl std::fmt::Debug for TaskProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskProfile")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .field("preconditions", &self.preconditions.len())
            .field("effects", &self.effects.len())
            .finish()
    }
}

/// Primitive task - a directly executable action.
///
/// Tasks are shared immutably (`Arc`) between plans; per-execution state lives
/// in `memory`, the plan's parameter row for the task's slot, so a task type
/// needs no interior mutability to carry values across ticks.
pub trait PrimitiveTask: Send + Sync {
    /// Static identity, cost, preconditions, and effects.
    fn profile(&self) -> &TaskProfile;

    /// Stable type identifier used by the task registry on rehydration.
    fn class_path(&self) -> &str;

    /// Called once when the task starts. May return `InProgress`.
    fn execute(&self, ctx: &mut ExecutionContext, memory: &mut PropertyMap) -> TaskStatus;

    /// Called every step while the previous call returned `InProgress`.
    fn tick(
        &self,
        _ctx: &mut ExecutionContext,
        _dt: f64,
        _memory: &mut PropertyMap,
    ) -> TaskStatus {
        TaskStatus::Succeeded
    }

    /// Called exactly once on leaving `InProgress`, success or failure.
    fn end(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap, _status: TaskStatus) {}

    /// Called instead of a normal `end` when the task is forcibly stopped.
    fn abort(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) {}

    /// Task name from the profile.
    fn name(&self) -> &str {
        &self.profile().name
    }

    /// Scalar cost from the profile.
    fn cost(&self) -> f64 {
        self.profile().cost
    }

    /// Human-readable description.
    fn describe(&self) -> String {
        let profile = self.profile();
        if profile.description.is_empty() {
            profile.name.clone()
        } else {
            format!("{}: {}", profile.name, profile.description)
        }
    }

    /// Conjunction of the profile's preconditions.
    fn is_applicable(&self, world_state: &WorldState) -> bool {
        self.profile()
            .preconditions
            .iter()
            .all(|c| c.is_met(world_state))
    }

    /// Apply the profile's effects directly to a world state.
    fn apply_effects(&self, world_state: &mut WorldState) {
        for effect in &self.profile().effects {
            effect.apply(world_state);
        }
    }

    /// Delta world state the planner applies speculatively.
    fn expected_effects(&self, world_state: &WorldState) -> WorldState {
        let mut scratch = world_state.clone();
        self.apply_effects(&mut scratch);
        scratch.diff(world_state)
    }
}

/// One way to decompose a compound task, guarded by conditions and ranked by
/// priority (higher first).
pub struct Method {
    pub name: String,
    pub priority: i32,
    pub conditions: Vec<Arc<dyn Condition>>,
    pub subtasks: Vec<TaskNode>,
}

impl Method {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            conditions: Vec::new(),
            subtasks: Vec::new(),
        }
    }

    /// Append a guard condition.
    pub fn with_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append a subtask.
    pub fn with_subtask(mut self, subtask: TaskNode) -> Self {
        self.subtasks.push(subtask);
        self
    }

    /// A method with no subtasks decomposes to nothing and is excluded from use.
    pub fn is_valid(&self) -> bool {
        !self.subtasks.is_empty()
    }

    /// Conjunction of the method's guard conditions.
    pub fn is_applicable(&self, world_state: &WorldState) -> bool {
        self.conditions.iter().all(|c| c.is_met(world_state))
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("subtasks", &self.subtasks.len())
            .finish()
    }
}

/// Compound task - achieved by selecting one applicable method and running
/// its subtasks.
pub struct CompoundTask {
    pub name: String,
    pub methods: Vec<Method>,
}

impl CompoundTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Append a method. Declaration order is the tie-break on equal priority.
    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Valid, applicable methods sorted by descending priority.
    ///
    /// The sort is stable, so equal priorities keep declaration order.
    pub fn applicable_methods(&self, world_state: &WorldState) -> Vec<&Method> {
        let mut methods: Vec<&Method> = self
            .methods
            .iter()
            .filter(|m| m.is_valid() && m.is_applicable(world_state))
            .collect();
        methods.sort_by_key(|m| std::cmp::Reverse(m.priority));
        methods
    }

    /// At least one valid method is applicable.
    pub fn is_applicable(&self, world_state: &WorldState) -> bool {
        self.methods
            .iter()
            .any(|m| m.is_valid() && m.is_applicable(world_state))
    }
}

impl std::fmt::Debug for CompoundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundTask")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Polymorphic task unit held by goal lists and method subtask lists.
#[derive(Clone)]
pub enum TaskNode {
    Primitive(Arc<dyn PrimitiveTask>),
    Compound(Arc<CompoundTask>),
}

impl TaskNode {
    /// Wrap a primitive task.
    pub fn primitive(task: impl PrimitiveTask + 'static) -> Self {
        Self::Primitive(Arc::new(task))
    }

    /// Wrap a compound task.
    pub fn compound(task: CompoundTask) -> Self {
        Self::Compound(Arc::new(task))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Primitive(task) => task.name(),
            Self::Compound(task) => &task.name,
        }
    }

    pub fn is_applicable(&self, world_state: &WorldState) -> bool {
        match self {
            Self::Primitive(task) => task.is_applicable(world_state),
            Self::Compound(task) => task.is_applicable(world_state),
        }
    }

    pub fn expected_effects(&self, world_state: &WorldState) -> WorldState {
        match self {
            Self::Primitive(task) => task.expected_effects(world_state),
            // A compound task's effects are whatever its decomposition yields;
            // it contributes no delta of its own.
            Self::Compound(_) => WorldState::new(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Primitive(task) => task.describe(),
            Self::Compound(task) => format!("{} ({} methods)", task.name, task.methods.len()),
        }
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(task) => write!(f, "Primitive({})", task.name()),
            Self::Compound(task) => write!(f, "Compound({})", task.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyValue;

    struct StubTask {
        profile: TaskProfile,
    }

    impl StubTask {
        fn new(profile: TaskProfile) -> Self {
            Self { profile }
        }
    }

    impl PrimitiveTask for StubTask {
        fn profile(&self) -> &TaskProfile {
            &self.profile
        }

        fn class_path(&self) -> &str {
            "stratagem.test.StubTask"
        }

        fn execute(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) -> TaskStatus {
            TaskStatus::Succeeded
        }
    }

    fn flag_condition(key: &'static str) -> Arc<dyn Condition> {
        Arc::new(FnCondition::new(format!("{key} is set"), move |ws| {
            ws.get_property(key).map(|v| v.as_bool_or(false)) == Some(true)
        }))
    }

    fn set_flag_effect(key: &'static str) -> Arc<dyn Effect> {
        Arc::new(FnEffect::new(format!("set {key}"), move |ws| {
            ws.set_property(key, true)
        }))
    }

    #[test]
    fn test_primitive_applicability_is_precondition_conjunction() {
        let task = StubTask::new(
            TaskProfile::new("open_door", "opens the door")
                .with_precondition(flag_condition("has_key"))
                .with_precondition(flag_condition("at_door")),
        );

        let mut ws = WorldState::new();
        ws.set_property("has_key", true);
        assert!(!task.is_applicable(&ws));

        ws.set_property("at_door", true);
        assert!(task.is_applicable(&ws));
    }

    #[test]
    fn test_expected_effects_is_a_delta() {
        let task = StubTask::new(
            TaskProfile::new("unlock", "").with_effect(set_flag_effect("door_open")),
        );

        let mut ws = WorldState::new();
        ws.set_property("untouched", 5i64);

        let delta = task.expected_effects(&ws);
        assert_eq!(delta.len(), 1);
        assert_eq!(
            delta.get_property("door_open"),
            Some(&PropertyValue::Bool(true))
        );
    }

    #[test]
    fn test_method_without_subtasks_is_invalid() {
        let method = Method::new("noop", 0);
        assert!(!method.is_valid());

        let ws = WorldState::new();
        let compound = CompoundTask::new("goal").with_method(Method::new("empty", 5));
        assert!(!compound.is_applicable(&ws));
        assert!(compound.applicable_methods(&ws).is_empty());
    }

    #[test]
    fn test_applicable_methods_sorted_by_descending_priority_stable() {
        let leaf = || {
            TaskNode::primitive(StubTask::new(TaskProfile::new("leaf", "")))
        };
        let compound = CompoundTask::new("goal")
            .with_method(Method::new("low", 1).with_subtask(leaf()))
            .with_method(Method::new("high", 2).with_subtask(leaf()))
            .with_method(Method::new("also_high", 2).with_subtask(leaf()));

        let ws = WorldState::new();
        let ordered: Vec<&str> = compound
            .applicable_methods(&ws)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(ordered, vec!["high", "also_high", "low"]);
    }

    #[test]
    fn test_guarded_method_excluded_when_condition_fails() {
        let leaf = TaskNode::primitive(StubTask::new(TaskProfile::new("leaf", "")));
        let compound = CompoundTask::new("goal").with_method(
            Method::new("guarded", 1)
                .with_condition(flag_condition("alerted"))
                .with_subtask(leaf),
        );

        let mut ws = WorldState::new();
        assert!(compound.applicable_methods(&ws).is_empty());

        ws.set_property("alerted", true);
        assert_eq!(compound.applicable_methods(&ws).len(), 1);
    }
}
