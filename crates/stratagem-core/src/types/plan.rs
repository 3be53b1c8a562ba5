//! Plan type definitions
//!
//! A Plan is an ordered sequence of primitive tasks plus execution
//! bookkeeping: cursor, status, per-task parameter/result rows, and a
//! dependency DAG. Tasks are shared by reference; a plan never owns task
//! lifetime. A parallel list of serializable task references carries identity
//! through persistence.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::executor::ExecutionMode;
use crate::task::PrimitiveTask;

use super::property::{Name, PropertyMap, PropertyValue};

/// Lifecycle status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    NotStarted,
    Executing,
    Paused,
    Completed,
    Failed,
    Aborted,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

/// Serializable reference to a primitive task.
///
/// Persists identity (GUID, registry class path, name, cost) rather than the
/// task object itself; rehydration goes through a task registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: Uuid,
    pub class_path: String,
    pub name: String,
    pub cost: f64,
}

impl TaskRef {
    /// Build a fresh reference for a live task.
    pub fn for_task(task: &dyn PrimitiveTask) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_path: task.class_path().to_string(),
            name: task.name().to_string(),
            cost: task.cost(),
        }
    }
}

/// Execution preferences persisted with the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlanExecutionSettings {
    /// Scheduling discipline the plan was authored for.
    pub mode: ExecutionMode,
    /// Whether any task failure should fail the whole plan.
    pub abort_on_task_failure: bool,
}

/// An ordered, dependency-annotated sequence of primitive tasks.
#[derive(Clone, Default)]
pub struct Plan {
    tasks: Vec<Arc<dyn PrimitiveTask>>,
    refs: Vec<TaskRef>,
    total_cost: f64,
    current_task_index: usize,
    status: PlanStatus,
    parameters: Vec<PropertyMap>,
    results: Vec<PropertyMap>,
    dependencies: Vec<BTreeSet<usize>>,
    execution: PlanExecutionSettings,
}

impl Plan {
    /// Create a new empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns true when the plan contains no tasks.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Append a primitive task, generating its serializable reference.
    pub fn add_task(&mut self, task: Arc<dyn PrimitiveTask>) {
        let task_ref = TaskRef::for_task(task.as_ref());
        self.total_cost += task_ref.cost;
        self.refs.push(task_ref);
        self.tasks.push(task);
        self.parameters.push(PropertyMap::new());
        self.results.push(PropertyMap::new());
        self.dependencies.push(BTreeSet::new());
    }

    /// Get a task by index.
    pub fn task(&self, index: usize) -> Option<&Arc<dyn PrimitiveTask>> {
        self.tasks.get(index)
    }

    /// Iterate over the live tasks in order.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<dyn PrimitiveTask>> {
        self.tasks.iter()
    }

    /// Get a serializable task reference by index.
    pub fn task_ref(&self, index: usize) -> Option<&TaskRef> {
        self.refs.get(index)
    }

    /// Iterate over the serializable task references in order.
    pub fn task_refs(&self) -> impl Iterator<Item = &TaskRef> {
        self.refs.iter()
    }

    /// A plan is hydrated when every reference has its live task.
    ///
    /// Deserialized plans stay unhydrated until rebuilt through a registry;
    /// the executor rejects them.
    pub fn is_hydrated(&self) -> bool {
        self.tasks.len() == self.refs.len()
    }

    /// Sum of task costs.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Current execution cursor.
    pub fn current_task_index(&self) -> usize {
        self.current_task_index
    }

    /// Move the execution cursor.
    pub fn set_current_task_index(&mut self, index: usize) {
        self.current_task_index = index.min(self.len());
    }

    /// Advance the cursor by one task.
    pub fn advance(&mut self) {
        self.set_current_task_index(self.current_task_index + 1);
    }

    /// Current plan status.
    pub fn status(&self) -> PlanStatus {
        self.status
    }

    /// Set the plan status.
    pub fn set_status(&mut self, status: PlanStatus) {
        self.status = status;
    }

    /// Execution preferences persisted with the plan.
    pub fn execution_settings(&self) -> PlanExecutionSettings {
        self.execution
    }

    /// Set execution preferences.
    pub fn set_execution_settings(&mut self, settings: PlanExecutionSettings) {
        self.execution = settings;
    }

    // ============ Per-task parameter/result rows ============

    /// Get a parameter for a task slot.
    pub fn parameter(&self, index: usize, key: impl Into<Name>) -> Option<&PropertyValue> {
        self.parameters.get(index)?.get(&key.into())
    }

    /// Set a parameter for a task slot. Out-of-range indices are ignored.
    pub fn set_parameter(
        &mut self,
        index: usize,
        key: impl Into<Name>,
        value: impl Into<PropertyValue>,
    ) {
        if let Some(row) = self.parameters.get_mut(index) {
            row.insert(key.into(), value.into());
        }
    }

    /// Mutable access to a task slot's parameter row (executor scratch space).
    pub fn parameter_row_mut(&mut self, index: usize) -> Option<&mut PropertyMap> {
        self.parameters.get_mut(index)
    }

    /// Get a result for a task slot.
    pub fn result(&self, index: usize, key: impl Into<Name>) -> Option<&PropertyValue> {
        self.results.get(index)?.get(&key.into())
    }

    /// Set a result for a task slot. Out-of-range indices are ignored.
    pub fn set_result(
        &mut self,
        index: usize,
        key: impl Into<Name>,
        value: impl Into<PropertyValue>,
    ) {
        if let Some(row) = self.results.get_mut(index) {
            row.insert(key.into(), value.into());
        }
    }

    pub(crate) fn parameter_rows(&self) -> &[PropertyMap] {
        &self.parameters
    }

    pub(crate) fn result_rows(&self) -> &[PropertyMap] {
        &self.results
    }

    // ============ Dependencies ============

    /// Add a dependency edge: task `index` requires task `depends_on` first.
    ///
    /// Rejected (returns false, state untouched) for out-of-range indices,
    /// self-edges, and edges that would close a cycle.
    pub fn add_dependency(&mut self, index: usize, depends_on: usize) -> bool {
        if index >= self.len() || depends_on >= self.len() || index == depends_on {
            return false;
        }
        if self.reaches(depends_on, index) {
            tracing::warn!(
                task_index = index,
                depends_on = depends_on,
                "dependency rejected: would create a cycle"
            );
            return false;
        }
        self.dependencies[index].insert(depends_on);
        true
    }

    /// Dependency set of a task slot.
    pub fn dependencies_of(&self, index: usize) -> Option<&BTreeSet<usize>> {
        self.dependencies.get(index)
    }

    /// True iff every dependency index is strictly below the cursor.
    pub fn are_dependencies_satisfied(&self, index: usize) -> bool {
        match self.dependencies.get(index) {
            Some(deps) => deps.iter().all(|&dep| dep < self.current_task_index),
            None => false,
        }
    }

    /// DFS over dependency edges: can `from` reach `target`?
    fn reaches(&self, from: usize, target: usize) -> bool {
        let mut stack = vec![from];
        let mut visited = BTreeSet::new();
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(deps) = self.dependencies.get(node) {
                stack.extend(deps.iter().copied());
            }
        }
        false
    }

    // ============ Structural operations ============

    /// Append another plan's tasks, shifting its dependency edges and rows.
    ///
    /// Keeps this plan's cursor and status; costs are summed.
    pub fn merge(&mut self, other: Plan) {
        let offset = self.len();
        self.total_cost += other.total_cost;
        self.tasks.extend(other.tasks);
        self.refs.extend(other.refs);
        self.parameters.extend(other.parameters);
        self.results.extend(other.results);
        self.dependencies.extend(
            other
                .dependencies
                .into_iter()
                .map(|deps| deps.into_iter().map(|d| d + offset).collect()),
        );
    }

    /// Extract a sub-plan covering `range`.
    ///
    /// Dependency edges crossing the boundary are dropped; the rest are
    /// re-indexed. The extracted plan starts fresh (NotStarted, cursor 0).
    pub fn extract(&self, range: Range<usize>) -> Plan {
        let mut out = Plan::new();
        if range.start >= range.end || range.end > self.len() {
            return out;
        }
        for i in range.clone() {
            out.tasks.push(self.tasks[i].clone());
            out.refs.push(self.refs[i].clone());
            out.parameters.push(self.parameters[i].clone());
            out.results.push(self.results[i].clone());
            out.total_cost += self.refs[i].cost;
            out.dependencies.push(
                self.dependencies[i]
                    .iter()
                    .filter(|&&d| range.contains(&d))
                    .map(|&d| d - range.start)
                    .collect(),
            );
        }
        out.execution = self.execution;
        out
    }

    /// Replace `range` with another plan's tasks.
    ///
    /// Rejected (returns false, state untouched) for an invalid range.
    /// Surviving edges are re-indexed; edges into the removed section are
    /// dropped, and the replacement's internal edges are shifted into place.
    pub fn replace_section(&mut self, range: Range<usize>, replacement: Plan) -> bool {
        if range.start > range.end || range.end > self.len() {
            return false;
        }
        let removed = range.end - range.start;
        let inserted = replacement.len();
        let remap = |old: usize| -> Option<usize> {
            if old < range.start {
                Some(old)
            } else if old < range.end {
                None
            } else {
                Some(old - removed + inserted)
            }
        };

        let mut tasks = Vec::with_capacity(self.len() - removed + inserted);
        let mut refs = Vec::with_capacity(tasks.capacity());
        let mut parameters = Vec::with_capacity(tasks.capacity());
        let mut results = Vec::with_capacity(tasks.capacity());
        let mut dependencies: Vec<BTreeSet<usize>> = Vec::with_capacity(tasks.capacity());

        let push_kept = |i: usize,
                         tasks: &mut Vec<Arc<dyn PrimitiveTask>>,
                         refs: &mut Vec<TaskRef>,
                         parameters: &mut Vec<PropertyMap>,
                         results: &mut Vec<PropertyMap>,
                         dependencies: &mut Vec<BTreeSet<usize>>| {
            tasks.push(self.tasks[i].clone());
            refs.push(self.refs[i].clone());
            parameters.push(self.parameters[i].clone());
            results.push(self.results[i].clone());
            dependencies.push(
                self.dependencies[i]
                    .iter()
                    .filter_map(|&d| remap(d))
                    .collect(),
            );
        };

        for i in 0..range.start {
            push_kept(
                i,
                &mut tasks,
                &mut refs,
                &mut parameters,
                &mut results,
                &mut dependencies,
            );
        }
        for i in 0..inserted {
            tasks.push(replacement.tasks[i].clone());
            refs.push(replacement.refs[i].clone());
            parameters.push(replacement.parameters[i].clone());
            results.push(replacement.results[i].clone());
            dependencies.push(
                replacement.dependencies[i]
                    .iter()
                    .map(|&d| d + range.start)
                    .collect(),
            );
        }
        for i in range.end..self.len() {
            push_kept(
                i,
                &mut tasks,
                &mut refs,
                &mut parameters,
                &mut results,
                &mut dependencies,
            );
        }

        self.tasks = tasks;
        self.refs = refs;
        self.parameters = parameters;
        self.results = results;
        self.dependencies = dependencies;
        self.total_cost = self.refs.iter().map(|r| r.cost).sum();
        self.current_task_index = self.current_task_index.min(self.len());
        true
    }

    /// Reset execution bookkeeping: cursor, status, and results.
    pub fn reset(&mut self) {
        self.current_task_index = 0;
        self.status = PlanStatus::NotStarted;
        for row in &mut self.results {
            row.clear();
        }
    }

    pub(crate) fn restore_from_record_parts(
        tasks: Vec<Arc<dyn PrimitiveTask>>,
        refs: Vec<TaskRef>,
        total_cost: f64,
        current_task_index: usize,
        status: PlanStatus,
        parameters: Vec<PropertyMap>,
        results: Vec<PropertyMap>,
        dependencies: Vec<BTreeSet<usize>>,
        execution: PlanExecutionSettings,
    ) -> Self {
        Self {
            tasks,
            refs,
            total_cost,
            current_task_index,
            status,
            parameters,
            results,
            dependencies,
            execution,
        }
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("tasks", &self.refs.iter().map(|r| &r.name).collect::<Vec<_>>())
            .field("total_cost", &self.total_cost)
            .field("current_task_index", &self.current_task_index)
            .field("status", &self.status)
            .finish()
    }
}
