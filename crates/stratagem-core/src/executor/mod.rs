//! Plan executor
//!
//! A tick-driven state machine that runs a plan's primitive tasks against a
//! live world state. The host owns the loop and calls `advance(dt)`; nothing
//! here schedules itself. "Parallel" means logically concurrent task starts
//! within one tick, not threads.
//!
//! Per task the lifecycle is: `execute` once, `tick` every step while
//! `InProgress`, then exactly one of `end` (normal terminal) or `abort`
//! (forced stop, timeout included). A task's declared effects hit the live
//! world state exactly once, at the moment it reports success.

pub mod events;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::TaskStatus;
use crate::types::{ExecutionContext, Plan, PlanExecutionSettings, PlanStatus};

pub use events::{CollectingObserver, ExecutionEvent, ExecutionObserver};

/// Scheduling discipline for a plan's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One task at a time, in plan order.
    #[default]
    Sequential,
    /// Every task whose preconditions hold starts together.
    Parallel,
    /// Like Parallel, gated additionally on declared task dependencies.
    DependencyBased,
}

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub mode: ExecutionMode,
    /// Fail the whole plan on the first task failure.
    pub abort_on_task_failure: bool,
    /// Wall-clock budget per task; zero means unbounded.
    pub max_task_execution_time: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            abort_on_task_failure: false,
            max_task_execution_time: Duration::ZERO,
        }
    }
}

/// Executor lifecycle state.
///
/// Idle → Executing → {Completed, Failed, Aborted}, with Executing ⇄ Paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorState {
    #[default]
    Idle,
    Executing,
    Paused,
    Completed,
    Failed,
    Aborted,
}

impl ExecutorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor is already running a plan")]
    AlreadyExecuting,
    #[error("plan is not hydrated; rebuild its tasks through a task registry")]
    UnhydratedPlan,
    #[error("cannot {action} while executor is {state:?}")]
    InvalidState {
        action: &'static str,
        state: ExecutorState,
    },
}

/// Per-slot progress, tracked separately from the shared task objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl SlotState {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    index: usize,
    started_at: Instant,
}

/// Runs one plan at a time to a terminal state.
///
/// Owns the plan and the live world state (inside the context) for the
/// duration of a start/finish cycle; the caller reclaims both with
/// `take_plan` / `take_context` afterwards.
#[derive(Default)]
pub struct PlanExecutor {
    config: ExecutorConfig,
    state: ExecutorState,
    plan: Option<Plan>,
    context: Option<ExecutionContext>,
    slots: Vec<SlotState>,
    in_flight: Vec<InFlight>,
    observers: Vec<Box<dyn ExecutionObserver>>,
}

impl PlanExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn add_observer(&mut self, observer: impl ExecutionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn context(&self) -> Option<&ExecutionContext> {
        self.context.as_ref()
    }

    /// Reclaim the plan; leaves the executor without one.
    pub fn take_plan(&mut self) -> Option<Plan> {
        self.plan.take()
    }

    /// Reclaim the context (and the live world state inside it).
    pub fn take_context(&mut self) -> Option<ExecutionContext> {
        self.context.take()
    }

    /// Begin executing a plan.
    ///
    /// Rejects when a plan is already running or when the plan is unhydrated.
    /// Tasks before the plan's cursor are treated as already done, so a plan
    /// restored mid-execution resumes where it left off. Instant tasks may
    /// drive the plan all the way to a terminal state before this returns.
    pub fn start_plan(
        &mut self,
        mut plan: Plan,
        context: ExecutionContext,
    ) -> Result<(), ExecutorError> {
        if matches!(self.state, ExecutorState::Executing | ExecutorState::Paused) {
            return Err(ExecutorError::AlreadyExecuting);
        }
        if !plan.is_hydrated() {
            return Err(ExecutorError::UnhydratedPlan);
        }

        plan.set_execution_settings(PlanExecutionSettings {
            mode: self.config.mode,
            abort_on_task_failure: self.config.abort_on_task_failure,
        });
        plan.set_status(PlanStatus::Executing);

        self.slots = vec![SlotState::Pending; plan.len()];
        for slot in self.slots.iter_mut().take(plan.current_task_index()) {
            *slot = SlotState::Succeeded;
        }
        self.in_flight.clear();
        tracing::info!(
            tasks = plan.len(),
            total_cost = plan.total_cost(),
            mode = ?self.config.mode,
            cursor = plan.current_task_index(),
            "plan started"
        );
        let event = ExecutionEvent::PlanStarted {
            tasks: plan.len(),
            total_cost: plan.total_cost(),
        };
        self.plan = Some(plan);
        self.context = Some(context);
        self.state = ExecutorState::Executing;
        self.emit(event);

        self.resolve_drain();
        Ok(())
    }

    /// One host-driven tick: timeout checks first, then one `tick` per
    /// in-flight task, then drain resolution. No-op unless Executing.
    pub fn advance(&mut self, dt: f64) {
        if self.state != ExecutorState::Executing {
            return;
        }

        if !self.config.max_task_execution_time.is_zero() {
            let budget = self.config.max_task_execution_time;
            let timed_out: Vec<InFlight> = self
                .in_flight
                .iter()
                .copied()
                .filter(|f| f.started_at.elapsed() >= budget)
                .collect();
            for flight in timed_out {
                if self.state != ExecutorState::Executing {
                    return;
                }
                self.fail_timed_out(flight);
            }
        }

        let indices: Vec<usize> = self.in_flight.iter().map(|f| f.index).collect();
        for index in indices {
            if self.state != ExecutorState::Executing {
                return;
            }
            // A sibling's settlement may have removed this task already.
            if !self.in_flight.iter().any(|f| f.index == index) {
                continue;
            }
            let status = self.call_tick(index, dt);
            if status.is_terminal() {
                self.settle_task(index, status);
            }
        }

        if self.state == ExecutorState::Executing && self.in_flight.is_empty() {
            self.resolve_drain();
        }
    }

    /// Stop ticking without resetting execution state.
    pub fn pause_plan(&mut self) -> Result<(), ExecutorError> {
        if self.state != ExecutorState::Executing {
            return Err(ExecutorError::InvalidState {
                action: "pause",
                state: self.state,
            });
        }
        self.state = ExecutorState::Paused;
        if let Some(plan) = self.plan.as_mut() {
            plan.set_status(PlanStatus::Paused);
        }
        tracing::info!("plan paused");
        self.emit(ExecutionEvent::PlanPaused);
        Ok(())
    }

    /// Restart ticking after a pause.
    pub fn resume_plan(&mut self) -> Result<(), ExecutorError> {
        if self.state != ExecutorState::Paused {
            return Err(ExecutorError::InvalidState {
                action: "resume",
                state: self.state,
            });
        }
        self.state = ExecutorState::Executing;
        if let Some(plan) = self.plan.as_mut() {
            plan.set_status(PlanStatus::Executing);
        }
        tracing::info!("plan resumed");
        self.emit(ExecutionEvent::PlanResumed);
        Ok(())
    }

    /// Force-abort every in-flight task and transition to Aborted.
    ///
    /// With `fail_tasks` set, each aborted task is additionally reported as
    /// failed.
    pub fn abort_plan(&mut self, fail_tasks: bool) -> Result<(), ExecutorError> {
        if !matches!(self.state, ExecutorState::Executing | ExecutorState::Paused) {
            return Err(ExecutorError::InvalidState {
                action: "abort",
                state: self.state,
            });
        }
        self.abort_in_flight(fail_tasks);
        tracing::warn!(fail_tasks, "plan aborted");
        self.finish(PlanStatus::Aborted);
        Ok(())
    }

    // ============ Scheduling ============

    /// While nothing is in flight, start whatever the mode allows; settle
    /// instant tasks synchronously. Decides completion once nothing new can
    /// start.
    fn resolve_drain(&mut self) {
        loop {
            if self.state != ExecutorState::Executing || !self.in_flight.is_empty() {
                return;
            }
            let started = self.schedule();
            if self.state != ExecutorState::Executing {
                return;
            }
            if started == 0 {
                if self.slots.iter().all(|s| s.is_terminal()) {
                    self.finish(self.completion_status());
                } else {
                    tracing::warn!(
                        pending = self.slots.iter().filter(|s| !s.is_terminal()).count(),
                        "plan failed: remaining tasks cannot start"
                    );
                    self.finish(PlanStatus::Failed);
                }
                return;
            }
        }
    }

    /// Start every task the current mode deems runnable. Returns how many
    /// were started.
    fn schedule(&mut self) -> usize {
        let candidates = self.runnable_tasks();
        let mut started = 0;
        for index in candidates {
            if self.state != ExecutorState::Executing {
                break;
            }
            if self.slots[index] != SlotState::Pending {
                continue;
            }
            self.start_task(index);
            started += 1;
        }
        started
    }

    fn runnable_tasks(&self) -> Vec<usize> {
        let Some(plan) = self.plan.as_ref() else {
            return Vec::new();
        };
        let world = self.context.as_ref().map(|c| &c.world_state);
        match self.config.mode {
            ExecutionMode::Sequential => {
                let cursor = plan.current_task_index();
                if self.in_flight.is_empty()
                    && cursor < plan.len()
                    && self.slots[cursor] == SlotState::Pending
                {
                    vec![cursor]
                } else {
                    Vec::new()
                }
            }
            ExecutionMode::Parallel => (0..plan.len())
                .filter(|&i| self.slots[i] == SlotState::Pending)
                .filter(|&i| {
                    plan.task(i)
                        .zip(world)
                        .is_some_and(|(t, w)| t.is_applicable(w))
                })
                .collect(),
            ExecutionMode::DependencyBased => (0..plan.len())
                .filter(|&i| self.slots[i] == SlotState::Pending)
                .filter(|&i| self.slot_dependencies_settled(plan, i))
                .filter(|&i| {
                    plan.task(i)
                        .zip(world)
                        .is_some_and(|(t, w)| t.is_applicable(w))
                })
                .collect(),
        }
    }

    /// Every dependency slot has reached a terminal state.
    ///
    /// Edges may point at later plan slots, so this checks slot outcomes
    /// directly rather than comparing against the cursor.
    fn slot_dependencies_settled(&self, plan: &Plan, index: usize) -> bool {
        match plan.dependencies_of(index) {
            Some(deps) => deps
                .iter()
                .all(|&dep| self.slots.get(dep).is_some_and(|s| s.is_terminal())),
            None => false,
        }
    }

    fn start_task(&mut self, index: usize) {
        self.slots[index] = SlotState::Running;
        self.in_flight.push(InFlight {
            index,
            started_at: Instant::now(),
        });
        let name = self.task_name(index);
        tracing::debug!(task_index = index, task = %name, "task started");
        self.emit(ExecutionEvent::TaskStarted { index, name });

        let status = self.call_execute(index);
        if status.is_terminal() {
            self.settle_task(index, status);
        }
    }

    // ============ Settlement ============

    /// A task left `InProgress`: run `end`, commit effects on success, record
    /// the outcome, advance the cursor, and apply the failure policy.
    fn settle_task(&mut self, index: usize, status: TaskStatus) {
        self.in_flight.retain(|f| f.index != index);
        self.call_end(index, status);
        let name = self.task_name(index);

        if status == TaskStatus::Succeeded {
            self.apply_task_effects(index);
            self.slots[index] = SlotState::Succeeded;
            tracing::debug!(task_index = index, task = %name, "task succeeded");
            self.emit(ExecutionEvent::TaskSucceeded { index, name });
            self.advance_cursor();
        } else {
            self.slots[index] = SlotState::Failed;
            tracing::warn!(task_index = index, task = %name, "task failed");
            self.emit(ExecutionEvent::TaskFailed { index, name });
            self.advance_cursor();
            if self.config.abort_on_task_failure {
                self.abort_in_flight(false);
                self.finish(PlanStatus::Failed);
            }
        }
    }

    /// Timeout: the task is aborted rather than ended, then treated as a
    /// failure.
    fn fail_timed_out(&mut self, flight: InFlight) {
        let index = flight.index;
        let elapsed = flight.started_at.elapsed();
        self.in_flight.retain(|f| f.index != index);
        self.call_abort(index);
        self.slots[index] = SlotState::Failed;
        let name = self.task_name(index);
        tracing::warn!(
            task_index = index,
            task = %name,
            elapsed_ms = elapsed.as_millis() as u64,
            "task timed out"
        );
        self.emit(ExecutionEvent::TaskTimedOut {
            index,
            name: name.clone(),
            elapsed,
        });
        self.emit(ExecutionEvent::TaskFailed { index, name });
        self.advance_cursor();
        if self.config.abort_on_task_failure {
            self.abort_in_flight(false);
            self.finish(PlanStatus::Failed);
        }
    }

    fn abort_in_flight(&mut self, fail_tasks: bool) {
        let indices: Vec<usize> = self.in_flight.drain(..).map(|f| f.index).collect();
        for index in indices {
            self.call_abort(index);
            let name = self.task_name(index);
            tracing::debug!(task_index = index, task = %name, "task aborted");
            if fail_tasks {
                self.slots[index] = SlotState::Failed;
                self.emit(ExecutionEvent::TaskFailed { index, name });
            } else {
                self.slots[index] = SlotState::Aborted;
            }
        }
    }

    /// Move the plan cursor past the contiguous run of settled tasks.
    fn advance_cursor(&mut self) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        while plan.current_task_index() < plan.len()
            && self.slots[plan.current_task_index()].is_terminal()
        {
            plan.advance();
        }
    }

    /// Drain-based modes fail the plan when any task failed; Sequential
    /// reaches completion only by skipping failures, so it completes.
    fn completion_status(&self) -> PlanStatus {
        let any_failed = self.slots.iter().any(|s| *s == SlotState::Failed);
        match self.config.mode {
            ExecutionMode::Sequential => PlanStatus::Completed,
            _ if any_failed => PlanStatus::Failed,
            _ => PlanStatus::Completed,
        }
    }

    fn finish(&mut self, outcome: PlanStatus) {
        if let Some(plan) = self.plan.as_mut() {
            plan.set_status(outcome);
        }
        let (state, event) = match outcome {
            PlanStatus::Completed => (ExecutorState::Completed, ExecutionEvent::PlanCompleted),
            PlanStatus::Failed => (ExecutorState::Failed, ExecutionEvent::PlanFailed),
            _ => (ExecutorState::Aborted, ExecutionEvent::PlanAborted),
        };
        self.state = state;
        tracing::info!(status = ?outcome, "plan finished");
        self.emit(event);
    }

    // ============ Task call plumbing ============
    //
    // Each call re-borrows plan/context/memory for just the trait call so the
    // observer list stays free for event emission afterwards.

    fn call_execute(&mut self, index: usize) -> TaskStatus {
        let Some(plan) = self.plan.as_mut() else {
            return TaskStatus::Failed;
        };
        let Some(task) = plan.task(index).cloned() else {
            return TaskStatus::Failed;
        };
        let Some(ctx) = self.context.as_mut() else {
            return TaskStatus::Failed;
        };
        let Some(memory) = plan.parameter_row_mut(index) else {
            return TaskStatus::Failed;
        };
        task.execute(ctx, memory)
    }

    fn call_tick(&mut self, index: usize, dt: f64) -> TaskStatus {
        let Some(plan) = self.plan.as_mut() else {
            return TaskStatus::Failed;
        };
        let Some(task) = plan.task(index).cloned() else {
            return TaskStatus::Failed;
        };
        let Some(ctx) = self.context.as_mut() else {
            return TaskStatus::Failed;
        };
        let Some(memory) = plan.parameter_row_mut(index) else {
            return TaskStatus::Failed;
        };
        task.tick(ctx, dt, memory)
    }

    fn call_end(&mut self, index: usize, status: TaskStatus) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        let Some(task) = plan.task(index).cloned() else {
            return;
        };
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if let Some(memory) = plan.parameter_row_mut(index) {
            task.end(ctx, memory, status);
        }
    }

    fn call_abort(&mut self, index: usize) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        let Some(task) = plan.task(index).cloned() else {
            return;
        };
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if let Some(memory) = plan.parameter_row_mut(index) {
            task.abort(ctx, memory);
        }
    }

    fn apply_task_effects(&mut self, index: usize) {
        let Some(plan) = self.plan.as_ref() else {
            return;
        };
        let Some(task) = plan.task(index).cloned() else {
            return;
        };
        if let Some(ctx) = self.context.as_mut() {
            task.apply_effects(&mut ctx.world_state);
        }
    }

    fn task_name(&self, index: usize) -> String {
        self.plan
            .as_ref()
            .and_then(|p| p.task_ref(index))
            .map(|r| r.name.clone())
            .unwrap_or_default()
    }

    fn emit(&mut self, event: ExecutionEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}

impl std::fmt::Debug for PlanExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("state", &self.state)
            .field("mode", &self.config.mode)
            .field("in_flight", &self.in_flight.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::task::{Effect, FnCondition, FnEffect, PrimitiveTask, TaskProfile};
    use crate::types::{Name, ObjectRef, PropertyMap, PropertyValue, WorldState};

    /// Succeeds after `ticks` calls to `tick` (instantly when zero). Records
    /// lifecycle calls in its memory row.
    struct StepTask {
        profile: TaskProfile,
        ticks: i64,
    }

    impl StepTask {
        fn shared(name: &str, ticks: i64) -> Arc<dyn PrimitiveTask> {
            Arc::new(Self {
                profile: TaskProfile::new(name, ""),
                ticks,
            })
        }

        fn with_profile(profile: TaskProfile, ticks: i64) -> Arc<dyn PrimitiveTask> {
            Arc::new(Self { profile, ticks })
        }
    }

    impl PrimitiveTask for StepTask {
        fn profile(&self) -> &TaskProfile {
            &self.profile
        }

        fn class_path(&self) -> &str {
            "stratagem.test.StepTask"
        }

        fn execute(&self, _ctx: &mut ExecutionContext, memory: &mut PropertyMap) -> TaskStatus {
            if self.ticks <= 0 {
                return TaskStatus::Succeeded;
            }
            memory.insert("remaining".into(), PropertyValue::Int(self.ticks));
            TaskStatus::InProgress
        }

        fn tick(
            &self,
            _ctx: &mut ExecutionContext,
            _dt: f64,
            memory: &mut PropertyMap,
        ) -> TaskStatus {
            let remaining = memory
                .get(&Name::from("remaining"))
                .map(|v| v.as_int_or(0))
                .unwrap_or(0)
                - 1;
            memory.insert("remaining".into(), PropertyValue::Int(remaining));
            if remaining <= 0 {
                TaskStatus::Succeeded
            } else {
                TaskStatus::InProgress
            }
        }

        fn end(&self, _ctx: &mut ExecutionContext, memory: &mut PropertyMap, _status: TaskStatus) {
            let calls = memory
                .get(&Name::from("end_calls"))
                .map(|v| v.as_int_or(0))
                .unwrap_or(0);
            memory.insert("end_calls".into(), PropertyValue::Int(calls + 1));
        }

        fn abort(&self, _ctx: &mut ExecutionContext, memory: &mut PropertyMap) {
            memory.insert("aborted".into(), PropertyValue::Bool(true));
        }
    }

    struct FailTask {
        profile: TaskProfile,
    }

    impl FailTask {
        fn shared(name: &str) -> Arc<dyn PrimitiveTask> {
            Arc::new(Self {
                profile: TaskProfile::new(name, ""),
            })
        }
    }

    impl PrimitiveTask for FailTask {
        fn profile(&self) -> &TaskProfile {
            &self.profile
        }

        fn class_path(&self) -> &str {
            "stratagem.test.FailTask"
        }

        fn execute(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) -> TaskStatus {
            TaskStatus::Failed
        }
    }

    fn flag_is(key: &'static str, expected: bool) -> Arc<dyn crate::task::Condition> {
        Arc::new(FnCondition::new(format!("{key} == {expected}"), move |ws| {
            ws.get_property(key).map(|v| v.as_bool_or(!expected)) == Some(expected)
        }))
    }

    fn set_flag(key: &'static str, value: bool) -> Arc<dyn Effect> {
        Arc::new(FnEffect::new(format!("{key} := {value}"), move |ws| {
            ws.set_property(key, value)
        }))
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(ObjectRef(7), WorldState::new())
    }

    fn executor_with_observer(config: ExecutorConfig) -> (PlanExecutor, CollectingObserver) {
        let mut executor = PlanExecutor::new(config);
        let observer = CollectingObserver::new();
        executor.add_observer(observer.clone());
        (executor, observer)
    }

    fn task_event_names(events: &[ExecutionEvent]) -> Vec<(&'static str, usize)> {
        events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::TaskStarted { index, .. } => Some(("started", *index)),
                ExecutionEvent::TaskSucceeded { index, .. } => Some(("succeeded", *index)),
                ExecutionEvent::TaskFailed { index, .. } => Some(("failed", *index)),
                ExecutionEvent::TaskTimedOut { index, .. } => Some(("timed_out", *index)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_sequential_instant_tasks_complete_within_start() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("a", 0));
        plan.add_task(StepTask::shared("b", 0));

        let (mut executor, observer) = executor_with_observer(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();

        assert_eq!(executor.state(), ExecutorState::Completed);
        let plan = executor.take_plan().unwrap();
        assert_eq!(plan.status(), PlanStatus::Completed);
        assert_eq!(plan.current_task_index(), 2);
        assert_eq!(
            task_event_names(&observer.events()),
            vec![
                ("started", 0),
                ("succeeded", 0),
                ("started", 1),
                ("succeeded", 1)
            ]
        );
        assert_eq!(
            observer.events().last(),
            Some(&ExecutionEvent::PlanCompleted)
        );
    }

    #[test]
    fn test_multi_tick_task_needs_advance_and_ends_once() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("slow", 2));

        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();
        assert_eq!(executor.state(), ExecutorState::Executing);

        executor.advance(0.1);
        assert_eq!(executor.state(), ExecutorState::Executing);
        executor.advance(0.1);
        assert_eq!(executor.state(), ExecutorState::Completed);

        let plan = executor.take_plan().unwrap();
        assert_eq!(plan.parameter(0, "end_calls"), Some(&PropertyValue::Int(1)));
    }

    #[test]
    fn test_sequential_failure_skipped_plan_completes() {
        // A failed task advances the cursor and the plan still completes.
        let mut plan = Plan::new();
        plan.add_task(FailTask::shared("doomed"));

        let (mut executor, observer) = executor_with_observer(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();

        assert_eq!(executor.state(), ExecutorState::Completed);
        let plan = executor.take_plan().unwrap();
        assert_eq!(plan.status(), PlanStatus::Completed);
        assert_eq!(plan.current_task_index(), 1);
        assert!(observer
            .events()
            .contains(&ExecutionEvent::TaskFailed { index: 0, name: "doomed".into() }));
    }

    #[test]
    fn test_abort_on_task_failure_fails_plan_and_skips_rest() {
        let mut plan = Plan::new();
        plan.add_task(FailTask::shared("doomed"));
        plan.add_task(StepTask::shared("never", 0));

        let config = ExecutorConfig {
            abort_on_task_failure: true,
            ..ExecutorConfig::default()
        };
        let (mut executor, observer) = executor_with_observer(config);
        executor.start_plan(plan, context()).unwrap();

        assert_eq!(executor.state(), ExecutorState::Failed);
        assert_eq!(
            executor.take_plan().unwrap().status(),
            PlanStatus::Failed
        );
        let events = observer.events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::TaskStarted { index: 1, .. })));
        assert_eq!(events.last(), Some(&ExecutionEvent::PlanFailed));
    }

    #[test]
    fn test_effects_commit_once_at_success() {
        let bump = FnEffect::new("count += 1", |ws: &mut WorldState| {
            let count = ws.get_property_or_invalid("count").as_int_or(0);
            ws.set_property("count", count + 1);
        });
        let profile = TaskProfile::new("worker", "").with_effect(Arc::new(bump));
        let mut plan = Plan::new();
        plan.add_task(StepTask::with_profile(profile, 2));

        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();

        executor.advance(0.1);
        let mid = executor.context().unwrap().world_state.clone();
        assert_eq!(mid.get_property("count"), None);

        executor.advance(0.1);
        assert_eq!(executor.state(), ExecutorState::Completed);
        let world = executor.take_context().unwrap().world_state;
        assert_eq!(world.get_property("count"), Some(&PropertyValue::Int(1)));
    }

    #[test]
    fn test_parallel_tasks_start_in_the_same_tick() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("left", 1));
        plan.add_task(StepTask::shared("right", 1));

        let config = ExecutorConfig {
            mode: ExecutionMode::Parallel,
            ..ExecutorConfig::default()
        };
        let (mut executor, observer) = executor_with_observer(config);
        executor.start_plan(plan, context()).unwrap();

        // Both started before either finished.
        assert_eq!(
            task_event_names(&observer.events()),
            vec![("started", 0), ("started", 1)]
        );

        executor.advance(0.1);
        assert_eq!(executor.state(), ExecutorState::Completed);
    }

    #[test]
    fn test_parallel_unstartable_task_fails_plan() {
        let gated = TaskProfile::new("gated", "").with_precondition(flag_is("open", true));
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("free", 0));
        plan.add_task(StepTask::with_profile(gated, 0));

        let config = ExecutorConfig {
            mode: ExecutionMode::Parallel,
            ..ExecutorConfig::default()
        };
        let mut executor = PlanExecutor::new(config);
        executor.start_plan(plan, context()).unwrap();

        assert_eq!(executor.state(), ExecutorState::Failed);
    }

    #[test]
    fn test_parallel_gated_task_starts_once_effect_lands() {
        let opener = TaskProfile::new("opener", "").with_effect(set_flag("open", true));
        let gated = TaskProfile::new("gated", "").with_precondition(flag_is("open", true));
        let mut plan = Plan::new();
        plan.add_task(StepTask::with_profile(opener, 0));
        plan.add_task(StepTask::with_profile(gated, 0));

        let config = ExecutorConfig {
            mode: ExecutionMode::Parallel,
            ..ExecutorConfig::default()
        };
        let (mut executor, observer) = executor_with_observer(config);
        executor.start_plan(plan, context()).unwrap();

        assert_eq!(executor.state(), ExecutorState::Completed);
        assert_eq!(
            task_event_names(&observer.events()),
            vec![
                ("started", 0),
                ("succeeded", 0),
                ("started", 1),
                ("succeeded", 1)
            ]
        );
    }

    #[test]
    fn test_dependency_mode_respects_declared_order() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("second", 0));
        plan.add_task(StepTask::shared("first", 0));
        // Slot 0 must wait for slot 1.
        assert!(plan.add_dependency(0, 1));

        let config = ExecutorConfig {
            mode: ExecutionMode::DependencyBased,
            ..ExecutorConfig::default()
        };
        let (mut executor, observer) = executor_with_observer(config);
        executor.start_plan(plan, context()).unwrap();

        assert_eq!(executor.state(), ExecutorState::Completed);
        let starts: Vec<usize> = observer
            .events()
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::TaskStarted { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![1, 0]);
    }

    #[test]
    fn test_dependency_mode_forward_edge_waits_for_slow_dependency() {
        // Slot 0 depends on a later, multi-tick slot: it must stay pending
        // until the dependency settles, then start on the drain.
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("second", 0));
        plan.add_task(StepTask::shared("first", 2));
        assert!(plan.add_dependency(0, 1));

        let config = ExecutorConfig {
            mode: ExecutionMode::DependencyBased,
            ..ExecutorConfig::default()
        };
        let (mut executor, observer) = executor_with_observer(config);
        executor.start_plan(plan, context()).unwrap();
        assert_eq!(executor.state(), ExecutorState::Executing);

        executor.advance(0.1);
        assert!(!observer
            .events()
            .iter()
            .any(|e| matches!(e, ExecutionEvent::TaskStarted { index: 0, .. })));

        executor.advance(0.1);
        assert_eq!(executor.state(), ExecutorState::Completed);
        let starts: Vec<usize> = observer
            .events()
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::TaskStarted { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![1, 0]);
    }

    #[test]
    fn test_timeout_aborts_task_and_reports_timeout() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("stuck", i64::MAX));

        let config = ExecutorConfig {
            max_task_execution_time: Duration::from_nanos(1),
            ..ExecutorConfig::default()
        };
        let (mut executor, observer) = executor_with_observer(config);
        executor.start_plan(plan, context()).unwrap();
        assert_eq!(executor.state(), ExecutorState::Executing);

        std::thread::sleep(Duration::from_millis(1));
        executor.advance(0.1);

        // Sequential mode skips the failure and completes.
        assert_eq!(executor.state(), ExecutorState::Completed);
        let events = observer.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::TaskTimedOut { index: 0, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::TaskFailed { index: 0, .. })));
        let plan = executor.take_plan().unwrap();
        assert_eq!(plan.parameter(0, "aborted"), Some(&PropertyValue::Bool(true)));
        // Aborted, never ended.
        assert_eq!(plan.parameter(0, "end_calls"), None);
    }

    #[test]
    fn test_pause_stops_ticking_resume_restarts() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("slow", 1));

        let (mut executor, observer) = executor_with_observer(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();

        executor.pause_plan().unwrap();
        assert_eq!(executor.state(), ExecutorState::Paused);
        executor.advance(0.1);
        assert_eq!(
            executor.plan().unwrap().parameter(0, "remaining"),
            Some(&PropertyValue::Int(1))
        );

        executor.resume_plan().unwrap();
        executor.advance(0.1);
        assert_eq!(executor.state(), ExecutorState::Completed);

        let events = observer.events();
        assert!(events.contains(&ExecutionEvent::PlanPaused));
        assert!(events.contains(&ExecutionEvent::PlanResumed));
    }

    #[test]
    fn test_abort_plan_aborts_in_flight_tasks() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("stuck", i64::MAX));

        let (mut executor, observer) = executor_with_observer(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();
        executor.abort_plan(true).unwrap();

        assert_eq!(executor.state(), ExecutorState::Aborted);
        let plan = executor.take_plan().unwrap();
        assert_eq!(plan.status(), PlanStatus::Aborted);
        assert_eq!(plan.parameter(0, "aborted"), Some(&PropertyValue::Bool(true)));
        let events = observer.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::TaskFailed { index: 0, .. })));
        assert_eq!(events.last(), Some(&ExecutionEvent::PlanAborted));
    }

    #[test]
    fn test_start_rejected_while_executing() {
        let mut plan = Plan::new();
        plan.add_task(StepTask::shared("slow", 5));

        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();

        let mut other = Plan::new();
        other.add_task(StepTask::shared("other", 0));
        assert!(matches!(
            executor.start_plan(other, context()),
            Err(ExecutorError::AlreadyExecuting)
        ));
    }

    #[test]
    fn test_unhydrated_plan_rejected() {
        let refs = vec![crate::types::TaskRef {
            id: uuid::Uuid::new_v4(),
            class_path: "stratagem.test.StepTask".to_string(),
            name: "ghost".to_string(),
            cost: 1.0,
        }];
        let plan = Plan::restore_from_record_parts(
            Vec::new(),
            refs,
            1.0,
            0,
            PlanStatus::NotStarted,
            vec![PropertyMap::new()],
            vec![PropertyMap::new()],
            vec![Default::default()],
            PlanExecutionSettings::default(),
        );

        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        assert!(matches!(
            executor.start_plan(plan, context()),
            Err(ExecutorError::UnhydratedPlan)
        ));
        assert_eq!(executor.state(), ExecutorState::Idle);
    }

    #[test]
    fn test_empty_plan_completes_immediately() {
        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        executor.start_plan(Plan::new(), context()).unwrap();
        assert_eq!(executor.state(), ExecutorState::Completed);
    }

    #[test]
    fn test_pause_rejected_when_idle() {
        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        assert!(matches!(
            executor.pause_plan(),
            Err(ExecutorError::InvalidState { action: "pause", .. })
        ));
    }
}
