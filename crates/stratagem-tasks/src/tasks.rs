//! Reusable primitive tasks.

use std::sync::Arc;

use stratagem_core::task::{Condition, Effect, PrimitiveTask, TaskProfile, TaskStatus};
use stratagem_core::types::{ExecutionContext, Name, PropertyMap, PropertyValue};

/// Succeeds immediately and does nothing. Useful as a plan placeholder.
#[derive(Debug)]
pub struct NoopTask {
    profile: TaskProfile,
}

impl NoopTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            profile: TaskProfile::new(name, "does nothing"),
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.profile = self.profile.with_cost(cost);
        self
    }
}

impl PrimitiveTask for NoopTask {
    fn profile(&self) -> &TaskProfile {
        &self.profile
    }

    fn class_path(&self) -> &str {
        "stratagem.tasks.Noop"
    }

    fn execute(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) -> TaskStatus {
        TaskStatus::Succeeded
    }
}

/// Succeeds immediately; exists to carry declared effects into the world
/// state (the executor commits them at success).
#[derive(Debug)]
pub struct ApplyEffectsTask {
    profile: TaskProfile,
}

impl ApplyEffectsTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            profile: TaskProfile::new(name, "applies its declared effects"),
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.profile = self.profile.with_cost(cost);
        self
    }

    pub fn with_precondition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.profile = self.profile.with_precondition(condition);
        self
    }

    pub fn with_effect(mut self, effect: Arc<dyn Effect>) -> Self {
        self.profile = self.profile.with_effect(effect);
        self
    }
}

impl PrimitiveTask for ApplyEffectsTask {
    fn profile(&self) -> &TaskProfile {
        &self.profile
    }

    fn class_path(&self) -> &str {
        "stratagem.tasks.ApplyEffects"
    }

    fn execute(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) -> TaskStatus {
        TaskStatus::Succeeded
    }
}

/// Waits out a duration (in seconds of tick time) before succeeding.
///
/// Elapsed time accumulates in task memory, so a persisted-and-resumed plan
/// continues the wait rather than restarting it.
#[derive(Debug)]
pub struct DelayTask {
    profile: TaskProfile,
    duration: f64,
}

impl DelayTask {
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        Self {
            profile: TaskProfile::new(name, "waits for a duration"),
            duration,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.profile = self.profile.with_cost(cost);
        self
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl PrimitiveTask for DelayTask {
    fn profile(&self) -> &TaskProfile {
        &self.profile
    }

    fn class_path(&self) -> &str {
        "stratagem.tasks.Delay"
    }

    fn execute(&self, _ctx: &mut ExecutionContext, memory: &mut PropertyMap) -> TaskStatus {
        if self.duration <= 0.0 {
            return TaskStatus::Succeeded;
        }
        memory
            .entry("elapsed".into())
            .or_insert(PropertyValue::Float(0.0));
        TaskStatus::InProgress
    }

    fn tick(&self, _ctx: &mut ExecutionContext, dt: f64, memory: &mut PropertyMap) -> TaskStatus {
        let elapsed = memory
            .get(&Name::from("elapsed"))
            .map(|v| v.as_float_or(0.0))
            .unwrap_or(0.0)
            + dt;
        memory.insert("elapsed".into(), PropertyValue::Float(elapsed));
        if elapsed >= self.duration {
            tracing::debug!(task = self.name(), elapsed, "delay finished");
            TaskStatus::Succeeded
        } else {
            TaskStatus::InProgress
        }
    }
}

/// Fails immediately. Exercises failure paths in plans and tests.
#[derive(Debug)]
pub struct FailTask {
    profile: TaskProfile,
}

impl FailTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            profile: TaskProfile::new(name, "always fails"),
        }
    }
}

impl PrimitiveTask for FailTask {
    fn profile(&self) -> &TaskProfile {
        &self.profile
    }

    fn class_path(&self) -> &str {
        "stratagem.tasks.Fail"
    }

    fn execute(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) -> TaskStatus {
        TaskStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::SetPropertyEffect;
    use stratagem_core::executor::{ExecutorConfig, ExecutorState, PlanExecutor};
    use stratagem_core::types::{ObjectRef, Plan, WorldState};

    fn context() -> ExecutionContext {
        ExecutionContext::new(ObjectRef(1), WorldState::new())
    }

    #[test]
    fn test_noop_and_fail_report_their_statuses() {
        let mut ctx = context();
        let mut memory = PropertyMap::new();
        assert_eq!(
            NoopTask::new("idle").execute(&mut ctx, &mut memory),
            TaskStatus::Succeeded
        );
        assert_eq!(
            FailTask::new("doomed").execute(&mut ctx, &mut memory),
            TaskStatus::Failed
        );
    }

    #[test]
    fn test_apply_effects_task_lands_effects_via_executor() {
        let task = ApplyEffectsTask::new("raise_alarm")
            .with_effect(Arc::new(SetPropertyEffect::new("alarm", true)));
        let mut plan = Plan::new();
        plan.add_task(Arc::new(task));

        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();

        assert_eq!(executor.state(), ExecutorState::Completed);
        let world = executor.take_context().unwrap().world_state;
        assert_eq!(world.get_property("alarm"), Some(&PropertyValue::Bool(true)));
    }

    #[test]
    fn test_delay_task_waits_out_its_duration() {
        let mut plan = Plan::new();
        plan.add_task(Arc::new(DelayTask::new("wait", 0.5)));

        let mut executor = PlanExecutor::new(ExecutorConfig::default());
        executor.start_plan(plan, context()).unwrap();
        assert_eq!(executor.state(), ExecutorState::Executing);

        executor.advance(0.2);
        assert_eq!(executor.state(), ExecutorState::Executing);
        executor.advance(0.2);
        assert_eq!(executor.state(), ExecutorState::Executing);
        executor.advance(0.2);
        assert_eq!(executor.state(), ExecutorState::Completed);
    }

    #[test]
    fn test_delay_task_with_zero_duration_is_instant() {
        let mut ctx = context();
        let mut memory = PropertyMap::new();
        assert_eq!(
            DelayTask::new("now", 0.0).execute(&mut ctx, &mut memory),
            TaskStatus::Succeeded
        );
    }

    #[test]
    fn test_delay_elapsed_lives_in_task_memory() {
        let mut ctx = context();
        let mut memory = PropertyMap::new();
        let task = DelayTask::new("wait", 1.0);

        assert_eq!(task.execute(&mut ctx, &mut memory), TaskStatus::InProgress);
        assert_eq!(task.tick(&mut ctx, 0.25, &mut memory), TaskStatus::InProgress);
        assert_eq!(
            memory.get(&Name::from("elapsed")),
            Some(&PropertyValue::Float(0.25))
        );
        // Resuming from persisted memory continues the wait.
        memory.insert("elapsed".into(), PropertyValue::Float(0.9));
        assert_eq!(task.tick(&mut ctx, 0.1, &mut memory), TaskStatus::Succeeded);
    }
}
