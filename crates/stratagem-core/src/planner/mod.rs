//! Planner module
//!
//! Depth-first decomposition search over the task hierarchy:
//! - Compound tasks expand through their applicable methods, highest priority
//!   first, with stable declaration-order tie-breaking
//! - Primitive tasks are placed when their preconditions hold, their expected
//!   effects applied to a cloned state
//! - First complete decomposition wins (first-success backtracking, not
//!   optimal-cost search)
//!
//! The caller's world state is never mutated; the search runs on a private
//! clone. Every failure mode is a result value, never a panic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::task::{PrimitiveTask, TaskNode};
use crate::types::{Plan, WorldState};

/// Search limits and diagnostics switches.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum recursion depth before the search aborts.
    pub max_search_depth: usize,
    /// Wall-clock budget; zero means unlimited.
    pub planning_timeout: Duration,
    /// Cap on decomposition branches attempted before the search aborts.
    pub max_plans_to_consider: usize,
    /// Record a per-step decomposition trace in the metrics.
    pub debug: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_search_depth: 64,
            planning_timeout: Duration::ZERO,
            max_plans_to_consider: 1024,
            debug: false,
        }
    }
}

/// Why planning did not produce a plan.
///
/// Always returned as a value; the planner never aborts the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Default)]
pub enum PlanFailure {
    /// Planning succeeded; no failure.
    #[default]
    #[error("no failure")]
    None,
    /// A goal compound task had no applicable method.
    #[error("no applicable methods for goal task")]
    NoApplicableMethods,
    /// A goal primitive task's preconditions did not hold.
    #[error("goal task preconditions failed")]
    PreconditionFailed,
    /// Recursion depth exceeded the configured maximum.
    #[error("maximum search depth reached")]
    MaxDepthReached,
    /// The wall-clock budget was exhausted.
    #[error("planning timeout exceeded")]
    Timeout,
    /// The branch cap was exhausted.
    #[error("maximum plans to consider reached")]
    MaxPlansReached,
    /// The search space was exhausted without a complete decomposition.
    #[error("no valid plan found")]
    NoValidPlan,
    /// Malformed input, e.g. an empty goal list.
    #[error("unexpected planner error: {0}")]
    UnexpectedError(String),
}

/// Counters and timings gathered during one planning call.
#[derive(Debug, Clone, Default)]
pub struct PlanningMetrics {
    /// Tasks evaluated during the search.
    pub nodes_explored: usize,
    /// Decomposition branches attempted.
    pub plans_considered: usize,
    /// Deepest recursion level visited.
    pub max_depth_reached: usize,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    /// Per-step decomposition trace (only when `debug` is set).
    pub trace: Vec<String>,
}

/// Outcome of a planning call: a plan or a typed failure, plus metrics.
#[derive(Debug)]
pub struct PlannerResult {
    pub plan: Option<Plan>,
    pub failure: PlanFailure,
    pub metrics: PlanningMetrics,
}

impl PlannerResult {
    pub fn succeeded(&self) -> bool {
        self.plan.is_some()
    }
}

/// Outcome of replaying a plan against a world state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanValidation {
    pub is_valid: bool,
    /// Index of the first task whose preconditions no longer hold.
    pub failed_task_index: Option<usize>,
}

impl PlanValidation {
    fn valid() -> Self {
        Self {
            is_valid: true,
            failed_task_index: None,
        }
    }

    fn invalid_at(index: usize) -> Self {
        Self {
            is_valid: false,
            failed_task_index: Some(index),
        }
    }
}

/// Depth-first HTN decomposition planner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Search for an ordered primitive-task sequence achieving `goals`.
    pub fn generate_plan(
        &self,
        world_state: &WorldState,
        goals: &[TaskNode],
        config: &PlannerConfig,
    ) -> PlannerResult {
        let started = Instant::now();
        if goals.is_empty() {
            return PlannerResult {
                plan: None,
                failure: PlanFailure::UnexpectedError("empty goal list".to_string()),
                metrics: PlanningMetrics {
                    elapsed: started.elapsed(),
                    ..PlanningMetrics::default()
                },
            };
        }

        let mut search = Search::new(config, started);
        let mut accumulated: Vec<Arc<dyn PrimitiveTask>> = Vec::new();
        // Private clone; the caller's state is never touched.
        let working = world_state.clone();
        let outcome = search.decompose(goals, &working, &mut accumulated, 0);

        let (metrics, root_hint) = search.finish(started);
        match outcome {
            Ok(true) => {
                let mut plan = Plan::new();
                for task in accumulated {
                    plan.add_task(task);
                }
                tracing::info!(
                    tasks = plan.len(),
                    total_cost = plan.total_cost(),
                    nodes_explored = metrics.nodes_explored,
                    elapsed_ms = metrics.elapsed.as_millis() as u64,
                    "plan generated"
                );
                PlannerResult {
                    plan: Some(plan),
                    failure: PlanFailure::None,
                    metrics,
                }
            }
            Ok(false) => {
                let failure = root_hint.unwrap_or(PlanFailure::NoValidPlan);
                tracing::debug!(failure = %failure, "planning exhausted search space");
                PlannerResult {
                    plan: None,
                    failure,
                    metrics,
                }
            }
            Err(failure) => {
                tracing::debug!(failure = %failure, "planning aborted");
                PlannerResult {
                    plan: None,
                    failure,
                    metrics,
                }
            }
        }
    }

    /// Replay a plan's tasks in order against a cloned world state.
    ///
    /// Fails fast at the first task whose preconditions no longer hold; empty
    /// plans are vacuously valid.
    pub fn validate_plan(&self, plan: &Plan, world_state: &WorldState) -> PlanValidation {
        let mut working = world_state.clone();
        for (index, task) in plan.tasks().enumerate() {
            if !task.is_applicable(&working) {
                tracing::debug!(task_index = index, task = task.name(), "plan replay failed");
                return PlanValidation::invalid_at(index);
            }
            task.apply_effects(&mut working);
        }
        PlanValidation::valid()
    }

    /// Extend an existing plan: replay its effects, then search for `goals`.
    ///
    /// On success the returned plan is the existing plan with the extension
    /// merged on the end. Used for incremental re-planning.
    pub fn generate_partial_plan(
        &self,
        existing: &Plan,
        world_state: &WorldState,
        goals: &[TaskNode],
        config: &PlannerConfig,
    ) -> PlannerResult {
        let mut working = world_state.clone();
        for task in existing.tasks() {
            task.apply_effects(&mut working);
        }

        let mut result = self.generate_plan(&working, goals, config);
        if let Some(extension) = result.plan.take() {
            let mut merged = existing.clone();
            merged.merge(extension);
            result.plan = Some(merged);
        }
        result
    }
}

struct Search<'a> {
    config: &'a PlannerConfig,
    deadline: Option<Instant>,
    nodes_explored: usize,
    plans_considered: usize,
    max_depth_reached: usize,
    trace: Vec<String>,
    /// Set when a root-level goal dead-ends; refines the exhaustion failure.
    root_hint: Option<PlanFailure>,
}

impl<'a> Search<'a> {
    fn new(config: &'a PlannerConfig, started: Instant) -> Self {
        let deadline = if config.planning_timeout.is_zero() {
            None
        } else {
            Some(started + config.planning_timeout)
        };
        Self {
            config,
            deadline,
            nodes_explored: 0,
            plans_considered: 0,
            max_depth_reached: 0,
            trace: Vec::new(),
            root_hint: None,
        }
    }

    fn finish(self, started: Instant) -> (PlanningMetrics, Option<PlanFailure>) {
        let metrics = PlanningMetrics {
            nodes_explored: self.nodes_explored,
            plans_considered: self.plans_considered,
            max_depth_reached: self.max_depth_reached,
            elapsed: started.elapsed(),
            trace: self.trace,
        };
        (metrics, self.root_hint)
    }

    fn record(&mut self, depth: usize, message: impl FnOnce() -> String) {
        if self.config.debug {
            self.trace.push(format!("{:width$}{}", "", message(), width = depth * 2));
        }
    }

    /// Returns Ok(true) when the worklist decomposed completely, Ok(false)
    /// when this branch dead-ends (backtrack), Err on a hard search abort.
    fn decompose(
        &mut self,
        worklist: &[TaskNode],
        state: &WorldState,
        accumulated: &mut Vec<Arc<dyn PrimitiveTask>>,
        depth: usize,
    ) -> Result<bool, PlanFailure> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(PlanFailure::Timeout);
            }
        }
        if depth > self.config.max_search_depth {
            return Err(PlanFailure::MaxDepthReached);
        }
        self.max_depth_reached = self.max_depth_reached.max(depth);

        let Some((current, rest)) = worklist.split_first() else {
            // Worklist drained: the accumulated primitives are a plan.
            return Ok(true);
        };
        self.nodes_explored += 1;

        match current {
            TaskNode::Primitive(task) => {
                if !task.is_applicable(state) {
                    self.record(depth, || format!("skip {} (preconditions)", task.name()));
                    if depth == 0 {
                        self.root_hint.get_or_insert(PlanFailure::PreconditionFailed);
                    }
                    return Ok(false);
                }

                let mut next_state = state.clone();
                task.apply_effects(&mut next_state);
                accumulated.push(task.clone());
                self.record(depth, || format!("place {}", task.name()));

                if self.decompose(rest, &next_state, accumulated, depth + 1)? {
                    return Ok(true);
                }
                accumulated.pop();
                Ok(false)
            }
            TaskNode::Compound(task) => {
                let methods = task.applicable_methods(state);
                if methods.is_empty() {
                    self.record(depth, || format!("skip {} (no methods)", task.name));
                    if depth == 0 {
                        self.root_hint.get_or_insert(PlanFailure::NoApplicableMethods);
                    }
                    return Ok(false);
                }

                for method in methods {
                    self.plans_considered += 1;
                    if self.plans_considered > self.config.max_plans_to_consider {
                        return Err(PlanFailure::MaxPlansReached);
                    }
                    self.record(depth, || {
                        format!("expand {} via {} (priority {})", task.name, method.name, method.priority)
                    });

                    let mut next_worklist =
                        Vec::with_capacity(method.subtasks.len() + rest.len());
                    next_worklist.extend(method.subtasks.iter().cloned());
                    next_worklist.extend(rest.iter().cloned());

                    if self.decompose(&next_worklist, state, accumulated, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}
