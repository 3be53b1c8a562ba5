//! Execution lifecycle events and the observer seam.
//!
//! The executor publishes to an explicit observer list; consumers subscribe
//! with `PlanExecutor::add_observer` rather than relying on any implicit
//! callback wiring.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A lifecycle event emitted by the executor.
///
/// Task events carry the task's slot index and display name so observers can
/// report without holding a reference to the plan.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    PlanStarted { tasks: usize, total_cost: f64 },
    PlanPaused,
    PlanResumed,
    TaskStarted { index: usize, name: String },
    TaskSucceeded { index: usize, name: String },
    TaskFailed { index: usize, name: String },
    TaskTimedOut { index: usize, name: String, elapsed: Duration },
    PlanCompleted,
    PlanFailed,
    PlanAborted,
}

/// Receives executor lifecycle events, in emission order.
pub trait ExecutionObserver: Send {
    fn on_event(&mut self, event: &ExecutionEvent);
}

impl<F> ExecutionObserver for F
where
    F: FnMut(&ExecutionEvent) + Send,
{
    fn on_event(&mut self, event: &ExecutionEvent) {
        self(event)
    }
}

/// Observer that records every event; clones share the same buffer, so a
/// clone can be handed to the executor while the original stays inspectable.
#[derive(Debug, Default, Clone)]
pub struct CollectingObserver {
    events: Arc<Mutex<Vec<ExecutionEvent>>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExecutionObserver for CollectingObserver {
    fn on_event(&mut self, event: &ExecutionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
