//! Patrol demo: plan a guard's route with the HTN planner, then tick the
//! plan to completion with the executor.
//!
//! Run with `cargo run --example patrol`.

use std::sync::Arc;

use stratagem_core::prelude::*;

/// Walks toward a waypoint over a fixed number of ticks, then records the
/// arrival in the world state through its declared effect.
struct MoveTask {
    profile: TaskProfile,
    ticks: i64,
}

impl MoveTask {
    fn to_waypoint(waypoint: &str, ticks: i64) -> TaskNode {
        let key = format!("at_{waypoint}");
        let profile = TaskProfile::new(format!("move_to_{waypoint}"), "walk to a waypoint")
            .with_cost(ticks as f64)
            .with_effect(Arc::new(FnEffect::new(format!("{key} := true"), {
                let key = key.clone();
                move |ws: &mut WorldState| ws.set_property(key.as_str(), true)
            })));
        TaskNode::primitive(Self { profile, ticks })
    }
}

impl PrimitiveTask for MoveTask {
    fn profile(&self) -> &TaskProfile {
        &self.profile
    }

    fn class_path(&self) -> &str {
        "demo.MoveTask"
    }

    fn execute(&self, _ctx: &mut ExecutionContext, memory: &mut PropertyMap) -> TaskStatus {
        memory.insert("remaining".into(), PropertyValue::Int(self.ticks));
        TaskStatus::InProgress
    }

    fn tick(&self, _ctx: &mut ExecutionContext, _dt: f64, memory: &mut PropertyMap) -> TaskStatus {
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
}

fn flag(key: &str, expected: bool) -> Arc<dyn Condition> {
    let key = key.to_string();
    Arc::new(FnCondition::new(format!("{key} == {expected}"), move |ws| {
        ws.get_property(key.as_str()).map(|v| v.as_bool_or(!expected)) == Some(expected)
    }))
}

fn patrol_goal() -> TaskNode {
    // Prefer the full wall circuit; fall back to a short courtyard loop when
    // the wall route is closed.
    let wall_circuit = Method::new("wall_circuit", 2)
        .with_condition(flag("wall_route_open", true))
        .with_subtask(MoveTask::to_waypoint("north_tower", 3))
        .with_subtask(MoveTask::to_waypoint("east_tower", 2))
        .with_subtask(MoveTask::to_waypoint("gatehouse", 2));
    let courtyard_loop = Method::new("courtyard_loop", 1)
        .with_subtask(MoveTask::to_waypoint("fountain", 1))
        .with_subtask(MoveTask::to_waypoint("gatehouse", 1));

    TaskNode::compound(
        CompoundTask::new("patrol")
            .with_method(wall_circuit)
            .with_method(courtyard_loop),
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut world = WorldState::new();
    world.set_property("wall_route_open", true);

    let planner = Planner::new();
    let result = planner.generate_plan(&world, &[patrol_goal()], &PlannerConfig::default());
    let Some(plan) = result.plan else {
        tracing::error!(failure = %result.failure, "no patrol plan");
        return;
    };
    tracing::info!(
        tasks = plan.len(),
        total_cost = plan.total_cost(),
        nodes_explored = result.metrics.nodes_explored,
        "patrol planned"
    );

    let mut executor = PlanExecutor::new(ExecutorConfig::default());
    executor.add_observer(|event: &ExecutionEvent| {
        if let ExecutionEvent::TaskSucceeded { name, .. } = event {
            tracing::info!(task = %name, "waypoint reached");
        }
    });

    let context = ExecutionContext::new(ObjectRef(1), world);
    if let Err(err) = executor.start_plan(plan, context) {
        tracing::error!(error = %err, "could not start patrol");
        return;
    }

    // Host loop: one tick per "frame".
    let mut ticks = 0u32;
    while executor.state() == ExecutorState::Executing {
        executor.advance(0.1);
        ticks += 1;
    }

    let world = executor
        .take_context()
        .map(|c| c.world_state)
        .unwrap_or_default();
    tracing::info!(
        state = ?executor.state(),
        ticks,
        at_gatehouse = world.get_property("at_gatehouse").is_some(),
        "patrol finished"
    );
}
