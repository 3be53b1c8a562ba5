//! Serializable plan record.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::TaskRegistry;
use crate::task::PrimitiveTask;
use crate::types::{Plan, PlanExecutionSettings, PlanStatus, PropertyMap, TaskRef};

use super::CodecError;

/// Current record format version. Bumped on any breaking layout change.
pub const PLAN_RECORD_VERSION: u32 = 1;

/// The persisted shape of a plan.
///
/// Carries everything a plan needs except the live task objects: identity
/// references, execution bookkeeping, the per-task parameter/result rows, and
/// the dependency map. The version tag is the first field in every encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub version: u32,
    pub total_cost: f64,
    pub current_task_index: u32,
    pub execution: PlanExecutionSettings,
    pub status: PlanStatus,
    pub tasks: Vec<TaskRef>,
    pub parameters: Vec<PropertyMap>,
    pub results: Vec<PropertyMap>,
    /// Task slot index → indices it depends on.
    pub dependencies: BTreeMap<u32, Vec<u32>>,
}

impl Plan {
    /// Snapshot this plan as a serializable record.
    pub fn to_record(&self) -> PlanRecord {
        let mut dependencies = BTreeMap::new();
        for index in 0..self.len() {
            if let Some(deps) = self.dependencies_of(index) {
                if !deps.is_empty() {
                    dependencies.insert(
                        index as u32,
                        deps.iter().map(|&d| d as u32).collect(),
                    );
                }
            }
        }
        PlanRecord {
            version: PLAN_RECORD_VERSION,
            total_cost: self.total_cost(),
            current_task_index: u32::try_from(self.current_task_index()).unwrap_or(u32::MAX),
            execution: self.execution_settings(),
            status: self.status(),
            tasks: self.task_refs().cloned().collect(),
            parameters: self.parameter_rows().to_vec(),
            results: self.result_rows().to_vec(),
            dependencies,
        }
    }

    /// Rebuild a live plan from a record, constructing each task through the
    /// registry.
    ///
    /// Fails with `UnknownClassPath` on the first reference the registry
    /// cannot build; a plan is never returned half-hydrated.
    pub fn from_record(record: PlanRecord, registry: &TaskRegistry) -> Result<Plan, CodecError> {
        if record.version != PLAN_RECORD_VERSION {
            return Err(CodecError::UnsupportedVersion(record.version));
        }

        let mut tasks: Vec<Arc<dyn PrimitiveTask>> = Vec::with_capacity(record.tasks.len());
        for task_ref in &record.tasks {
            let task = registry
                .construct(task_ref)
                .ok_or_else(|| CodecError::UnknownClassPath(task_ref.class_path.clone()))?;
            tasks.push(task);
        }

        let count = record.tasks.len();
        let mut parameters = record.parameters;
        parameters.resize(count, PropertyMap::new());
        let mut results = record.results;
        results.resize(count, PropertyMap::new());

        let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
        for (index, deps) in record.dependencies {
            let index = index as usize;
            if index >= count {
                tracing::warn!(task_index = index, "dependency entry out of range, dropped");
                continue;
            }
            dependencies[index] = deps
                .into_iter()
                .map(|d| d as usize)
                .filter(|&d| d < count && d != index)
                .collect();
        }

        Ok(Plan::restore_from_record_parts(
            tasks,
            record.tasks,
            record.total_cost,
            record.current_task_index as usize,
            record.status,
            parameters,
            results,
            dependencies,
            record.execution,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::task::{TaskProfile, TaskStatus};
    use crate::types::{ExecutionContext, PropertyValue};

    pub(crate) struct RecordedTask {
        profile: TaskProfile,
    }

    impl RecordedTask {
        pub(crate) fn shared(name: &str, cost: f64) -> Arc<dyn PrimitiveTask> {
            Arc::new(Self {
                profile: TaskProfile::new(name, "").with_cost(cost),
            })
        }
    }

    impl PrimitiveTask for RecordedTask {
        fn profile(&self) -> &TaskProfile {
            &self.profile
        }

        fn class_path(&self) -> &str {
            "stratagem.test.RecordedTask"
        }

        fn execute(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) -> TaskStatus {
            TaskStatus::Succeeded
        }
    }

    pub(crate) fn recorded_task_registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry.register("stratagem.test.RecordedTask", |task_ref: &TaskRef| {
            RecordedTask::shared(&task_ref.name, task_ref.cost)
        });
        registry
    }

    pub(crate) fn sample_plan() -> Plan {
        let mut plan = Plan::new();
        plan.add_task(RecordedTask::shared("scout", 1.5));
        plan.add_task(RecordedTask::shared("report", 0.5));
        plan.add_dependency(1, 0);
        plan.set_parameter(0, "radius", 25.0);
        plan.set_result(0, "found", true);
        plan.set_status(PlanStatus::Executing);
        plan.set_current_task_index(1);
        plan
    }

    #[test]
    fn test_record_round_trip_preserves_plan() {
        let plan = sample_plan();
        let record = plan.to_record();
        assert_eq!(record.version, PLAN_RECORD_VERSION);

        let restored = Plan::from_record(record, &recorded_task_registry()).expect("plan");
        assert!(restored.is_hydrated());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.total_cost(), 2.0);
        assert_eq!(restored.current_task_index(), 1);
        assert_eq!(restored.status(), PlanStatus::Executing);
        assert_eq!(
            restored.parameter(0, "radius"),
            Some(&PropertyValue::Float(25.0))
        );
        assert_eq!(restored.result(0, "found"), Some(&PropertyValue::Bool(true)));
        assert_eq!(
            restored
                .dependencies_of(1)
                .unwrap()
                .iter()
                .copied()
                .collect::<Vec<_>>(),
            vec![0]
        );
        // Identity survives the trip.
        assert_eq!(restored.task_ref(0).unwrap().id, sample_ids(&plan)[0]);
    }

    fn sample_ids(plan: &Plan) -> Vec<uuid::Uuid> {
        plan.task_refs().map(|r| r.id).collect()
    }

    #[test]
    fn test_unknown_class_path_is_a_typed_error() {
        let record = sample_plan().to_record();
        let empty = TaskRegistry::new();
        match Plan::from_record(record, &empty) {
            Err(CodecError::UnknownClassPath(path)) => {
                assert_eq!(path, "stratagem.test.RecordedTask");
            }
            other => panic!("expected UnknownClassPath, got {other:?}"),
        }
    }

    #[test]
    fn test_future_version_rejected() {
        let mut record = sample_plan().to_record();
        record.version = PLAN_RECORD_VERSION + 1;
        assert!(matches!(
            Plan::from_record(record, &recorded_task_registry()),
            Err(CodecError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_out_of_range_dependency_dropped_on_load() {
        let mut record = sample_plan().to_record();
        record.dependencies.insert(9, vec![0]);
        record.dependencies.insert(0, vec![7]);

        let restored = Plan::from_record(record, &recorded_task_registry()).expect("plan");
        assert!(restored.dependencies_of(0).unwrap().is_empty());
    }
}
