//! Task registry for rebuilding live tasks from persisted references.
//!
//! Persisted plans carry task references (class path + name + cost), not task
//! objects. A registry maps each class path to a constructor so deserialized
//! plans can be rehydrated. There is no global registry; the host builds one
//! at startup and passes it where needed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::task::PrimitiveTask;
use crate::types::TaskRef;

/// Builds a live task from its persisted reference.
pub type TaskConstructor = Box<dyn Fn(&TaskRef) -> Arc<dyn PrimitiveTask> + Send + Sync>;

/// Registry of task constructors keyed by class path.
#[derive(Default)]
pub struct TaskRegistry {
    constructors: HashMap<String, TaskConstructor>,
}

impl TaskRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor for a class path. Replaces any previous entry.
    pub fn register(
        &mut self,
        class_path: impl Into<String>,
        constructor: impl Fn(&TaskRef) -> Arc<dyn PrimitiveTask> + Send + Sync + 'static,
    ) {
        let class_path = class_path.into();
        if self
            .constructors
            .insert(class_path.clone(), Box::new(constructor))
            .is_some()
        {
            tracing::debug!(class_path = %class_path, "task constructor replaced");
        }
    }

    /// Build a live task for a reference, if its class path is known.
    pub fn construct(&self, task_ref: &TaskRef) -> Option<Arc<dyn PrimitiveTask>> {
        self.constructors
            .get(&task_ref.class_path)
            .map(|build| build(task_ref))
    }

    /// True when a constructor exists for the class path.
    pub fn contains(&self, class_path: &str) -> bool {
        self.constructors.contains_key(class_path)
    }

    /// All registered class paths.
    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("class_paths", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskProfile, TaskStatus};
    use crate::types::{ExecutionContext, PropertyMap};
    use uuid::Uuid;

    struct EchoTask {
        profile: TaskProfile,
    }

    impl PrimitiveTask for EchoTask {
        fn profile(&self) -> &TaskProfile {
            &self.profile
        }

        fn class_path(&self) -> &str {
            "stratagem.test.EchoTask"
        }

        fn execute(&self, _ctx: &mut ExecutionContext, _memory: &mut PropertyMap) -> TaskStatus {
            TaskStatus::Succeeded
        }
    }

    fn echo_ref(name: &str, cost: f64) -> TaskRef {
        TaskRef {
            id: Uuid::new_v4(),
            class_path: "stratagem.test.EchoTask".to_string(),
            name: name.to_string(),
            cost,
        }
    }

    #[test]
    fn test_construct_rebuilds_from_reference() {
        let mut registry = TaskRegistry::new();
        registry.register("stratagem.test.EchoTask", |task_ref: &TaskRef| {
            Arc::new(EchoTask {
                profile: TaskProfile::new(task_ref.name.clone(), "").with_cost(task_ref.cost),
            }) as Arc<dyn PrimitiveTask>
        });

        let task = registry.construct(&echo_ref("speak", 3.0)).expect("task");
        assert_eq!(task.name(), "speak");
        assert_eq!(task.cost(), 3.0);
        assert!(registry.contains("stratagem.test.EchoTask"));
    }

    #[test]
    fn test_unknown_class_path_yields_none() {
        let registry = TaskRegistry::new();
        let mut missing = echo_ref("speak", 1.0);
        missing.class_path = "stratagem.test.Unknown".to_string();
        assert!(registry.construct(&missing).is_none());
        assert!(registry.names().is_empty());
    }
}
