//! Test data builders

use mindforge_domain::{Task, TaskParams, TaskPriority};
use serde_json::Value;

/// Build a params map from key/value pairs.
pub fn params(pairs: &[(&str, Value)]) -> TaskParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub struct TaskBuilder {
    sequence: u64,
    task_type: String,
    description: String,
    params: TaskParams,
    default_max_retries: u32,
    priority: Option<TaskPriority>,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            sequence: 1,
            task_type: "noop".to_string(),
            description: "test task".to_string(),
            params: TaskParams::new(),
            default_max_retries: 3,
            priority: None,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_task_type(mut self, task_type: &str) -> Self {
        self.task_type = task_type.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn build(self) -> Task {
        let task = Task::new(
            self.sequence,
            self.task_type,
            self.description,
            self.params,
            self.default_max_retries,
        );
        match self.priority {
            Some(priority) => task.with_priority(priority),
            None => task,
        }
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}
