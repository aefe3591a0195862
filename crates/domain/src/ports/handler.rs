use async_trait::async_trait;
use mindforge_errors::SchedulerResult;

use crate::entities::{Task, TaskParams};
use crate::value_objects::{TaskId, TaskPriority};

/// 传给处理器的执行上下文
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: TaskId,
    pub task_type: String,
    pub description: String,
    pub params: TaskParams,
    pub priority: TaskPriority,
    pub retry_count: u32,
}

impl TaskContext {
    /// 第几次尝试，从1开始
    pub fn attempt(&self) -> u32 {
        self.retry_count + 1
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(|v| v.as_u64())
    }
}

impl From<&Task> for TaskContext {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            task_type: task.task_type.clone(),
            description: task.description.clone(),
            params: task.params.clone(),
            priority: task.priority,
            retry_count: task.retry_count,
        }
    }
}

/// 任务处理器，按任务类型注册到调度器
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, context: &TaskContext) -> SchedulerResult<serde_json::Value>;

    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }
}
