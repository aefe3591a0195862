//! 心智协作方接口
//!
//! 调度核心不理解任务的含义，六种自主任务类型都转交给 `Mind` 执行。

use std::sync::Arc;

use async_trait::async_trait;
use mindforge_dispatcher::HandlerRegistry;
use mindforge_domain::{SchedulerResult, TaskContext, TaskHandler, TaskPriority};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod task_types {
    pub const LEARN: &str = "learn";
    pub const REFLECT: &str = "reflect";
    pub const GOAL_UPDATE: &str = "goal_update";
    pub const MEMORY_CONSOLIDATE: &str = "memory_consolidate";
    pub const SKILL_PRACTICE: &str = "skill_practice";
    pub const GENERATE_INSIGHT: &str = "generate_insight";

    pub const ALL: [&str; 6] = [
        LEARN,
        REFLECT,
        GOAL_UPDATE,
        MEMORY_CONSOLIDATE,
        SKILL_PRACTICE,
        GENERATE_INSIGHT,
    ];
}

/// 心智建议推进的下一个目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAction {
    pub id: String,
    pub description: String,
    /// 0..=100
    pub progress: u32,
    pub priority: TaskPriority,
}

#[async_trait]
pub trait Mind: Send + Sync {
    /// 没有待推进的目标时返回 `None`
    async fn next_action(&self) -> Option<GoalAction>;

    async fn perform(&self, task_type: &str, context: &TaskContext) -> SchedulerResult<Value>;
}

/// 把某一种任务类型转交给心智执行的处理器
pub struct MindHandler {
    task_type: String,
    mind: Arc<dyn Mind>,
}

impl MindHandler {
    pub fn new(task_type: impl Into<String>, mind: Arc<dyn Mind>) -> Self {
        Self {
            task_type: task_type.into(),
            mind,
        }
    }
}

#[async_trait]
impl TaskHandler for MindHandler {
    async fn handle(&self, context: &TaskContext) -> SchedulerResult<Value> {
        self.mind.perform(&self.task_type, context).await
    }

    fn name(&self) -> &str {
        &self.task_type
    }

    fn description(&self) -> &str {
        "由心智协作方执行的自主任务"
    }
}

pub async fn register_mind_handlers(registry: &HandlerRegistry, mind: Arc<dyn Mind>) {
    let handlers = task_types::ALL
        .iter()
        .map(|task_type| {
            let handler: Arc<dyn TaskHandler> = Arc::new(MindHandler::new(*task_type, mind.clone()));
            (task_type.to_string(), handler)
        })
        .collect();
    registry.register_batch(handlers).await;
}
