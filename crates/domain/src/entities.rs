use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{TaskId, TaskPriority};

pub type TaskParams = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 一次失败之后任务的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// 已增加重试计数并回到 pending
    Retry,
    /// 重试次数耗尽，进入 failed 终态
    Exhausted,
}

/// 调度单元
///
/// 同一个 `Task` 值在重试时被重新入队，`id` 和 `sequence` 不变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task_type: String,
    pub description: String,
    pub params: TaskParams,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl Task {
    /// `params.priority` 决定优先级，`params.max_retries` 可覆盖默认重试次数
    pub fn new(
        sequence: u64,
        task_type: impl Into<String>,
        description: impl Into<String>,
        params: TaskParams,
        default_max_retries: u32,
    ) -> Self {
        let priority = TaskPriority::from_param(params.get("priority"));
        let max_retries = params
            .get("max_retries")
            .or_else(|| params.get("maxRetries"))
            .and_then(|v| v.as_u64())
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(default_max_retries);

        Self {
            id: TaskId::new(),
            task_type: task_type.into(),
            description: description.into(),
            params,
            priority,
            status: TaskStatus::Pending,
            sequence,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries,
            error: None,
            result: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self.params.insert(
            "priority".to_string(),
            serde_json::Value::String(priority.as_str().to_string()),
        );
        self
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, TaskStatus::Pending)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, TaskStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn can_retry(&self) -> bool {
        !self.is_terminal() && self.retry_count < self.max_retries
    }

    /// pending → running，只有首次启动记录 `started_at`
    pub fn start(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = TaskStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        true
    }

    pub fn complete(&mut self, result: serde_json::Value) {
        if self.is_terminal() {
            return;
        }
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.mark_finished();
    }

    pub fn record_failure(&mut self, error: impl Into<String>) -> FailureDisposition {
        if self.is_terminal() {
            return FailureDisposition::Exhausted;
        }
        let error = error.into();
        if self.can_retry() {
            self.retry_count += 1;
            self.error = Some(error);
            self.status = TaskStatus::Pending;
            FailureDisposition::Retry
        } else {
            self.fail_permanently(error);
            FailureDisposition::Exhausted
        }
    }

    /// 直接进入 failed 终态，不增加重试计数
    pub fn fail_permanently(&mut self, error: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.mark_finished();
    }

    fn mark_finished(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        if let (Some(started), Some(completed)) = (self.started_at, self.completed_at) {
            Some((completed - started).num_milliseconds())
        } else {
            None
        }
    }
}

/// 调度器队列的时间点快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending_count: usize,
    pub running_count: usize,
    pub completed_count: usize,
    pub pending: Vec<Task>,
    pub running: Vec<Task>,
}
