//! 领域事件
//!
//! 任务生命周期事件与发给外部协作方的通知

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Task;
use crate::value_objects::{Alert, FeedbackRecord, FeedbackSignal};

/// 领域事件基础trait
pub trait DomainEvent: Send + Sync {
    fn event_id(&self) -> Uuid;
    fn event_type(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn aggregate_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskEventKind {
    Added,
    Started,
    Completed,
    Retry,
    Failed,
    Cancelled,
}

/// 任务生命周期事件，携带事件发生时的任务快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: Uuid,
    pub kind: TaskEventKind,
    pub task: Task,
    pub occurred_at: DateTime<Utc>,
}

impl TaskEvent {
    pub fn new(kind: TaskEventKind, task: Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            task,
            occurred_at: Utc::now(),
        }
    }
}

impl DomainEvent for TaskEvent {
    fn event_id(&self) -> Uuid {
        self.id
    }

    fn event_type(&self) -> &str {
        match self.kind {
            TaskEventKind::Added => "task:added",
            TaskEventKind::Started => "task:started",
            TaskEventKind::Completed => "task:completed",
            TaskEventKind::Retry => "task:retry",
            TaskEventKind::Failed => "task:failed",
            TaskEventKind::Cancelled => "task:cancelled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    fn aggregate_id(&self) -> String {
        self.task.id.to_string()
    }
}

/// 引擎发给协作方的通知
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    TaskCompleted(Task),
    TaskFailed(Task),
    AlertRaised(Alert),
    FeedbackSignal {
        signal: FeedbackSignal,
        record: FeedbackRecord,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::TaskCompleted(_) => "task_completed",
            Notification::TaskFailed(_) => "task_failed",
            Notification::AlertRaised(_) => "alert_raised",
            Notification::FeedbackSignal { .. } => "feedback_signal",
        }
    }
}
