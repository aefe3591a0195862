use mindforge_domain::{Alert, Task};
use tracing::{debug, error, info, warn};

pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_task_submitted(task: &Task) {
        debug!(
            event = "task_submitted",
            task.id = %task.id,
            task.type = %task.task_type,
            task.priority = %task.priority,
            task.sequence = task.sequence,
            "Task submitted"
        );
    }

    pub fn log_task_execution_start(task: &Task) {
        info!(
            event = "task_execution_start",
            task.id = %task.id,
            task.type = %task.task_type,
            task.priority = %task.priority,
            task.retry_count = task.retry_count,
            "Task execution started"
        );
    }

    pub fn log_task_execution_complete(task: &Task) {
        info!(
            event = "task_execution_complete",
            task.id = %task.id,
            task.type = %task.task_type,
            task.duration_ms = task.duration_ms().unwrap_or_default(),
            task.retry_count = task.retry_count,
            "Task execution completed"
        );
    }

    pub fn log_task_retry(task: &Task) {
        warn!(
            event = "task_retry",
            task.id = %task.id,
            task.type = %task.task_type,
            task.retry_count = task.retry_count,
            task.max_retries = task.max_retries,
            error = task.error.as_deref().unwrap_or_default(),
            "Task failed, re-queued for retry"
        );
    }

    pub fn log_task_failed(task: &Task) {
        error!(
            event = "task_failed",
            task.id = %task.id,
            task.type = %task.task_type,
            task.retry_count = task.retry_count,
            error = task.error.as_deref().unwrap_or_default(),
            "Task failed permanently"
        );
    }

    pub fn log_task_cancelled(task: &Task) {
        info!(
            event = "task_cancelled",
            task.id = %task.id,
            task.type = %task.task_type,
            "Task cancelled"
        );
    }

    pub fn log_alert_raised(alert: &Alert) {
        warn!(
            event = "alert_raised",
            alert.id = %alert.id,
            alert.level = %alert.level,
            alert.metric = %alert.metric,
            alert.value = alert.value,
            alert.threshold = alert.threshold,
            "ALERT TRIGGERED: {}",
            alert.message
        );
    }
}
