use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_concurrent_tasks: usize,
    pub default_max_retries: u32,
    pub completed_history_size: usize,
    /// 未设置时不限制处理器执行时间
    pub handler_timeout_ms: Option<u64>,
    pub event_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            default_max_retries: 3,
            completed_history_size: 100,
            handler_timeout_ms: None,
            event_channel_capacity: 256,
        }
    }
}

impl ConfigValidator for SchedulerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(self.max_concurrent_tasks, "scheduler.max_concurrent_tasks")?;
        ValidationUtils::validate_count(
            self.completed_history_size,
            "scheduler.completed_history_size",
        )?;
        ValidationUtils::validate_count(
            self.event_channel_capacity,
            "scheduler.event_channel_capacity",
        )?;
        if let Some(timeout) = self.handler_timeout_ms {
            ValidationUtils::validate_interval_ms(timeout, "scheduler.handler_timeout_ms")?;
        }
        Ok(())
    }
}
