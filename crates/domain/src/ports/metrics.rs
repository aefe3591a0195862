use async_trait::async_trait;

use crate::entities::QueueStatus;

/// 调度器上报给监控的指标名
pub mod metric_names {
    pub const QUEUE_DEPTH: &str = "queue_depth";
    pub const TASK_DURATION_MS: &str = "task_duration_ms";
    pub const TASK_FAILURES: &str = "task_failures";
    pub const MEMORY_MB: &str = "memory_mb";
}

/// 指标接收方
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record(&self, name: &str, value: f64);
}

/// 队列状态来源，监控通过它读取调度器快照
#[async_trait]
pub trait QueueStatusProvider: Send + Sync {
    async fn queue_status(&self) -> QueueStatus;
}
