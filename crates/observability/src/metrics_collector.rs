use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};

/// Prometheus 指标句柄
///
/// 未安装全局 recorder 时这些句柄都是空操作，测试中可以直接构造。
pub struct MetricsCollector {
    // Task metrics
    tasks_submitted_total: Counter,
    tasks_completed_total: Counter,
    task_failures_total: Counter,
    task_retries_total: Counter,
    tasks_cancelled_total: Counter,
    task_execution_duration: Histogram,

    // Queue metrics
    queue_depth: Gauge,
    running_tasks: Gauge,

    // Monitor metrics
    alerts_raised_total: Counter,
    feedback_total: Counter,
    autonomy_ticks_total: Counter,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tasks_submitted_total: counter!("mindforge_tasks_submitted_total"),
            tasks_completed_total: counter!("mindforge_tasks_completed_total"),
            task_failures_total: counter!("mindforge_task_failures_total"),
            task_retries_total: counter!("mindforge_task_retries_total"),
            tasks_cancelled_total: counter!("mindforge_tasks_cancelled_total"),
            task_execution_duration: histogram!("mindforge_task_execution_duration_seconds"),
            queue_depth: gauge!("mindforge_queue_depth"),
            running_tasks: gauge!("mindforge_running_tasks"),
            alerts_raised_total: counter!("mindforge_alerts_raised_total"),
            feedback_total: counter!("mindforge_feedback_total"),
            autonomy_ticks_total: counter!("mindforge_autonomy_ticks_total"),
        }
    }

    pub fn record_task_submitted(&self) {
        self.tasks_submitted_total.increment(1);
    }

    pub fn record_task_completed(&self, duration_seconds: f64) {
        self.tasks_completed_total.increment(1);
        self.task_execution_duration.record(duration_seconds);
    }

    pub fn record_task_failure(&self) {
        self.task_failures_total.increment(1);
    }

    pub fn record_task_retry(&self) {
        self.task_retries_total.increment(1);
    }

    pub fn record_task_cancelled(&self) {
        self.tasks_cancelled_total.increment(1);
    }

    pub fn update_queue(&self, pending: usize, running: usize) {
        self.queue_depth.set(pending as f64);
        self.running_tasks.set(running as f64);
    }

    pub fn record_alert(&self) {
        self.alerts_raised_total.increment(1);
    }

    pub fn record_feedback(&self) {
        self.feedback_total.increment(1);
    }

    pub fn record_autonomy_tick(&self) {
        self.autonomy_ticks_total.increment(1);
    }

    /// 监控序列的最新值
    pub fn set_metric_value(&self, name: &str, value: f64) {
        gauge!("mindforge_metric_latest", "metric" => name.to_string()).set(value);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
