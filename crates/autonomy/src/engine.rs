//! 自主执行引擎
//!
//! 按配置组装处理器注册表、调度器、监控、反馈记录和自主驱动，对外提供统一入口。

use std::sync::Arc;

use async_trait::async_trait;
use mindforge_config::AppConfig;
use mindforge_dispatcher::{register_builtin_handlers, HandlerRegistry, TaskScheduler};
use mindforge_domain::{
    Alert, FeedbackRecord, MetricsSink, Notification, Notifier, QueueStatus, SchedulerResult,
    Task, TaskId, TaskParams,
};
use mindforge_observability::{
    FeedbackRecorder, FeedbackStats, MetricsCollector, SystemMonitor, SystemStatus,
};
use serde::Serialize;
use tracing::info;

use crate::driver::AutonomousDriver;
use crate::mind::{register_mind_handlers, Mind};

/// 引擎整体状态
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub is_running: bool,
    pub ticks: u64,
    pub queue: QueueStatus,
    pub system: SystemStatus,
    /// 未确认的告警
    pub alerts: Vec<Alert>,
}

pub struct AutonomousEngine {
    config: AppConfig,
    scheduler: TaskScheduler,
    monitor: Arc<SystemMonitor>,
    feedback: FeedbackRecorder,
    driver: Arc<AutonomousDriver>,
    metrics: Arc<MetricsCollector>,
}

impl AutonomousEngine {
    pub async fn new(config: AppConfig, mind: Arc<dyn Mind>, notifier: Arc<dyn Notifier>) -> Self {
        let metrics = Arc::new(MetricsCollector::new());

        let registry = HandlerRegistry::new();
        register_builtin_handlers(&registry).await;
        register_mind_handlers(&registry, mind.clone()).await;

        let monitor = Arc::new(SystemMonitor::new(
            &config.monitor,
            notifier.clone(),
            metrics.clone(),
        ));
        let sink: Arc<dyn MetricsSink> = monitor.clone();
        let scheduler = TaskScheduler::new(
            config.scheduler.clone(),
            registry,
            notifier.clone(),
            Some(sink),
            metrics.clone(),
        );
        monitor.attach_queue(scheduler.status_provider()).await;

        let feedback = FeedbackRecorder::new(config.feedback.history_size, notifier, metrics.clone());
        let driver = Arc::new(AutonomousDriver::new(
            config.autonomy.clone(),
            scheduler.clone(),
            monitor.clone(),
            mind,
            metrics.clone(),
        ));

        Self {
            config,
            scheduler,
            monitor,
            feedback,
            driver,
            metrics,
        }
    }

    /// 启动自主驱动；配置中关闭自主模式时只记录日志
    pub async fn start(&self) -> SchedulerResult<()> {
        if !self.config.autonomy.enabled {
            info!("自主模式已在配置中关闭，仅处理手动提交的任务");
            return Ok(());
        }
        self.driver.start().await
    }

    pub async fn stop(&self) {
        self.driver.stop().await;
    }

    pub async fn execute_task(
        &self,
        task_type: &str,
        description: &str,
        params: TaskParams,
    ) -> Task {
        self.scheduler.submit(task_type, description, params).await
    }

    pub async fn execute_priority_task(
        &self,
        task_type: &str,
        description: &str,
        params: TaskParams,
    ) -> Task {
        self.scheduler
            .submit_priority(task_type, description, params)
            .await
    }

    pub async fn cancel_task(&self, task_id: &TaskId) -> bool {
        self.scheduler.cancel(task_id).await
    }

    pub async fn get_task(&self, task_id: &TaskId) -> Option<Task> {
        self.scheduler.get_task(task_id).await
    }

    pub async fn get_status(&self) -> EngineStatus {
        let queue = self.scheduler.get_status().await;
        let system = self.monitor.get_system_status().await;
        EngineStatus {
            is_running: self.driver.is_running().await,
            ticks: self.driver.tick_count(),
            queue,
            system,
            alerts: self.monitor.get_alerts(true).await,
        }
    }

    pub async fn health_report(&self) -> String {
        self.monitor.generate_health_report().await
    }

    pub async fn record_feedback(
        &self,
        task_id: TaskId,
        feedback: &str,
        rating: u8,
    ) -> SchedulerResult<FeedbackRecord> {
        self.feedback.record_feedback(task_id, feedback, rating).await
    }

    pub async fn feedback_stats(&self) -> FeedbackStats {
        self.feedback.get_stats().await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn registry(&self) -> &HandlerRegistry {
        self.scheduler.registry()
    }

    pub fn monitor(&self) -> &Arc<SystemMonitor> {
        &self.monitor
    }

    pub fn feedback(&self) -> &FeedbackRecorder {
        &self.feedback
    }

    pub fn driver(&self) -> &Arc<AutonomousDriver> {
        &self.driver
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}

/// 把同一条通知依次转发给多个协作方
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notification: Notification) {
        for target in &self.targets {
            target.notify(notification.clone()).await;
        }
    }
}
