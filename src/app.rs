use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mindforge_autonomy::{AutonomousEngine, FanoutNotifier, StandaloneMind};
use mindforge_config::AppConfig;
use mindforge_domain::{Notifier, Task, TaskParams};
use mindforge_observability::LogNotifier;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::shutdown::drain_engine;

/// 关闭时等待运行中任务的时长
const DRAIN_TIMEOUT: Duration = Duration::from_secs(20);

/// 运行选项，来自命令行
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// 启动后提交一组演示任务
    pub demo: bool,
}

/// 主应用程序
pub struct Application {
    engine: AutonomousEngine,
    mind: Arc<StandaloneMind>,
    options: RunOptions,
}

impl Application {
    pub async fn new(config: AppConfig, options: RunOptions) -> Result<Self> {
        info!(
            max_concurrent = config.scheduler.max_concurrent_tasks,
            autonomy = config.autonomy.enabled,
            "初始化应用程序"
        );

        let mind = Arc::new(StandaloneMind::with_default_goals().await);
        let notifier = FanoutNotifier::new(vec![
            Arc::new(LogNotifier::new("engine")) as Arc<dyn Notifier>,
            mind.clone() as Arc<dyn Notifier>,
        ]);
        let engine = AutonomousEngine::new(config, mind.clone(), Arc::new(notifier)).await;

        Ok(Self {
            engine,
            mind,
            options,
        })
    }

    pub fn engine(&self) -> &AutonomousEngine {
        &self.engine
    }

    /// 运行到收到关闭信号为止
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.engine.start().await.context("启动自主驱动失败")?;

        if self.options.demo {
            let submitted = self.submit_demo_tasks().await;
            info!(count = submitted.len(), "已提交演示任务");
        }

        let period = Duration::from_secs(
            self.engine
                .config()
                .monitor
                .health_report_interval_seconds
                .max(1),
        );
        let mut report_interval = interval_at(Instant::now() + period, period);
        report_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = report_interval.tick() => {
                    info!("\n{}", self.engine.health_report().await);
                }
                _ = shutdown_rx.recv() => {
                    info!("应用收到关闭信号");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        if !drain_engine(&self.engine, DRAIN_TIMEOUT).await {
            warn!("部分任务未在关闭前完成");
        }

        let status = self.engine.get_status().await;
        let stats = self.engine.feedback_stats().await;
        let reflections = self.mind.reflections(usize::MAX).await.len();
        info!(
            completed = status.queue.completed_count,
            ticks = status.ticks,
            feedback = stats.total,
            reflections = reflections,
            "最终状态"
        );
        let health_report = self.engine.health_report().await;
        info!("\n{}", health_report);
    }

    async fn submit_demo_tasks(&self) -> Vec<Task> {
        let demo: Vec<(&str, &str, TaskParams)> = vec![
            (
                "learn",
                "从对话中学习",
                params([("message", json!("你好")), ("response", json!("你好，我是 MindForge"))]),
            ),
            (
                "skill_practice",
                "练习任务调度",
                params([("skill", json!("任务调度"))]),
            ),
            ("memory_consolidate", "整理短期记忆", params([])),
            ("sleep", "模拟耗时任务", params([("duration_ms", json!(200))])),
            ("echo", "回显参数", params([("hello", json!("world"))])),
        ];

        let mut submitted = Vec::with_capacity(demo.len() + 1);
        for (task_type, description, task_params) in demo {
            submitted.push(
                self.engine
                    .execute_task(task_type, description, task_params)
                    .await,
            );
        }
        submitted.push(
            self.engine
                .execute_priority_task("reflect", "启动后立即反思", TaskParams::new())
                .await,
        );
        submitted
    }
}

fn params<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> TaskParams {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
