//! 自主驱动
//!
//! 按固定间隔检查系统状态，队列空闲时向调度器补充自主任务。
//! 所有 tick 都在同一个循环里依次等待，不会重叠，错过的 tick 直接跳过。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mindforge_config::AutonomyConfig;
use mindforge_dispatcher::TaskScheduler;
use mindforge_domain::{metric_names, SchedulerError, SchedulerResult, Task, TaskParams};
use mindforge_observability::resource::process_memory_mb;
use mindforge_observability::{MetricsCollector, SystemMonitor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::mind::{task_types, Mind};

const GOAL_PROGRESS_STEP: u32 = 10;

/// 单次 tick 的结果
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub pending: usize,
    pub submitted: Vec<Task>,
}

pub struct AutonomousDriver {
    config: AutonomyConfig,
    scheduler: TaskScheduler,
    monitor: Arc<SystemMonitor>,
    mind: Arc<dyn Mind>,
    metrics: Arc<MetricsCollector>,
    rng: Mutex<StdRng>,
    ticks: AtomicU64,
    is_running: RwLock<bool>,
    shutdown_tx: RwLock<Option<broadcast::Sender<()>>>,
}

impl AutonomousDriver {
    pub fn new(
        config: AutonomyConfig,
        scheduler: TaskScheduler,
        monitor: Arc<SystemMonitor>,
        mind: Arc<dyn Mind>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            scheduler,
            monitor,
            mind,
            metrics,
            rng: Mutex::new(rng),
            ticks: AtomicU64::new(0),
            is_running: RwLock::new(false),
            shutdown_tx: RwLock::new(None),
        }
    }

    pub async fn start(self: &Arc<Self>) -> SchedulerResult<()> {
        let mut is_running = self.is_running.write().await;
        if *is_running {
            return Err(SchedulerError::Internal("自主驱动已在运行".to_string()));
        }

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        *self.shutdown_tx.write().await = Some(shutdown_tx);

        let period = Duration::from_millis(self.config.tick_interval_ms);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let driver = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("自主驱动循环退出");
                        break;
                    }
                    _ = ticker.tick() => {
                        driver.tick().await;
                    }
                }
            }
        });

        *is_running = true;
        info!(
            interval_ms = self.config.tick_interval_ms,
            low_water_mark = self.config.low_water_mark,
            "自主执行系统启动"
        );
        Ok(())
    }

    pub async fn stop(&self) {
        let mut is_running = self.is_running.write().await;
        if !*is_running {
            return;
        }

        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
        *is_running = false;
        info!(ticks = self.tick_count(), "自主执行系统停止");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// 执行一次调度检查，循环之外也可直接调用
    pub async fn tick(&self) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.record_autonomy_tick();

        let status = self.monitor.get_system_status().await;
        let pending = status.pending_tasks();
        let mut submitted = Vec::new();

        if pending < self.config.low_water_mark {
            if let Some(action) = self.mind.next_action().await {
                if self.roll(self.config.goal_probability).await {
                    let mut params = TaskParams::new();
                    params.insert("goal_id".to_string(), json!(action.id));
                    params.insert(
                        "progress".to_string(),
                        json!(action.progress.saturating_add(GOAL_PROGRESS_STEP).min(100)),
                    );
                    params.insert("priority".to_string(), json!(action.priority.as_str()));
                    let task = self
                        .scheduler
                        .submit(
                            task_types::GOAL_UPDATE,
                            format!("推进目标: {}", action.description),
                            params,
                        )
                        .await;
                    submitted.push(task);
                }
            }
        }

        if self.roll(self.config.reflect_probability).await {
            let task = self
                .scheduler
                .submit(task_types::REFLECT, "进行自主反思", low_priority())
                .await;
            submitted.push(task);
        }

        if self.roll(self.config.insight_probability).await {
            let task = self
                .scheduler
                .submit(task_types::GENERATE_INSIGHT, "生成洞察", low_priority())
                .await;
            submitted.push(task);
        }

        self.monitor
            .record(metric_names::QUEUE_DEPTH, pending as f64)
            .await;
        if let Some(memory_mb) = process_memory_mb() {
            self.monitor.record(metric_names::MEMORY_MB, memory_mb).await;
        }

        debug!(tick, pending, submitted = submitted.len(), "自主调度 tick");
        TickReport {
            tick,
            pending,
            submitted,
        }
    }

    async fn roll(&self, probability: f64) -> bool {
        self.rng.lock().await.random::<f64>() < probability
    }
}

fn low_priority() -> TaskParams {
    let mut params = TaskParams::new();
    params.insert("priority".to_string(), json!("low"));
    params
}
