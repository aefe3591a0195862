//! 任务调度器
//!
//! 所有队列与运行集合的修改都在同一把互斥锁下完成，出队与占用执行槽是原子的，
//! 因此并发数不会超过上限，也不会在有待处理任务时空出执行槽。锁只在同步代码中
//! 持有，不跨越 `.await`，派发本身因此是同步的。
//! 处理器在独立的 tokio 任务中运行，错误与 panic 都在调度边界被捕获。

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use mindforge_config::SchedulerConfig;
use mindforge_domain::{
    metric_names, FailureDisposition, MetricsSink, Notification, Notifier, QueueStatus,
    QueueStatusProvider, SchedulerError, SchedulerResult, Task, TaskContext, TaskEvent,
    TaskEventKind, TaskId, TaskParams, TaskPriority,
};
use mindforge_observability::{MetricsCollector, StructuredLogger};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::queue::PendingQueue;
use crate::registry::HandlerRegistry;

#[derive(Default)]
struct SchedulerState {
    pending: PendingQueue,
    running: HashMap<TaskId, Task>,
    completed: VecDeque<Task>,
}

impl SchedulerState {
    fn push_history(&mut self, task: Task, capacity: usize) {
        if self.completed.len() >= capacity {
            self.completed.pop_front();
        }
        self.completed.push_back(task);
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running.is_empty()
    }

    fn snapshot(&self) -> QueueStatus {
        let mut running: Vec<Task> = self.running.values().cloned().collect();
        running.sort_by_key(|t| (t.priority, t.sequence));

        QueueStatus {
            pending_count: self.pending.len(),
            running_count: self.running.len(),
            completed_count: self.completed.len(),
            pending: self.pending.snapshot(),
            running,
        }
    }
}

struct SchedulerInner {
    config: SchedulerConfig,
    registry: HandlerRegistry,
    state: Mutex<SchedulerState>,
    sequence: AtomicU64,
    terminal_failures: AtomicU64,
    events: broadcast::Sender<TaskEvent>,
    notifier: Arc<dyn Notifier>,
    metrics_sink: Option<Arc<dyn MetricsSink>>,
    metrics: Arc<MetricsCollector>,
}

/// 优先级任务调度器，克隆后共享同一个调度状态
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<SchedulerInner>,
}

impl TaskScheduler {
    pub fn new(
        config: SchedulerConfig,
        registry: HandlerRegistry,
        notifier: Arc<dyn Notifier>,
        metrics_sink: Option<Arc<dyn MetricsSink>>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                registry,
                state: Mutex::new(SchedulerState::default()),
                sequence: AtomicU64::new(0),
                terminal_failures: AtomicU64::new(0),
                events,
                notifier,
                metrics_sink,
                metrics,
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    /// 提交任务，立即返回入队时的快照，不等待执行
    pub async fn submit(
        &self,
        task_type: impl Into<String>,
        description: impl Into<String>,
        params: TaskParams,
    ) -> Task {
        let task = self.inner.new_task(task_type.into(), description.into(), params);
        self.inner.enqueue(task).await
    }

    /// 与 `submit` 相同，但优先级固定为 `High`
    pub async fn submit_priority(
        &self,
        task_type: impl Into<String>,
        description: impl Into<String>,
        params: TaskParams,
    ) -> Task {
        let task = self
            .inner
            .new_task(task_type.into(), description.into(), params)
            .with_priority(TaskPriority::High);
        self.inner.enqueue(task).await
    }

    /// 只能取消仍在等待的任务
    pub async fn cancel(&self, task_id: &TaskId) -> bool {
        let (task, depth) = {
            let mut state = self.inner.lock_state();
            let Some(task) = state.pending.remove(task_id) else {
                return false;
            };
            (task, state.pending.len())
        };

        StructuredLogger::log_task_cancelled(&task);
        self.inner.metrics.record_task_cancelled();
        self.inner.emit(TaskEventKind::Cancelled, task);
        self.inner
            .record_metric(metric_names::QUEUE_DEPTH, depth as f64)
            .await;
        true
    }

    pub async fn get_status(&self) -> QueueStatus {
        self.inner.lock_state().snapshot()
    }

    /// 依次在等待队列、运行集合和历史记录中查找
    pub async fn get_task(&self, task_id: &TaskId) -> Option<Task> {
        let state = self.inner.lock_state();
        state
            .pending
            .get(task_id)
            .or_else(|| state.running.get(task_id))
            .or_else(|| state.completed.iter().rev().find(|t| &t.id == task_id))
            .cloned()
    }

    /// 最近结束的任务，最新的在前
    pub async fn get_completed(&self, limit: usize) -> Vec<Task> {
        let state = self.inner.lock_state();
        state.completed.iter().rev().take(limit).cloned().collect()
    }

    pub async fn clear_completed(&self) -> usize {
        let mut state = self.inner.lock_state();
        let cleared = state.completed.len();
        state.completed.clear();
        cleared
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.events.subscribe()
    }

    /// 供监控使用的弱引用，避免监控与调度器互相持有
    pub fn status_provider(&self) -> Weak<dyn QueueStatusProvider> {
        let provider: Arc<dyn QueueStatusProvider> = self.inner.clone();
        Arc::downgrade(&provider)
    }

    /// 等待队列清空且没有运行中的任务，超时返回 false
    pub async fn wait_for_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.inner.lock_state().is_idle() {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

#[async_trait]
impl QueueStatusProvider for TaskScheduler {
    async fn queue_status(&self) -> QueueStatus {
        self.get_status().await
    }
}

#[async_trait]
impl QueueStatusProvider for SchedulerInner {
    async fn queue_status(&self) -> QueueStatus {
        self.lock_state().snapshot()
    }
}

impl SchedulerInner {
    fn new_task(&self, task_type: String, description: String, params: TaskParams) -> Task {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Task::new(
            sequence,
            task_type,
            description,
            params,
            self.config.default_max_retries,
        )
    }

    fn emit(&self, kind: TaskEventKind, task: Task) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.events.send(TaskEvent::new(kind, task));
    }

    async fn record_metric(&self, name: &str, value: f64) {
        if let Some(sink) = &self.metrics_sink {
            sink.record(name, value).await;
        }
    }

    /// 锁内不会 panic，中毒时直接沿用内部状态
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enqueue(self: &Arc<Self>, task: Task) -> Task {
        let snapshot = task.clone();
        let depth = {
            let mut state = self.lock_state();
            state.pending.push(task);
            state.pending.len()
        };

        StructuredLogger::log_task_submitted(&snapshot);
        self.metrics.record_task_submitted();
        self.emit(TaskEventKind::Added, snapshot.clone());
        self.dispatch();
        self.record_metric(metric_names::QUEUE_DEPTH, depth as f64)
            .await;
        snapshot
    }

    fn dispatch(self: &Arc<Self>) {
        let started = {
            let mut state = self.lock_state();
            self.take_ready(&mut state)
        };
        self.launch(started);
    }

    /// 在有空闲执行槽时不断取出最高优先级的任务，调用方必须持有状态锁
    fn take_ready(&self, state: &mut SchedulerState) -> Vec<Task> {
        let mut started = Vec::new();
        while state.running.len() < self.config.max_concurrent_tasks {
            let Some(mut task) = state.pending.pop_next() else {
                break;
            };
            task.start();
            state.running.insert(task.id, task.clone());
            started.push(task);
        }
        self.metrics
            .update_queue(state.pending.len(), state.running.len());
        started
    }

    fn launch(self: &Arc<Self>, started: Vec<Task>) {
        for task in started {
            StructuredLogger::log_task_execution_start(&task);
            self.emit(TaskEventKind::Started, task.clone());
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.execute(task).await;
            });
        }
    }

    async fn execute(self: Arc<Self>, task: Task) {
        let outcome = self.run_handler(&task).await;
        self.finish(task.id, outcome).await;
    }

    async fn run_handler(&self, task: &Task) -> SchedulerResult<Value> {
        let handler = self
            .registry
            .get(&task.task_type)
            .await
            .ok_or_else(|| SchedulerError::unknown_task_type(&task.task_type))?;

        let context = TaskContext::from(task);
        let guarded = AssertUnwindSafe(handler.handle(&context)).catch_unwind();

        let caught = match self.config.handler_timeout_ms {
            Some(timeout_ms) => {
                match tokio::time::timeout(Duration::from_millis(timeout_ms), guarded).await {
                    Ok(caught) => caught,
                    Err(_) => return Err(SchedulerError::ExecutionTimeout { timeout_ms }),
                }
            }
            None => guarded.await,
        };

        caught.unwrap_or_else(|panic| Err(SchedulerError::HandlerPanic(panic_message(&*panic))))
    }

    async fn finish(self: &Arc<Self>, task_id: TaskId, outcome: SchedulerResult<Value>) {
        // 结束、重新入队与补位在同一临界区内完成
        let (task, kind, depth, started) = {
            let mut state = self.lock_state();
            let Some(mut task) = state.running.remove(&task_id) else {
                warn!(task.id = %task_id, "运行集合中找不到已结束的任务");
                return;
            };

            let kind = match outcome {
                Ok(value) => {
                    task.complete(value);
                    TaskEventKind::Completed
                }
                Err(err) if !err.is_retryable() => {
                    task.fail_permanently(err.to_string());
                    TaskEventKind::Failed
                }
                Err(err) => match task.record_failure(err.to_string()) {
                    FailureDisposition::Retry => TaskEventKind::Retry,
                    FailureDisposition::Exhausted => TaskEventKind::Failed,
                },
            };

            if kind == TaskEventKind::Retry {
                state.pending.push(task.clone());
            } else {
                state.push_history(task.clone(), self.config.completed_history_size);
            }
            let started = self.take_ready(&mut state);
            (task, kind, state.pending.len(), started)
        };

        match kind {
            TaskEventKind::Completed => StructuredLogger::log_task_execution_complete(&task),
            TaskEventKind::Retry => StructuredLogger::log_task_retry(&task),
            _ => StructuredLogger::log_task_failed(&task),
        }
        self.emit(kind, task.clone());
        self.launch(started);

        match kind {
            TaskEventKind::Completed => {
                let duration_ms = task.duration_ms().unwrap_or_default().max(0) as f64;
                self.metrics.record_task_completed(duration_ms / 1000.0);
                self.record_metric(metric_names::TASK_DURATION_MS, duration_ms)
                    .await;
                self.notifier.notify(Notification::TaskCompleted(task)).await;
            }
            TaskEventKind::Retry => {
                self.metrics.record_task_retry();
            }
            _ => {
                let failures = self.terminal_failures.fetch_add(1, Ordering::SeqCst) + 1;
                self.metrics.record_task_failure();
                self.record_metric(metric_names::TASK_FAILURES, failures as f64)
                    .await;
                self.notifier.notify(Notification::TaskFailed(task)).await;
            }
        }

        debug!(pending = depth, "任务结束后重新派发");
        self.record_metric(metric_names::QUEUE_DEPTH, depth as f64)
            .await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
