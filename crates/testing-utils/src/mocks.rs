//! Mock handlers and collaborators
//!
//! In-memory test doubles for the `TaskHandler`, `Notifier`, `MetricsSink`
//! and `QueueStatusProvider` ports.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mindforge_domain::{
    Alert, FeedbackRecord, FeedbackSignal, MetricsSink, Notification, Notifier, QueueStatus,
    QueueStatusProvider, Task, TaskContext, TaskHandler,
};
use mindforge_errors::{SchedulerError, SchedulerResult};
use serde_json::{json, Value};
use tokio::sync::watch;

/// Handler that fails a fixed number of attempts, then succeeds.
pub struct ScriptedHandler {
    name: String,
    failures_before_success: u32,
    delay: Option<Duration>,
    attempts: AtomicU32,
    invocations: Mutex<Vec<TaskContext>>,
}

impl ScriptedHandler {
    pub fn new(name: &str, failures_before_success: u32) -> Self {
        Self {
            name: name.to_string(),
            failures_before_success,
            delay: None,
            attempts: AtomicU32::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(name: &str) -> Self {
        Self::new(name, 0)
    }

    pub fn always_failing(name: &str) -> Self {
        Self::new(name, u32::MAX)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<TaskContext> {
        self.invocations.lock().unwrap().clone()
    }

    /// Descriptions of the tasks handled, in invocation order.
    pub fn handled_descriptions(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|ctx| ctx.description)
            .collect()
    }
}

#[async_trait]
impl TaskHandler for ScriptedHandler {
    async fn handle(&self, context: &TaskContext) -> SchedulerResult<Value> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.invocations.lock().unwrap().push(context.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if attempt <= self.failures_before_success {
            return Err(SchedulerError::execution(format!(
                "scripted failure #{attempt}"
            )));
        }
        Ok(json!({ "attempt": attempt }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that blocks every invocation until the gate is released.
pub struct GateHandler {
    name: String,
    gate: watch::Sender<bool>,
    current: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
    invocations: Mutex<Vec<String>>,
}

impl GateHandler {
    pub fn new(name: &str) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            name: name.to_string(),
            gate,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Open the gate; current and future invocations complete immediately.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn handled_descriptions(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskHandler for GateHandler {
    async fn handle(&self, context: &TaskContext) -> SchedulerResult<Value> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::SeqCst);
        self.invocations
            .lock()
            .unwrap()
            .push(context.description.clone());

        let mut rx = self.gate.subscribe();
        let released = rx.wait_for(|open| *open).await.is_ok();

        self.current.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);

        if released {
            Ok(json!({ "released": true }))
        } else {
            Err(SchedulerError::execution("gate dropped"))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that always panics.
pub struct PanickingHandler {
    name: String,
    attempts: AtomicU32,
}

impl PanickingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for PanickingHandler {
    async fn handle(&self, context: &TaskContext) -> SchedulerResult<Value> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        panic!("handler exploded on task {}", context.task_id);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Notifier that stores every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<Task> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::TaskCompleted(task) => Some(task),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<Task> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::TaskFailed(task) => Some(task),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::AlertRaised(alert) => Some(alert),
                _ => None,
            })
            .collect()
    }

    pub fn feedback_signals(&self) -> Vec<(FeedbackSignal, FeedbackRecord)> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::FeedbackSignal { signal, record } => Some((signal, record)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// Metrics sink that stores every recorded sample.
#[derive(Default)]
pub struct RecordingMetricsSink {
    samples: Mutex<Vec<(String, f64)>>,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self, name: &str) -> Vec<f64> {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

#[async_trait]
impl MetricsSink for RecordingMetricsSink {
    async fn record(&self, name: &str, value: f64) {
        self.samples
            .lock()
            .unwrap()
            .push((name.to_string(), value));
    }
}

/// Queue status provider returning a settable snapshot.
#[derive(Default)]
pub struct StaticQueueStatus {
    status: Mutex<QueueStatus>,
}

impl StaticQueueStatus {
    pub fn new(pending: usize, running: usize, completed: usize) -> Self {
        let provider = Self::default();
        provider.set_counts(pending, running, completed);
        provider
    }

    pub fn set_counts(&self, pending: usize, running: usize, completed: usize) {
        let mut status = self.status.lock().unwrap();
        status.pending_count = pending;
        status.running_count = running;
        status.completed_count = completed;
    }
}

#[async_trait]
impl QueueStatusProvider for StaticQueueStatus {
    async fn queue_status(&self) -> QueueStatus {
        self.status.lock().unwrap().clone()
    }
}
