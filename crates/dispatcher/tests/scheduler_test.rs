use std::sync::Arc;
use std::time::Duration;

use mindforge_config::SchedulerConfig;
use mindforge_dispatcher::{register_builtin_handlers, HandlerRegistry, TaskScheduler};
use mindforge_domain::{
    metric_names, MetricsSink, Notifier, TaskEventKind, TaskParams, TaskPriority, TaskStatus,
};
use mindforge_observability::MetricsCollector;
use mindforge_testing_utils::{
    params, wait_until, GateHandler, PanickingHandler, RecordingMetricsSink, RecordingNotifier,
    ScriptedHandler,
};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    scheduler: TaskScheduler,
    notifier: Arc<RecordingNotifier>,
    sink: Arc<RecordingMetricsSink>,
}

fn harness(config: SchedulerConfig) -> Harness {
    let notifier = Arc::new(RecordingNotifier::new());
    let sink = Arc::new(RecordingMetricsSink::new());
    let scheduler = TaskScheduler::new(
        config,
        HandlerRegistry::new(),
        notifier.clone() as Arc<dyn Notifier>,
        Some(sink.clone() as Arc<dyn MetricsSink>),
        Arc::new(MetricsCollector::new()),
    );
    Harness {
        scheduler,
        notifier,
        sink,
    }
}

fn with_concurrency(max_concurrent_tasks: usize) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent_tasks,
        ..SchedulerConfig::default()
    }
}

async fn wait_for_completed(scheduler: &TaskScheduler, count: usize) -> bool {
    wait_until(
        || async { scheduler.get_status().await.completed_count >= count },
        WAIT,
    )
    .await
}

#[tokio::test]
async fn test_running_count_never_exceeds_limit() {
    let h = harness(with_concurrency(2));
    let gate = Arc::new(GateHandler::new("gate"));
    h.scheduler.registry().register("gate", gate.clone()).await;

    for i in 0..6 {
        h.scheduler
            .submit("gate", format!("g{i}"), TaskParams::new())
            .await;
    }

    assert!(wait_until(|| async { gate.started() == 2 }, WAIT).await);
    let status = h.scheduler.get_status().await;
    assert_eq!(status.running_count, 2);
    assert_eq!(status.pending_count, 4);
    assert_eq!(gate.current(), 2);

    gate.release();
    assert!(wait_for_completed(&h.scheduler, 6).await);
    assert!(gate.peak() <= 2);
    assert_eq!(gate.finished(), 6);
}

#[tokio::test]
async fn test_priority_order_when_slot_frees() {
    let h = harness(with_concurrency(1));
    let gate = Arc::new(GateHandler::new("gate"));
    let work = Arc::new(ScriptedHandler::succeeding("work"));
    h.scheduler.registry().register("gate", gate.clone()).await;
    h.scheduler.registry().register("work", work.clone()).await;

    h.scheduler.submit("gate", "blocker", TaskParams::new()).await;
    assert!(wait_until(|| async { gate.started() == 1 }, WAIT).await);

    h.scheduler
        .submit("work", "low", params(&[("priority", json!("low"))]))
        .await;
    h.scheduler
        .submit("work", "high", params(&[("priority", json!("high"))]))
        .await;
    h.scheduler.submit("work", "medium", TaskParams::new()).await;

    gate.release();
    assert!(wait_for_completed(&h.scheduler, 4).await);
    assert_eq!(work.handled_descriptions(), vec!["high", "medium", "low"]);
}

#[tokio::test]
async fn test_fifo_within_same_priority() {
    let h = harness(with_concurrency(1));
    let gate = Arc::new(GateHandler::new("gate"));
    let work = Arc::new(ScriptedHandler::succeeding("work"));
    h.scheduler.registry().register("gate", gate.clone()).await;
    h.scheduler.registry().register("work", work.clone()).await;

    h.scheduler.submit("gate", "blocker", TaskParams::new()).await;
    assert!(wait_until(|| async { gate.started() == 1 }, WAIT).await);

    for name in ["first", "second", "third"] {
        h.scheduler.submit_priority("work", name, TaskParams::new()).await;
    }
    let status = h.scheduler.get_status().await;
    let queued: Vec<&str> = status.pending.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(queued, vec!["first", "second", "third"]);
    assert!(status.pending.iter().all(|t| t.priority == TaskPriority::High));

    gate.release();
    assert!(wait_for_completed(&h.scheduler, 4).await);
    assert_eq!(work.handled_descriptions(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_failing_task_is_retried_until_exhausted() {
    let h = harness(SchedulerConfig::default());
    let handler = Arc::new(ScriptedHandler::always_failing("flaky"));
    h.scheduler.registry().register("flaky", handler.clone()).await;

    let submitted = h
        .scheduler
        .submit("flaky", "never works", params(&[("max_retries", json!(2))]))
        .await;
    assert_eq!(submitted.max_retries, 2);

    assert!(wait_for_completed(&h.scheduler, 1).await);
    let task = h.scheduler.get_task(&submitted.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.retry_count, 2);
    assert_eq!(handler.attempts(), 3);
    assert!(task.error.as_deref().unwrap_or_default().contains("scripted failure"));

    assert!(wait_until(|| async { h.notifier.failed().len() == 1 }, WAIT).await);
    assert!(h.notifier.completed().is_empty());
}

#[tokio::test]
async fn test_retry_then_success_clears_error() {
    let h = harness(SchedulerConfig::default());
    let handler = Arc::new(ScriptedHandler::new("flaky", 1));
    h.scheduler.registry().register("flaky", handler.clone()).await;

    let submitted = h.scheduler.submit("flaky", "second time lucky", TaskParams::new()).await;
    assert!(wait_for_completed(&h.scheduler, 1).await);

    let task = h.scheduler.get_task(&submitted.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.retry_count, 1);
    assert!(task.error.is_none());
    assert_eq!(task.result, Some(json!({ "attempt": 2 })));

    let contexts = handler.invocations();
    assert_eq!(contexts[0].retry_count, 0);
    assert_eq!(contexts[1].retry_count, 1);
}

#[tokio::test]
async fn test_unknown_task_type_fails_without_retry() {
    let h = harness(SchedulerConfig::default());

    let submitted = h.scheduler.submit("nobody-home", "orphan", TaskParams::new()).await;
    assert!(wait_for_completed(&h.scheduler, 1).await);

    let task = h.scheduler.get_task(&submitted.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.retry_count, 0);
    assert!(task.error.unwrap().contains("nobody-home"));
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let h = harness(SchedulerConfig::default());
    let handler = Arc::new(PanickingHandler::new("boom"));
    h.scheduler.registry().register("boom", handler.clone()).await;
    register_builtin_handlers(h.scheduler.registry()).await;

    let submitted = h
        .scheduler
        .submit("boom", "explodes", params(&[("max_retries", json!(1))]))
        .await;
    assert!(wait_for_completed(&h.scheduler, 1).await);

    let task = h.scheduler.get_task(&submitted.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(handler.attempts(), 2);
    assert!(task.error.unwrap().contains("handler exploded"));

    // 调度器在 panic 之后仍可继续工作
    h.scheduler.submit("noop", "after panic", TaskParams::new()).await;
    assert!(wait_for_completed(&h.scheduler, 2).await);
}

#[tokio::test]
async fn test_handler_timeout_counts_as_failure() {
    let config = SchedulerConfig {
        handler_timeout_ms: Some(20),
        ..SchedulerConfig::default()
    };
    let h = harness(config);
    let slow = Arc::new(ScriptedHandler::succeeding("slow").with_delay(Duration::from_millis(500)));
    h.scheduler.registry().register("slow", slow.clone()).await;

    let submitted = h
        .scheduler
        .submit("slow", "too slow", params(&[("max_retries", json!(1))]))
        .await;
    assert!(wait_for_completed(&h.scheduler, 1).await);

    let task = h.scheduler.get_task(&submitted.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.retry_count, 1);
    assert_eq!(slow.attempts(), 2);
}

#[tokio::test]
async fn test_cancel_only_affects_pending_tasks() {
    let h = harness(with_concurrency(1));
    let gate = Arc::new(GateHandler::new("gate"));
    h.scheduler.registry().register("gate", gate.clone()).await;
    let mut events = h.scheduler.subscribe();

    let running = h.scheduler.submit("gate", "running", TaskParams::new()).await;
    let waiting = h.scheduler.submit("gate", "waiting", TaskParams::new()).await;
    assert!(wait_until(|| async { gate.started() == 1 }, WAIT).await);

    assert!(!h.scheduler.cancel(&running.id).await);
    assert!(h.scheduler.cancel(&waiting.id).await);
    assert!(!h.scheduler.cancel(&waiting.id).await);
    assert!(h.scheduler.get_task(&waiting.id).await.is_none());

    gate.release();
    assert!(wait_for_completed(&h.scheduler, 1).await);
    assert_eq!(gate.started(), 1);

    let mut cancelled = 0;
    while let Ok(event) = events.try_recv() {
        if event.kind == TaskEventKind::Cancelled {
            assert_eq!(event.task.id, waiting.id);
            cancelled += 1;
        }
    }
    assert_eq!(cancelled, 1);
}

#[tokio::test]
async fn test_noop_tasks_complete_with_limited_concurrency() {
    let h = harness(with_concurrency(2));
    register_builtin_handlers(h.scheduler.registry()).await;
    let mut events = h.scheduler.subscribe();

    for i in 0..5 {
        h.scheduler.submit("noop", format!("n{i}"), TaskParams::new()).await;
    }

    let (mut running, mut peak, mut finished) = (0usize, 0usize, 0usize);
    while finished < 5 {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("事件超时")
            .expect("事件通道关闭");
        match event.kind {
            TaskEventKind::Started => {
                running += 1;
                peak = peak.max(running);
            }
            TaskEventKind::Completed | TaskEventKind::Failed => {
                running -= 1;
                finished += 1;
            }
            TaskEventKind::Retry => running -= 1,
            _ => {}
        }
    }
    assert!((1..=2).contains(&peak), "peak running = {peak}");

    assert!(wait_for_completed(&h.scheduler, 5).await);
    let status = h.scheduler.get_status().await;
    assert_eq!(status.pending_count, 0);
    assert_eq!(status.running_count, 0);

    let completed = h.scheduler.get_completed(10).await;
    assert_eq!(completed.len(), 5);
    assert!(completed.iter().all(|t| t.status == TaskStatus::Completed));
    assert!(completed.iter().all(|t| t.started_at.is_some() && t.completed_at.is_some()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_idle_only_after_retries_finish() {
    let h = harness(with_concurrency(1));
    let handler = Arc::new(ScriptedHandler::new("flaky", 2));
    h.scheduler.registry().register("flaky", handler).await;

    let task = h.scheduler.submit("flaky", "retry me", TaskParams::new()).await;

    assert!(h.scheduler.wait_for_idle(WAIT).await);
    let status = h.scheduler.get_status().await;
    assert_eq!(status.pending_count, 0);
    assert_eq!(status.running_count, 0);

    let finished = h.scheduler.get_task(&task.id).await.unwrap();
    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(finished.retry_count, 2);
}

#[tokio::test]
async fn test_wait_for_idle_times_out_while_blocked() {
    let h = harness(with_concurrency(1));
    let gate = Arc::new(GateHandler::new("gate"));
    h.scheduler.registry().register("gate", gate.clone()).await;

    h.scheduler.submit("gate", "blocked", TaskParams::new()).await;
    h.scheduler.submit("gate", "queued", TaskParams::new()).await;

    assert!(!h.scheduler.wait_for_idle(Duration::from_millis(100)).await);
    gate.release();
    assert!(h.scheduler.wait_for_idle(WAIT).await);
    assert_eq!(gate.finished(), 2);
}

#[tokio::test]
async fn test_event_stream_for_single_task() {
    let h = harness(SchedulerConfig::default());
    let handler = Arc::new(ScriptedHandler::new("flaky", 1));
    h.scheduler.registry().register("flaky", handler).await;
    let mut events = h.scheduler.subscribe();

    h.scheduler.submit("flaky", "evented", TaskParams::new()).await;

    let mut kinds = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(WAIT, events.recv()).await {
        kinds.push(event.kind);
        if event.kind == TaskEventKind::Completed {
            break;
        }
    }
    assert_eq!(
        kinds,
        vec![
            TaskEventKind::Added,
            TaskEventKind::Started,
            TaskEventKind::Retry,
            TaskEventKind::Started,
            TaskEventKind::Completed,
        ]
    );
}

#[tokio::test]
async fn test_outcomes_reported_to_metrics_sink() {
    let h = harness(SchedulerConfig::default());
    register_builtin_handlers(h.scheduler.registry()).await;

    h.scheduler
        .submit("sleep", "nap", params(&[("duration_ms", json!(10))]))
        .await;
    h.scheduler.submit("missing", "no handler", TaskParams::new()).await;
    h.scheduler.submit("also-missing", "no handler", TaskParams::new()).await;
    assert!(wait_for_completed(&h.scheduler, 3).await);

    assert!(
        wait_until(
            || async { h.sink.values(metric_names::TASK_FAILURES).contains(&2.0) },
            WAIT
        )
        .await
    );
    let durations = h.sink.values(metric_names::TASK_DURATION_MS);
    assert_eq!(durations.len(), 1);
    assert!(durations[0] >= 10.0);
    assert!(!h.sink.values(metric_names::QUEUE_DEPTH).is_empty());
}

#[tokio::test]
async fn test_history_is_bounded_and_newest_first() {
    let config = SchedulerConfig {
        completed_history_size: 3,
        max_concurrent_tasks: 1,
        ..SchedulerConfig::default()
    };
    let h = harness(config);
    register_builtin_handlers(h.scheduler.registry()).await;

    for i in 0..5 {
        h.scheduler.submit("noop", format!("n{i}"), TaskParams::new()).await;
    }
    assert!(
        wait_until(
            || async {
                let status = h.scheduler.get_status().await;
                status.pending_count == 0 && status.running_count == 0
            },
            WAIT
        )
        .await
    );

    let completed = h.scheduler.get_completed(10).await;
    let names: Vec<&str> = completed.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(names, vec!["n4", "n3", "n2"]);
    assert_eq!(h.scheduler.get_completed(1).await.len(), 1);

    assert_eq!(h.scheduler.clear_completed().await, 3);
    assert_eq!(h.scheduler.get_status().await.completed_count, 0);
}

#[tokio::test]
async fn test_status_provider_is_weak() {
    let h = harness(SchedulerConfig::default());
    let provider = h.scheduler.status_provider();
    assert!(provider.upgrade().is_some());

    drop(h);
    assert!(provider.upgrade().is_none());
}
