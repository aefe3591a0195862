use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mindforge_autonomy::{task_types, AutonomousEngine, GoalAction, Mind, StandaloneMind};
use mindforge_config::{AppConfig, AutonomyConfig};
use mindforge_domain::{
    metric_names, NoopNotifier, SchedulerResult, TaskContext, TaskPriority, TaskStatus,
};
use mindforge_testing_utils::wait_until;
use serde_json::{json, Value};

/// 目标永远不会完成的心智，保证每次 tick 的随机抽取次数一致
struct FixedMind;

#[async_trait]
impl Mind for FixedMind {
    async fn next_action(&self) -> Option<GoalAction> {
        Some(GoalAction {
            id: "goal-1".to_string(),
            description: "持续学习".to_string(),
            progress: 95,
            priority: TaskPriority::High,
        })
    }

    async fn perform(&self, _task_type: &str, _context: &TaskContext) -> SchedulerResult<Value> {
        Ok(Value::Null)
    }
}

fn autonomy(goal: f64, reflect: f64, insight: f64) -> AutonomyConfig {
    AutonomyConfig {
        enabled: false,
        tick_interval_ms: 20,
        low_water_mark: 1000,
        goal_probability: goal,
        reflect_probability: reflect,
        insight_probability: insight,
        seed: Some(7),
    }
}

async fn engine_with(autonomy: AutonomyConfig, mind: Arc<dyn Mind>) -> AutonomousEngine {
    let config = AppConfig {
        autonomy,
        ..AppConfig::default()
    };
    AutonomousEngine::new(config, mind, Arc::new(NoopNotifier)).await
}

#[tokio::test]
async fn test_tick_submits_all_kinds_when_certain() {
    let engine = engine_with(autonomy(1.0, 1.0, 1.0), Arc::new(FixedMind)).await;

    let report = engine.driver().tick().await;
    assert_eq!(report.tick, 1);
    assert_eq!(report.pending, 0);

    let kinds: Vec<&str> = report.submitted.iter().map(|t| t.task_type.as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            task_types::GOAL_UPDATE,
            task_types::REFLECT,
            task_types::GENERATE_INSIGHT
        ]
    );

    let goal = &report.submitted[0];
    assert_eq!(goal.description, "推进目标: 持续学习");
    assert_eq!(goal.params["goal_id"], json!("goal-1"));
    assert_eq!(goal.params["progress"], json!(100));
    assert_eq!(goal.priority, TaskPriority::High);

    assert_eq!(report.submitted[1].description, "进行自主反思");
    assert_eq!(report.submitted[1].priority, TaskPriority::Low);
    assert_eq!(report.submitted[2].description, "生成洞察");
    assert_eq!(report.submitted[2].priority, TaskPriority::Low);
}

/// 返回越界进度的心智
struct OverflowMind;

#[async_trait]
impl Mind for OverflowMind {
    async fn next_action(&self) -> Option<GoalAction> {
        Some(GoalAction {
            id: "goal-x".to_string(),
            description: "越界进度".to_string(),
            progress: u32::MAX,
            priority: TaskPriority::Medium,
        })
    }

    async fn perform(&self, _task_type: &str, _context: &TaskContext) -> SchedulerResult<Value> {
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn test_out_of_range_progress_is_capped() {
    let engine = engine_with(autonomy(1.0, 0.0, 0.0), Arc::new(OverflowMind)).await;

    let report = engine.driver().tick().await;
    assert_eq!(report.submitted.len(), 1);
    assert_eq!(report.submitted[0].params["progress"], json!(100));

    // 后续 tick 仍然正常
    assert_eq!(engine.driver().tick().await.tick, 2);
}

#[tokio::test]
async fn test_tick_records_queue_depth_without_submitting() {
    let engine = engine_with(autonomy(0.0, 0.0, 0.0), Arc::new(FixedMind)).await;

    for _ in 0..3 {
        assert!(engine.driver().tick().await.submitted.is_empty());
    }
    assert_eq!(engine.driver().tick_count(), 3);

    let depth = engine.monitor().get_metrics(metric_names::QUEUE_DEPTH, 10).await;
    assert_eq!(depth.len(), 3);
    assert!(depth.iter().all(|s| s.value == 0.0));
}

#[tokio::test]
async fn test_goal_update_skipped_above_low_water_mark() {
    let mut config = autonomy(1.0, 0.0, 0.0);
    config.low_water_mark = 0;
    let engine = engine_with(config, Arc::new(FixedMind)).await;

    assert!(engine.driver().tick().await.submitted.is_empty());
}

#[tokio::test]
async fn test_goal_update_skipped_without_next_action() {
    let engine = engine_with(autonomy(1.0, 0.0, 0.0), Arc::new(StandaloneMind::new())).await;

    assert!(engine.driver().tick().await.submitted.is_empty());
}

#[tokio::test]
async fn test_seeded_driver_is_reproducible() {
    async fn draw_sequence() -> Vec<String> {
        let engine = engine_with(autonomy(0.5, 0.5, 0.5), Arc::new(FixedMind)).await;
        let mut kinds = Vec::new();
        for _ in 0..20 {
            let report = engine.driver().tick().await;
            kinds.extend(report.submitted.into_iter().map(|t| t.task_type));
        }
        kinds
    }

    let first = draw_sequence().await;
    let second = draw_sequence().await;
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_standalone_goal_progresses_through_scheduler() {
    let mind = Arc::new(StandaloneMind::new());
    let goal_id = mind.add_goal("写完调度器", TaskPriority::Medium).await;
    let engine = engine_with(autonomy(1.0, 0.0, 0.0), mind.clone()).await;

    let report = engine.driver().tick().await;
    let task_id = report.submitted[0].id;

    assert!(
        wait_until(
            || async {
                engine
                    .get_task(&task_id)
                    .await
                    .map(|t| t.status == TaskStatus::Completed)
                    .unwrap_or(false)
            },
            Duration::from_secs(5)
        )
        .await
    );
    assert_eq!(mind.goal(&goal_id).await.map(|g| g.progress), Some(10));
}

#[tokio::test]
async fn test_start_and_stop_loop() {
    let engine = engine_with(autonomy(0.0, 0.0, 0.0), Arc::new(FixedMind)).await;
    let driver = engine.driver().clone();

    driver.start().await.unwrap();
    assert!(driver.is_running().await);
    assert!(driver.start().await.is_err());

    assert!(wait_until(|| async { driver.tick_count() >= 2 }, Duration::from_secs(5)).await);

    driver.stop().await;
    assert!(!driver.is_running().await);
    let stopped_at = driver.tick_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(driver.tick_count(), stopped_at);

    // 停止后可以再次启动
    driver.start().await.unwrap();
    driver.stop().await;
}
