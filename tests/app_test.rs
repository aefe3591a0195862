use std::sync::Arc;
use std::time::Duration;

use mindforge_config::AppConfig;
use mindforge_scheduler::app::{Application, RunOptions};
use mindforge_scheduler::shutdown::ShutdownManager;
use mindforge_testing_utils::wait_until;

#[tokio::test]
async fn test_demo_run_until_shutdown() {
    let mut config = AppConfig::default();
    config.autonomy.enabled = false;

    let app = Arc::new(
        Application::new(config, RunOptions { demo: true })
            .await
            .unwrap(),
    );
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    assert!(
        wait_until(
            || async { app.engine().get_status().await.queue.completed_count == 6 },
            Duration::from_secs(5)
        )
        .await
    );

    let completed = app.engine().scheduler().get_completed(10).await;
    assert!(completed.iter().all(|t| t.error.is_none()));
    assert!(completed.iter().any(|t| t.task_type == "reflect"));

    shutdown.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("app stops after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}
