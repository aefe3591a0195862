use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mindforge_autonomy::AutonomousEngine;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// 优雅关闭管理器
///
/// 克隆后共享同一个关闭信号，关闭只会触发一次。
#[derive(Clone)]
pub struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 已经关闭后再订阅会得到一个立即就绪的接收器
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        // 先订阅再检查标志，标志在发送之前置位，不会漏掉信号
        let rx = self.shutdown_tx.subscribe();
        if self.is_shutdown() {
            let (tx, ready) = broadcast::channel(1);
            let _ = tx.send(());
            return ready;
        }
        rx
    }

    pub fn shutdown(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            debug!("关闭信号已经发送过");
            return;
        }

        let receivers = self.shutdown_tx.receiver_count();
        let _ = self.shutdown_tx.send(());
        info!(receivers, "关闭信号已发送");
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.subscribe();
        let _ = rx.recv().await;
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 停止自主驱动，继续执行剩余任务直到队列清空
///
/// 超时返回 false，此时仍未执行的任务随进程退出丢失。
pub async fn drain_engine(engine: &AutonomousEngine, drain_timeout: Duration) -> bool {
    engine.stop().await;

    let status = engine.scheduler().get_status().await;
    if status.pending_count > 0 {
        info!(pending = status.pending_count, "关闭前继续执行待处理任务");
    }

    info!(
        running = status.running_count,
        timeout_secs = drain_timeout.as_secs(),
        "等待任务队列清空"
    );
    let drained = engine.scheduler().wait_for_idle(drain_timeout).await;
    if !drained {
        warn!("等待任务队列清空超时");
    }
    drained
}
