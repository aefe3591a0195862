use async_trait::async_trait;

use crate::events::Notification;

/// 协作方通知出口
///
/// 实现方自行决定如何处理通知，调度核心不关心结果。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notification: Notification) {}
}
