use std::collections::HashMap;
use std::sync::Arc;

use mindforge_domain::TaskHandler;
use tokio::sync::RwLock;
use tracing::debug;

/// 任务类型到处理器的映射，克隆后共享同一份注册表
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn TaskHandler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名类型已存在时覆盖，返回被替换的处理器
    pub async fn register(
        &self,
        task_type: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
    ) -> Option<Arc<dyn TaskHandler>> {
        let task_type = task_type.into();
        debug!(task.type = %task_type, handler = handler.name(), "注册任务处理器");
        let mut registry = self.handlers.write().await;
        registry.insert(task_type, handler)
    }

    pub async fn register_batch(&self, handlers: Vec<(String, Arc<dyn TaskHandler>)>) {
        let mut registry = self.handlers.write().await;
        for (task_type, handler) in handlers {
            registry.insert(task_type, handler);
        }
    }

    pub async fn unregister(&self, task_type: &str) -> bool {
        let mut registry = self.handlers.write().await;
        registry.remove(task_type).is_some()
    }

    pub async fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        let registry = self.handlers.read().await;
        registry.get(task_type).cloned()
    }

    pub async fn contains(&self, task_type: &str) -> bool {
        let registry = self.handlers.read().await;
        registry.contains_key(task_type)
    }

    /// 已注册的任务类型，按名称排序
    pub async fn list(&self) -> Vec<String> {
        let registry = self.handlers.read().await;
        let mut types: Vec<String> = registry.keys().cloned().collect();
        types.sort();
        types
    }

    pub async fn count(&self) -> usize {
        let registry = self.handlers.read().await;
        registry.len()
    }
}
